use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::registry::ServiceRecord;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub services: usize,
}

#[derive(Serialize)]
pub struct ServiceEntry {
    pub key: String,
    #[serde(flatten)]
    pub record: ServiceRecord,
    pub probe_target: String,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        services: state.registry.len(),
    })
}

pub async fn list_services(State(state): State<AdminState>) -> Json<Vec<ServiceEntry>> {
    let entries = state
        .registry
        .services()
        .into_iter()
        .map(|(key, service)| ServiceEntry {
            key,
            record: service.record(),
            probe_target: service.probe_target(),
        })
        .collect();
    Json(entries)
}

pub async fn pause_service(
    State(state): State<AdminState>,
    Path(path): Path<String>,
) -> StatusCode {
    if state.registry.pause(&path).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn resume_service(
    State(state): State<AdminState>,
    Path(path): Path<String>,
) -> StatusCode {
    if state.registry.resume(&path).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Removing an unknown service is not an error.
pub async fn remove_service(
    State(state): State<AdminState>,
    Path(path): Path<String>,
) -> StatusCode {
    state.registry.remove(&path).await;
    StatusCode::NO_CONTENT
}
