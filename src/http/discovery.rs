//! Runtime self-registration.
//!
//! # Responsibilities
//! - Accept `POST /{discovery}` with a JSON service record
//! - Validate the record and register it as CHECKING
//!
//! # Design Decisions
//! - A health check address is mandatory here, unlike static config
//! - Re-registering an existing prefix overwrites it
//! - Success answers 201 with the record as stored

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::http::server::AppState;
use crate::registry::{normalize_prefix, Service, ServiceRecord, ServiceStatus};

fn reject(status: StatusCode, message: &'static str) -> Response {
    (status, message).into_response()
}

pub async fn register(state: &AppState, request: Request<Body>) -> Response {
    let segments = request
        .uri()
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .count();
    if segments != 1 {
        return StatusCode::NOT_FOUND.into_response();
    }
    if request.method() != Method::POST {
        tracing::debug!(method = %request.method(), "Discovery request method not allowed");
        return (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "POST")]).into_response();
    }

    let body = match axum::body::to_bytes(request.into_body(), state.discovery_body_limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Discovery body unreadable");
            return reject(StatusCode::BAD_REQUEST, "Registration body unreadable or too large");
        }
    };

    let mut record: ServiceRecord = match serde_json::from_slice(&body) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(error = %e, "Discovery body is not a service record");
            return reject(StatusCode::BAD_REQUEST, "Registration body is not valid JSON");
        }
    };

    if record.health_check_url.trim().is_empty() {
        return reject(StatusCode::BAD_REQUEST, "Health check url is not valid");
    }
    let prefix = normalize_prefix(&record.path);
    if prefix.is_empty() {
        return reject(StatusCode::BAD_REQUEST, "Service path is not valid");
    }
    if prefix == state.discovery_path.as_ref() {
        return reject(StatusCode::BAD_REQUEST, "Service path is reserved");
    }

    record.status = ServiceStatus::Checking;
    let service = match Service::from_record(record) {
        Ok(service) => service,
        Err(e) => {
            tracing::debug!(error = %e, "Discovery host rejected");
            return reject(StatusCode::BAD_REQUEST, "Service host is not valid");
        }
    };

    let registered = service.record();
    state.registry.add(service).await;
    tracing::info!(
        service = %prefix,
        host = %registered.host,
        health_check = %registered.health_check_url,
        "Service discovered"
    );

    (StatusCode::CREATED, Json(registered)).into_response()
}
