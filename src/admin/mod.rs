//! Operator API.
//!
//! Served on its own listener, every route behind a bearer token.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::registry::ServiceRegistry;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub registry: Arc<ServiceRegistry>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(registry: Arc<ServiceRegistry>, api_key: String) -> Router {
    let state = AdminState {
        registry,
        api_key: Arc::from(api_key),
    };

    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/services", get(list_services))
        .route("/admin/services/{path}", delete(remove_service))
        .route("/admin/services/{path}/pause", post(pause_service))
        .route("/admin/services/{path}/resume", post(resume_service))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
