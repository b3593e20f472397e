pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;

use crate::service::{HierarchySearch, HierarchySource, SpecificationFilterService};

/// 统一响应体
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub hierarchy: Arc<dyn HierarchySource>,
    pub specifications: Arc<SpecificationFilterService>,
    pub search: HierarchySearch,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/lines/calculate", post(handlers::calculate))
        .route("/api/documents/summary", post(handlers::summarize_document))
        .route("/api/documents/export", post(handlers::export_document))
        .route("/api/hierarchy/search", get(handlers::search_hierarchy))
        .route("/api/hierarchy/resolve", get(handlers::resolve_codes))
        .route("/api/hierarchy/:level/nodes", get(handlers::list_nodes))
        .route(
            "/api/specifications/:category_code/candidates",
            get(handlers::specification_candidates),
        )
        .route(
            "/api/specifications/:category_code/form-fields",
            get(handlers::specification_form_fields),
        )
        .route(
            "/api/specifications/:category_code/field-values/:field",
            get(handlers::specification_field_values),
        )
        .layer(ServiceBuilder::new())
        .with_state(state)
}
