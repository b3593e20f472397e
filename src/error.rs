use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::ApiResponse;
use crate::models::HierarchyLevel;

/// 数据源 (数据库/上游接口) 错误
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to decode {what}: {reason}")]
    Decode { what: String, reason: String },

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// 层级选择错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("cannot select {level} before {missing} is selected")]
    MissingAncestor {
        level: HierarchyLevel,
        missing: HierarchyLevel,
    },

    #[error("node {code} does not belong to selected parent {expected}")]
    ParentMismatch { code: String, expected: String },

    #[error("ancestor {code} at {level} could not be located")]
    AncestorNotFound { level: HierarchyLevel, code: String },
}

/// 提交校验错误, line 为从 1 开始的行号
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("document has no line items")]
    EmptyDocument,

    #[error("line {line}: item name is required")]
    MissingName { line: usize },

    #[error("line {line}: quantity must be greater than zero")]
    NonPositiveQuantity { line: usize },

    #[error("line {line}: unit rate cannot be negative")]
    NegativeRate { line: usize },

    #[error("line {line}: discount must be between 0 and 100")]
    DiscountOutOfRange { line: usize },

    #[error("line {line}: GST cannot be negative")]
    NegativeGst { line: usize },
}

/// 单据会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("line {0} not found")]
    UnknownLine(u64),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("specification fetch failed for {category_code}: {reason}")]
    SpecificationUnavailable {
        category_code: String,
        reason: String,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// HTTP 层错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] SourceError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Session(SessionError::UnknownLine(_)) => StatusCode::NOT_FOUND,
            AppError::Session(SessionError::Selection(_)) => StatusCode::BAD_REQUEST,
            AppError::Session(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::warn!("request rejected: {}", self);
        }

        let body: ApiResponse<()> = ApiResponse::failure(format!("Error: {}", self));
        (status, Json(body)).into_response()
    }
}
