//! API response types
//!
//! Resource endpoints return bare JSON records and arrays. Failures other
//! than a missing id use the [`ErrorResponse`] envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::entity::EntityId;

/// Standard error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                field: None,
            },
        }
    }

    /// Attach the name of the offending field
    pub fn with_field(mut self, field: Option<&str>) -> Self {
        self.error.field = field.map(str::to_string);
        self
    }
}

/// `404` body for an id that does not exist: `{"id not found": 5}`
pub fn id_not_found(id: EntityId) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "id not found": id }))).into_response()
}

/// `200` body confirming a deletion: `{"deleted": 5}`
pub fn deleted(value: impl Serialize) -> Response {
    (StatusCode::OK, Json(json!({ "deleted": value }))).into_response()
}
