//! The `{ success, data?, error? }` envelope returned to callers.

use crate::error::{ErrorKind, Result, ScaffoldError};
use serde::Serialize;

/// Outcome of one request, as rendered to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response<T> {
    /// Whether the request succeeded
    pub success: bool,
    /// Payload of a successful request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Message of a failed request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure class of a failed request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl<T> Response<T> {
    /// Successful response carrying `data`.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    /// Failed response describing `error`.
    pub fn failure(error: &ScaffoldError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            kind: Some(error.kind()),
        }
    }

    /// Wraps the result of a pipeline operation.
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(&e),
        }
    }
}
