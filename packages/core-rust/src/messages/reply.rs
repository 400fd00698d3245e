//! Success/failure envelope returned for every command.

use serde::{Deserialize, Serialize};

/// Result of one command as seen by the presentation layer.
///
/// Either `{ "success": true, "data": ... }` or
/// `{ "success": false, "error": "..." }`. Faults never cross the boundary in
/// any other shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    /// Successful reply carrying `data`.
    ///
    /// A value that cannot be represented as JSON turns into a failure reply.
    pub fn ok<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                request_id: None,
                success: true,
                data: Some(value),
                error: None,
            },
            Err(e) => Self::failure(format!("failed to encode reply: {e}")),
        }
    }

    /// Successful reply with no payload.
    #[must_use]
    pub fn ok_empty() -> Self {
        Self {
            request_id: None,
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            request_id: None,
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Echoes the caller's correlation id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Option<u64>) -> Self {
        self.request_id = request_id;
        self
    }
}
