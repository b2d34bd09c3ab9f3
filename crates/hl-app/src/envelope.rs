//! The response shape every request resolves to.

use hl_core::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{AppError, AppResult};

/// `{success, data?, error?, kind?}`. Failures never escape as panics or
/// raw errors; they are folded into this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl ResultEnvelope {
    pub fn ok<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
                kind: None,
            },
            Err(e) => Self::failure(&AppError::Encode(e)),
        }
    }

    pub fn failure(error: &AppError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            kind: Some(error.kind()),
        }
    }

    pub fn from_result<T: Serialize>(result: AppResult<T>) -> Self {
        match result {
            Ok(payload) => Self::ok(&payload),
            Err(e) => {
                warn!(kind = %e.kind(), error = %e, "request failed");
                Self::failure(&e)
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":"response encoding failed","kind":"ComputationError"}"#.to_string()
        })
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}
