//! Outbound result types.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::CallbackId;

/// Disposition of a response, as the shell-side bridge understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    /// Operation succeeded; payload carries the result.
    Ok,
    /// Operation failed; payload carries `{code, message}`.
    Error,
    /// Nothing to deliver yet. Used to acknowledge a watch registration
    /// while keeping its callback alive for later samples.
    NoResult,
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Error => write!(f, "ERROR"),
            Self::NoResult => write!(f, "NO_RESULT"),
        }
    }
}

/// One message delivered back to the application shell.
///
/// `keep_callback` distinguishes a settled request from a subscription
/// update: once a response with `keep_callback == false` is delivered, the
/// shell disposes of the callback and the id goes dead.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginResponse {
    /// Callback this response settles or feeds.
    pub callback_id: CallbackId,

    /// Success, failure, or ack-without-data.
    pub status: ResponseStatus,

    /// JSON payload; `Null` for empty successes.
    pub payload: Value,

    /// Keep the callback alive for further responses.
    pub keep_callback: bool,
}

impl PluginResponse {
    /// Final success.
    pub fn ok(callback_id: CallbackId, payload: Value) -> Self {
        Self {
            callback_id,
            status: ResponseStatus::Ok,
            payload,
            keep_callback: false,
        }
    }

    /// Streaming success; the callback stays registered.
    pub fn ok_keep(callback_id: CallbackId, payload: Value) -> Self {
        Self {
            callback_id,
            status: ResponseStatus::Ok,
            payload,
            keep_callback: true,
        }
    }

    /// Final failure.
    pub fn error(callback_id: CallbackId, payload: Value) -> Self {
        Self {
            callback_id,
            status: ResponseStatus::Error,
            payload,
            keep_callback: false,
        }
    }

    /// Watch registration ack: no data, callback kept alive.
    pub fn no_result_keep(callback_id: CallbackId) -> Self {
        Self {
            callback_id,
            status: ResponseStatus::NoResult,
            payload: Value::Null,
            keep_callback: true,
        }
    }

    /// Whether this response settles its callback.
    pub fn is_final(&self) -> bool {
        !self.keep_callback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_is_final() {
        let response = PluginResponse::ok(CallbackId::new("cb"), json!(1));
        assert_eq!(response.status, ResponseStatus::Ok);
        assert!(response.is_final());
    }

    #[test]
    fn test_ok_keep_is_not_final() {
        let response = PluginResponse::ok_keep(CallbackId::new("cb"), json!({}));
        assert_eq!(response.status, ResponseStatus::Ok);
        assert!(!response.is_final());
    }

    #[test]
    fn test_error_carries_payload() {
        let response = PluginResponse::error(CallbackId::new("cb"), json!({"code": 3}));
        assert_eq!(response.status, ResponseStatus::Error);
        assert_eq!(response.payload["code"], 3);
        assert!(response.is_final());
    }

    #[test]
    fn test_no_result_keeps_callback() {
        let response = PluginResponse::no_result_keep(CallbackId::new("cb"));
        assert_eq!(response.status, ResponseStatus::NoResult);
        assert_eq!(response.payload, Value::Null);
        assert!(!response.is_final());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ResponseStatus::Ok.to_string(), "OK");
        assert_eq!(ResponseStatus::Error.to_string(), "ERROR");
        assert_eq!(ResponseStatus::NoResult.to_string(), "NO_RESULT");
    }
}
