//! `HX-Trigger` payloads for the toast notifications and partial refreshes.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

pub const HX_TRIGGER: &str = "hx-trigger";

/// Client event telling the page to re-fetch the machine and log partials.
pub const MACHINES_CHANGED: &str = "machinesChanged";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    /// Also fire [`MACHINES_CHANGED`].
    pub refresh: bool,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Success,
            refresh: true,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Error,
            refresh: false,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Info,
            refresh: true,
        }
    }

    /// Header values must be visible ASCII, so anything else is dropped.
    #[must_use]
    pub fn header_value(&self) -> HeaderValue {
        let message = strip_to_ascii(&self.message);

        let mut payload = serde_json::Map::new();
        payload.insert(
            "showNotification".to_string(),
            json!({ "message": message, "type": self.kind }),
        );
        if self.refresh {
            payload.insert(MACHINES_CHANGED.to_string(), json!(true));
        }

        let encoded = serde_json::Value::Object(payload).to_string();
        HeaderValue::from_str(&encoded)
            .unwrap_or_else(|_| HeaderValue::from_static(r#"{"showNotification":{}}"#))
    }

    /// Empty-bodied response carrying only the trigger header.
    #[must_use]
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(HX_TRIGGER, self.header_value());
        (status, headers).into_response()
    }
}

impl IntoResponse for Toast {
    fn into_response(self) -> Response {
        self.into_response_with_status(StatusCode::NO_CONTENT)
    }
}

pub fn strip_to_ascii(message: &str) -> String {
    message
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_non_ascii() {
        assert_eq!(strip_to_ascii("Booked ✅ 10.0.0.5"), "Booked  10.0.0.5");
        assert_eq!(strip_to_ascii("line\nbreak"), "linebreak");
    }

    #[test]
    fn success_toast_requests_refresh() {
        let value = Toast::success("Booked 10.0.0.5").header_value();
        let parsed: serde_json::Value = serde_json::from_str(value.to_str().unwrap()).unwrap();

        assert_eq!(parsed["showNotification"]["message"], "Booked 10.0.0.5");
        assert_eq!(parsed["showNotification"]["type"], "success");
        assert_eq!(parsed[MACHINES_CHANGED], true);
    }

    #[test]
    fn error_toast_does_not_refresh() {
        let value = Toast::error("nope \"quoted\"").header_value();
        let parsed: serde_json::Value = serde_json::from_str(value.to_str().unwrap()).unwrap();

        assert_eq!(parsed["showNotification"]["message"], "nope \"quoted\"");
        assert_eq!(parsed["showNotification"]["type"], "error");
        assert!(parsed.get(MACHINES_CHANGED).is_none());
    }
}
