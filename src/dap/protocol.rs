use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Error identifier used for every failure that is not a protocol level error.
pub const INTERNAL_ERROR_ID: i64 = 9221;

/// DAP message envelope, discriminated by the `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Request(Request),
    Response(Response),
    Event(Event),
}

impl Message {
    pub fn seq(&self) -> i64 {
        match self {
            Message::Request(r) => r.seq,
            Message::Response(r) => r.seq,
            Message::Event(e) => e.seq,
        }
    }

    pub(crate) fn set_seq(&mut self, seq: i64) {
        match self {
            Message::Request(r) => r.seq = seq,
            Message::Response(r) => r.seq = seq,
            Message::Event(e) => e.seq = seq,
        }
    }
}

/// DAP request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub seq: i64,
    pub command: String,
    #[serde(default = "empty_object")]
    pub arguments: Value,
}

/// DAP response envelope.
///
/// Note: DAP allows responses with no `body` field at all,
/// so both `body` and `message` are skipped when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub seq: i64,
    pub request_seq: i64,
    pub command: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Response {
    /// Text describing a failed response: structured error format first,
    /// then the plain message.
    pub fn failure_text(&self) -> String {
        self.body
            .as_ref()
            .and_then(|body| body.get("error"))
            .and_then(|error| error.get("format"))
            .and_then(Value::as_str)
            .filter(|format| !format.is_empty())
            .or(self.message.as_deref().filter(|m| !m.is_empty()))
            .unwrap_or("Unknown error")
            .to_string()
    }
}

/// DAP event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub seq: i64,
    pub event: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub body: Value,
}

/// Structured error carried in `body.error` of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub id: i64,
    pub format: String,
    #[serde(default)]
    pub show_user: bool,
    #[serde(default)]
    pub send_telemetry: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_label: Option<String>,
}

impl ErrorMessage {
    /// Error that should be presented to the user as is.
    pub fn user(id: i64, format: impl Into<String>) -> Self {
        Self {
            id,
            format: format.into(),
            show_user: true,
            send_telemetry: false,
            variables: None,
            url: None,
            url_label: None,
        }
    }

    /// Error that is a fault of the adapter itself.
    pub fn internal(format: impl Into<String>) -> Self {
        Self {
            id: INTERNAL_ERROR_ID,
            format: format.into(),
            show_user: false,
            send_telemetry: false,
            variables: None,
            url: None,
            url_label: None,
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}
