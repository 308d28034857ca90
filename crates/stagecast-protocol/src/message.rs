//! The wire message envelope.
//!
//! Every message exchanged with the remote coordination endpoint is a JSON
//! object of the shape `{action, id?, ...fields}`. Messages without an
//! `action` are unparseable and get dropped by the transport with a
//! diagnostic, never dispatched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while reading envelope fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("field {0} has the wrong type")]
    BadField(&'static str),
}

/// One wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message action, used to route to the matching handler.
    pub action: String,

    /// Message identifier, used for duplicate suppression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Remaining payload fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    /// Create an envelope with no payload.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            id: None,
            fields: Map::new(),
        }
    }

    /// Attach a message identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach a payload field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Parse an envelope from wire text.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Serialize the envelope to wire text.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn bool_field(&self, key: &'static str) -> Result<bool, MessageError> {
        self.fields
            .get(key)
            .ok_or(MessageError::MissingField(key))?
            .as_bool()
            .ok_or(MessageError::BadField(key))
    }

    pub fn u64_field(&self, key: &'static str) -> Result<u64, MessageError> {
        self.fields
            .get(key)
            .ok_or(MessageError::MissingField(key))?
            .as_u64()
            .ok_or(MessageError::BadField(key))
    }

    pub fn f64_field(&self, key: &'static str) -> Result<f64, MessageError> {
        self.fields
            .get(key)
            .ok_or(MessageError::MissingField(key))?
            .as_f64()
            .ok_or(MessageError::BadField(key))
    }

    pub fn str_field(&self, key: &'static str) -> Result<&str, MessageError> {
        self.fields
            .get(key)
            .ok_or(MessageError::MissingField(key))?
            .as_str()
            .ok_or(MessageError::BadField(key))
    }

    /// Deserialize a payload field into a typed value.
    pub fn typed_field<T: serde::de::DeserializeOwned>(
        &self,
        key: &'static str,
    ) -> Result<T, MessageError> {
        let value = self
            .fields
            .get(key)
            .ok_or(MessageError::MissingField(key))?;
        serde_json::from_value(value.clone()).map_err(|_| MessageError::BadField(key))
    }

    /// Read the acknowledgement part of the message.
    ///
    /// Acks carry `{ok: bool, error?: code, error_message?: string}` next to
    /// any result fields. A message without an `ok` field reads as a failed
    /// ack so a malformed reply can never confirm a command.
    pub fn ack(&self) -> Ack {
        Ack {
            ok: self
                .fields
                .get("ok")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            error: self.fields.get("error").and_then(Value::as_i64),
            error_message: self
                .fields
                .get("error_message")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// Acknowledgement carried by a reply to a previously sent command.
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    /// Whether the command took effect on the remote end.
    pub ok: bool,

    /// Remote error code, when `ok` is false.
    pub error: Option<i64>,

    /// Remote error message, when `ok` is false.
    pub error_message: Option<String>,
}

impl Ack {
    /// Error message with a fallback for replies that carry none.
    pub fn message(&self) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| "no error message".to_string())
    }
}
