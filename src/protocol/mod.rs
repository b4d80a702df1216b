//! Line-delimited JSON protocol
//!
//! One JSON object per line in each direction, no framing beyond the newline.
//!
//! Requests:
//! - `{"action": "embed_texts", "texts": ["...", ...]}`
//! - `{"action": "embed_query", "query": "..."}`
//! - `{"action": "ping"}`
//!
//! Responses carry `status` first, then one payload field:
//! - `{"status": "success", "embeddings": [[...], ...]}`
//! - `{"status": "success", "embedding": [...]}`
//! - `{"status": "success", "message": "pong"}`
//! - `{"status": "error", "message": "..."}`

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::Embedding;

/// Literal returned by `ping`
pub const PONG: &str = "pong";

/// Errors raised while decoding a request line
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("Request must be a JSON object, got {kind}")]
    NotAnObject { kind: &'static str },

    #[error("Unknown action: {action}")]
    UnknownAction { action: String },
}

/// A decoded request, one variant per action
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    EmbedTexts {
        #[serde(default, deserialize_with = "deserialize_texts")]
        texts: Vec<String>,
    },
    EmbedQuery {
        #[serde(default)]
        query: String,
    },
    Ping {},
}

impl Request {
    pub const ACTIONS: [&'static str; 3] = ["embed_texts", "embed_query", "ping"];
}

/// `texts` accepts a list of strings or one bare string
fn deserialize_texts<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let invalid = || D::Error::custom("`texts` must be a string or a list of strings");
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(vec![text]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Ok(text),
                _ => Err(invalid()),
            })
            .collect(),
        _ => Err(invalid()),
    }
}

/// Response line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Success(Payload),
    Error { message: String },
}

/// Success payload; the field name depends on the action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Embeddings { embeddings: Vec<Embedding> },
    Embedding { embedding: Embedding },
    Message { message: String },
}

impl Response {
    pub fn embeddings(embeddings: Vec<Embedding>) -> Self {
        Response::Success(Payload::Embeddings { embeddings })
    }

    pub fn embedding(embedding: Embedding) -> Self {
        Response::Success(Payload::Embedding { embedding })
    }

    pub fn pong() -> Self {
        Response::Success(Payload::Message { message: PONG.to_string() })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error { message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }
}

/// Decode one input line into a request.
///
/// The action is checked before the per-variant fields so an unrecognized
/// action reports its own value rather than serde's variant list.
pub fn decode_request(line: &[u8]) -> Result<Request, ProtocolError> {
    let value: Value = serde_json::from_slice(line)?;

    let action = match &value {
        Value::Object(object) => object.get("action").cloned(),
        other => return Err(ProtocolError::NotAnObject { kind: json_kind(other) }),
    };

    match action {
        Some(Value::String(action)) if Request::ACTIONS.contains(&action.as_str()) => {
            Ok(serde_json::from_value(value)?)
        }
        Some(Value::String(action)) => Err(ProtocolError::UnknownAction { action }),
        Some(other) => Err(ProtocolError::UnknownAction { action: other.to_string() }),
        // Absent action reports as `null`, same as an explicit `"action": null`
        None => Err(ProtocolError::UnknownAction { action: "null".to_string() }),
    }
}

/// Serialize a response to a single line of JSON, without the trailing newline
pub fn encode_response(response: &Response) -> Result<String, serde_json::Error> {
    serde_json::to_string(response)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
