//! JSON codec for the room protocol.
//!
//! Encoding reports serializer failures as [`CodecError::Encode`] instead of
//! producing an empty frame. Decoding validates in two steps: the
//! `kind` tag is checked against the known kinds before the payload shape is
//! deserialized, so unknown kinds and malformed payloads are told apart.

use serde_json::Value;

use crate::{
    error::CodecError,
    protocol::{Command, InboundMessage, MessageKind},
};

/// Serialize a command into a text frame
pub fn encode(command: &Command) -> Result<String, CodecError> {
    serde_json::to_string(command)
        .map_err(|e| CodecError::Encode(format!("{}: {}", command.task(), e)))
}

/// Parse a text frame into a typed message
pub fn decode(raw: &str) -> Result<InboundMessage, CodecError> {
    let value: Value = serde_json::from_str(raw.trim())?;

    let tag = match &value {
        Value::Object(fields) => match fields.get("kind") {
            Some(Value::String(tag)) => tag.clone(),
            Some(_) => {
                return Err(CodecError::MalformedPayload(
                    "`kind` is not a string".to_string(),
                ));
            }
            None => {
                return Err(CodecError::MalformedPayload(
                    "missing `kind` field".to_string(),
                ));
            }
        },
        _ => {
            return Err(CodecError::MalformedPayload(
                "payload is not a JSON object".to_string(),
            ));
        }
    };

    let kind = MessageKind::from_tag(&tag).ok_or(CodecError::UnknownMessageKind(tag))?;

    serde_json::from_value(value).map_err(|e| {
        CodecError::MalformedPayload(format!("invalid {} payload: {}", kind.as_str(), e))
    })
}
