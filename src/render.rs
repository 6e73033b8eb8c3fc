//! JSON rendering for command results and errors.
//!
//! `serde_json::Value` objects are ordered maps, so keys come out sorted.

use anyhow::Result;
use applecal_core::AppleCalError;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value, json};

pub fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Compact by default; `indent` spaces per level when given.
pub fn to_json(value: &Value, indent: Option<usize>) -> String {
    let Some(width) = indent else {
        return value.to_string();
    };

    let indent = " ".repeat(width);
    let mut out = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
    match value.serialize(&mut serializer) {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => value.to_string(),
    }
}

pub fn error_json(err: &anyhow::Error, indent: Option<usize>) -> String {
    let body = match err.downcast_ref::<AppleCalError>() {
        Some(core) => error_body(core),
        None => json!({ "kind": "error", "message": format!("{err:#}") }),
    };
    to_json(&json!({ "error": body }), indent)
}

/// `kind` and `message`, plus the structured fields of the variant.
fn error_body(err: &AppleCalError) -> Value {
    let mut body = Map::new();
    body.insert("kind".into(), json!(err.kind()));
    body.insert("message".into(), json!(err.to_string()));

    match err {
        AppleCalError::NotFound { kind, name } => {
            body.insert("resource".into(), json!(kind));
            body.insert("name".into(), json!(name));
        }
        AppleCalError::Conflict { url, etag } => {
            body.insert("url".into(), json!(url));
            body.insert("etag".into(), json!(etag));
        }
        AppleCalError::Protocol {
            method,
            url,
            status,
            body: excerpt,
        } => {
            body.insert("method".into(), json!(method));
            body.insert("url".into(), json!(url));
            body.insert("status".into(), json!(status));
            body.insert("body".into(), json!(excerpt));
        }
        AppleCalError::Transport { method, url, .. } => {
            body.insert("method".into(), json!(method));
            body.insert("url".into(), json!(url));
        }
        AppleCalError::AttachmentState { uid, managed_id } => {
            body.insert("uid".into(), json!(uid));
            body.insert("managed_id".into(), json!(managed_id));
        }
        _ => {}
    }

    Value::Object(body)
}
