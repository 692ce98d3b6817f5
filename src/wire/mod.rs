//! Decoding of tank control-API response bodies.
//!
//! The agent's JSON is loosely shaped: the `errors` field of a validation
//! response may be absent, a list, or a map; status fields may be missing or
//! wrongly typed. Each response is decoded up front into an explicit variant
//! so that "unexpected shape" is a value callers must handle rather than a
//! silent fall-through.
use serde_json::{Map, Value};

use crate::error::TransportError;


/// Verdict of the agent's config validation endpoint.
#[derive(Debug)]
pub(crate) enum ValidationVerdict {
    Clean,
    Invalid(Vec<String>),
}

/// Outcome of a session creation request.
#[derive(Debug)]
pub(crate) enum CreateOutcome {
    Created(String),
    Rejected,
}

/// Decoded `/status?session=<name>` response. String and bool fields are
/// best-effort: a missing or wrongly typed field decodes to `None` instead
/// of failing the whole call.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub current_stage: Option<String>,
    pub status: Option<String>,
    pub stage_completed: Option<bool>,
    pub failures: FailureField,
}

/// The `failures` field of a status response.
#[derive(Debug, Clone)]
pub enum FailureField {
    /// Missing, `null`, or an empty list.
    Absent,
    /// A non-empty list; entries shaped `{"reason": "<text>"}` contribute
    /// their reason, anything else is skipped.
    Reasons(Vec<String>),
    /// Some other JSON type; carries the type name actually found.
    Unexpected(&'static str),
}

pub(crate) fn decode_validation(body: &[u8]) -> Result<ValidationVerdict, TransportError> {
    let root = decode_root(body, "validation response")?;
    match root.get("errors") {
        None | Some(Value::Null) => Ok(ValidationVerdict::Clean),
        Some(Value::Array(items)) => {
            if items.is_empty() {
                Ok(ValidationVerdict::Clean)
            } else {
                Ok(ValidationVerdict::Invalid(
                    items.iter().map(render_reason).collect(),
                ))
            }
        }
        Some(Value::Object(fields)) => {
            if fields.is_empty() {
                Ok(ValidationVerdict::Clean)
            } else {
                Ok(ValidationVerdict::Invalid(
                    fields
                        .iter()
                        .map(|(field, message)| format!("{}: {}", field, render_reason(message)))
                        .collect(),
                ))
            }
        }
        Some(other @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => {
            Err(TransportError::UnexpectedShape {
                field: "errors",
                found: json_type_name(other),
            })
        }
    }
}

pub(crate) fn decode_create(body: &[u8]) -> Result<CreateOutcome, TransportError> {
    let root = decode_root(body, "create response")?;
    match root.get("session") {
        Some(Value::String(name)) => Ok(CreateOutcome::Created(name.clone())),
        None | Some(Value::Null) => Ok(CreateOutcome::Rejected),
        Some(other @ (Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_))) => {
            Err(TransportError::UnexpectedShape {
                field: "session",
                found: json_type_name(other),
            })
        }
    }
}

pub(crate) fn decode_status(body: &[u8]) -> Result<SessionStatus, TransportError> {
    let root = decode_root(body, "status response")?;
    let failures = match root.get("failures") {
        None | Some(Value::Null) => FailureField::Absent,
        Some(Value::Array(items)) => {
            if items.is_empty() {
                FailureField::Absent
            } else {
                FailureField::Reasons(items.iter().filter_map(failure_reason).collect())
            }
        }
        Some(other @ (Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Object(_))) => {
            FailureField::Unexpected(json_type_name(other))
        }
    };
    Ok(SessionStatus {
        current_stage: string_field(root.get("current_stage")),
        status: string_field(root.get("status")),
        stage_completed: bool_field(root.get("stage_completed")),
        failures,
    })
}

/// Decodes the unfiltered `/status` response: an object keyed by session
/// name. Yields `(name, status)` pairs; a value that is not an object with
/// a string `status` yields `None` for the status.
pub(crate) fn decode_session_map(
    body: &[u8],
) -> Result<Vec<(String, Option<String>)>, TransportError> {
    let root = decode_root(body, "status map")?;
    Ok(root
        .iter()
        .map(|(name, details)| {
            let status = if let Value::Object(fields) = details {
                string_field(fields.get("status"))
            } else {
                None
            };
            (name.clone(), status)
        })
        .collect())
}

fn decode_root(body: &[u8], field: &'static str) -> Result<Map<String, Value>, TransportError> {
    let root: Value =
        serde_json::from_slice(body).map_err(|source| TransportError::Decode { source })?;
    if let Value::Object(map) = root {
        Ok(map)
    } else {
        Err(TransportError::UnexpectedShape {
            field,
            found: json_type_name(&root),
        })
    }
}

fn render_reason(value: &Value) -> String {
    if let Value::String(text) = value {
        text.clone()
    } else {
        value.to_string()
    }
}

fn failure_reason(entry: &Value) -> Option<String> {
    if let Value::Object(fields) = entry {
        if let Some(Value::String(reason)) = fields.get("reason") {
            return Some(reason.clone());
        }
    }
    None
}

fn string_field(value: Option<&Value>) -> Option<String> {
    if let Some(Value::String(text)) = value {
        Some(text.clone())
    } else {
        None
    }
}

fn bool_field(value: Option<&Value>) -> Option<bool> {
    if let Some(Value::Bool(flag)) = value {
        Some(*flag)
    } else {
        None
    }
}

pub(crate) const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
