//! Stock parse callbacks.
//!
//! Each matches the [`ParseFn`](super::ParseFn) shape and ignores extra
//! arguments.

use serde_json::{Map, Value};

use super::ParseError;

/// Decodes the body as JSON. An empty or blank body decodes to `null`.
///
/// # Errors
///
/// Returns [`ParseError`] when the body is not valid JSON.
pub fn json(raw: &[u8], _extra: &[Value]) -> Result<Value, ParseError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(raw)?)
}

/// Returns the body as a string, replacing invalid UTF-8.
///
/// # Errors
///
/// Never fails; the signature matches the callback shape.
pub fn text(raw: &[u8], _extra: &[Value]) -> Result<Value, ParseError> {
    Ok(Value::String(String::from_utf8_lossy(raw).into_owned()))
}

/// Decodes an `application/x-www-form-urlencoded` body into an object.
///
/// Repeated keys keep the last value.
///
/// # Errors
///
/// Never fails; the signature matches the callback shape.
pub fn form(raw: &[u8], _extra: &[Value]) -> Result<Value, ParseError> {
    let map: Map<String, Value> = url::form_urlencoded::parse(raw)
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect();
    Ok(Value::Object(map))
}
