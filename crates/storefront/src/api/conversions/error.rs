//! Error message extraction from upstream error bodies.

use serde_json::Value;

/// Best-effort human-readable message from an error body.
///
/// Checked in order: `errors[0].msg` (validation errors), `errors.msg`,
/// `message`, `error`, `statusMsg`. Returns `None` for non-JSON bodies or
/// bodies carrying none of these.
pub fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    let from_errors = match value.get("errors") {
        Some(Value::Array(errors)) => errors.first().and_then(|e| e.get("msg")),
        Some(errors @ Value::Object(_)) => errors.get("msg"),
        _ => None,
    };

    from_errors
        .into_iter()
        .chain(["message", "error", "statusMsg"].iter().filter_map(|key| value.get(key)))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(str::to_string)
}
