use crate::error::RecordsError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Domain failure to wire response. Storage causes are logged, never sent.
pub fn records_err(id: &str, e: &RecordsError) -> serde_json::Value {
    if let RecordsError::Storage(cause) = e {
        tracing::error!(request = id, error = %cause, "storage failure");
    }
    err(id, e.code(), e.user_message(), None)
}
