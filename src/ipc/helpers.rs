use crate::apply;
use crate::error::RecordsResult;
use crate::ipc::error::{err, ok, records_err};
use crate::ipc::types::{AppState, Request};
use crate::model::ExamKey;
use crate::query::{self, EntityKind};
use crate::scope::{self, ActingUser, Scope};
use crate::validate::{Validated, Validator};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str(req: &Request, key: &str) -> Result<String, Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Integer id from a JSON number or a numeric string.
pub fn required_i64(req: &Request, key: &str) -> Result<i64, Value> {
    let v = req.params.get(key);
    v.and_then(|v| v.as_i64())
        .or_else(|| v.and_then(|v| v.as_str()).and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("missing or non-integer {}", key),
                None,
            )
        })
}

pub fn required_object<'a>(req: &'a Request, key: &str) -> Result<&'a Value, Value> {
    req.params
        .get(key)
        .filter(|v| v.is_object())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing object {}", key), None))
}

pub fn filter_text(req: &Request) -> String {
    req.params
        .get("filter")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// `params.user`; a missing or null user is a guest.
pub fn acting_user(req: &Request) -> Result<Option<ActingUser>, Value> {
    match req.params.get("user") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
            err(
                &req.id,
                "bad_params",
                format!("invalid user: {}", e),
                None,
            )
        }),
    }
}

pub fn acting_scope(req: &Request) -> Result<Scope, Value> {
    let user = acting_user(req)?;
    Ok(scope::resolve(user.as_ref()))
}

/// `params.<name>` as `{date, courseId, regNum}`.
pub fn exam_key(req: &Request, name: &str) -> Result<ExamKey, Value> {
    let bad = |msg: String| err(&req.id, "bad_params", msg, None);
    let Some(obj) = req.params.get(name).and_then(|v| v.as_object()) else {
        return Err(bad(format!("missing object {}", name)));
    };
    let date = obj
        .get("date")
        .and_then(|v| v.as_str())
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), crate::store::DATE_FORMAT).ok())
        .ok_or_else(|| bad(format!("{}.date must be YYYY-MM-DD", name)))?;
    let int = |field: &str| {
        obj.get(field).and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        })
    };
    let course_id = int("courseId").ok_or_else(|| bad(format!("missing {}.courseId", name)))?;
    let reg_num = int("regNum").ok_or_else(|| bad(format!("missing {}.regNum", name)))?;
    Ok(ExamKey {
        date,
        course_id,
        reg_num,
    })
}

pub fn respond<T: Serialize>(req: &Request, result: &T) -> Value {
    match serde_json::to_value(result) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

pub fn list(state: &AppState, req: &Request, kind: EntityKind) -> Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let scope = match acting_scope(req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match query::list(conn, kind, &scope, &filter_text(req)) {
        Ok(listing) => {
            tracing::debug!(entity = kind.plural(), rows = listing.len(), "listed");
            let mut out = serde_json::Map::new();
            match serde_json::to_value(&listing) {
                Ok(rows) => {
                    out.insert(kind.plural().to_string(), rows);
                    ok(&req.id, Value::Object(out))
                }
                Err(e) => err(&req.id, "internal", e.to_string(), None),
            }
        }
        Err(e) => records_err(&req.id, &e),
    }
}

/// Validates and applies one mutation for the caller in `params.user`.
pub fn mutate<F>(state: &AppState, req: &Request, validate: F) -> Value
where
    F: FnOnce(&Validator<'_>) -> RecordsResult<Validated>,
{
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let scope = match acting_scope(req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let today = state.today();
    match apply::commit(conn, |c| validate(&Validator::new(c, &scope, today))) {
        Ok(applied) => respond(req, &applied),
        Err(e) => records_err(&req.id, &e),
    }
}
