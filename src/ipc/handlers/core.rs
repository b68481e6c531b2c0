use crate::db;
use crate::error::RecordsError;
use crate::ipc::error::{err, ok, records_err};
use crate::ipc::helpers::{acting_scope, db_conn, required_i64, respond};
use crate::ipc::types::{AppState, Request};
use crate::scope::{self, ActingUser};
use crate::store;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "today": store::date_text(state.today()),
        }),
    )
}

pub fn open_workspace(state: &mut AppState, path: PathBuf) -> anyhow::Result<()> {
    let conn = db::open_db(&path)?;
    tracing::info!(workspace = %path.display(), "workspace opened");
    state.workspace = Some(path);
    state.db = Some(conn);
    Ok(())
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_workspace(state, path.clone()) {
        Ok(()) => ok(&req.id, json!({ "workspacePath": path.to_string_lossy() })),
        Err(e) => {
            tracing::error!(workspace = %path.display(), error = %e, "workspace open failed");
            err(&req.id, "db_open_failed", format!("{e:?}"), None)
        }
    }
}

/// Login screen: turns a staff id into the user descriptor the UI sends back
/// on every later call.
fn handle_session_identify(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let staff_id = match required_i64(req, "staffId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let member = match store::staff_get(conn, staff_id) {
        Ok(Some(s)) => s,
        Ok(None) => {
            return err(
                &req.id,
                "not_found",
                format!("staff member {} not found", staff_id),
                None,
            )
        }
        Err(e) => return records_err(&req.id, &RecordsError::from(e)),
    };
    let user = ActingUser {
        staff_id: Some(member.id),
        position: Some(member.position.as_str().to_string()),
        department_code: Some(member.department_code.clone()),
    };
    let scope = scope::resolve(Some(&user));
    tracing::debug!(staff_id = member.id, position = member.position.as_str(), "session identified");
    ok(
        &req.id,
        json!({
            "user": user,
            "fullName": member.full_name,
            "scope": scope,
        }),
    )
}

fn handle_scope_resolve(_state: &mut AppState, req: &Request) -> serde_json::Value {
    match acting_scope(req) {
        Ok(scope) => respond(req, &json!({ "scope": scope })),
        Err(e) => e,
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "session.identify" => Some(handle_session_identify(state, req)),
        "scope.resolve" => Some(handle_scope_resolve(state, req)),
        _ => None,
    }
}
