use crate::ipc::helpers::{list, mutate, required_i64, required_object};
use crate::ipc::types::{AppState, Request};
use crate::query::EntityKind;

fn handle_staff_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let draft = match required_object(req, "draft") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.create_staff(draft))
}

fn handle_staff_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let staff_id = match required_i64(req, "staffId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let patch = match required_object(req, "patch") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.update_staff(staff_id, patch))
}

fn handle_staff_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let staff_id = match required_i64(req, "staffId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.delete_staff(staff_id))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "staff.list" => Some(list(state, req, EntityKind::Staff)),
        "staff.create" => Some(handle_staff_create(state, req)),
        "staff.update" => Some(handle_staff_update(state, req)),
        "staff.delete" => Some(handle_staff_delete(state, req)),
        "engineers.list" => Some(list(state, req, EntityKind::Engineer)),
        "examiners.list" => Some(list(state, req, EntityKind::Examiner)),
        _ => None,
    }
}
