use crate::ipc::helpers::{list, mutate, required_i64, required_object};
use crate::ipc::types::{AppState, Request};
use crate::query::EntityKind;

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let draft = match required_object(req, "draft") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.create_student(draft))
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let reg_num = match required_i64(req, "regNum") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let patch = match required_object(req, "patch") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.update_student(reg_num, patch))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let reg_num = match required_i64(req, "regNum") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.delete_student(reg_num))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(list(state, req, EntityKind::Student)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
