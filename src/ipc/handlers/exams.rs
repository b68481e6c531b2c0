use crate::ipc::error::err;
use crate::ipc::helpers::{exam_key, list, mutate, required_object};
use crate::ipc::types::{AppState, Request};
use crate::query::EntityKind;

fn handle_exams_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let draft = match required_object(req, "draft") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.create_exam(draft))
}

fn handle_exams_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let key = match exam_key(req, "key") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let patch = match required_object(req, "patch") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.update_exam(&key, patch))
}

fn handle_exams_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let key = match exam_key(req, "key") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.delete_exam(&key))
}

fn handle_exams_set_grade(state: &mut AppState, req: &Request) -> serde_json::Value {
    let key = match exam_key(req, "key") {
        Ok(v) => v,
        Err(e) => return e,
    };
    // Explicit null clears; a missing field is a malformed call.
    let Some(grade) = req.params.get("grade") else {
        return err(&req.id, "bad_params", "missing grade", None);
    };
    mutate(state, req, |v| v.set_grade(&key, grade))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exams.list" => Some(list(state, req, EntityKind::Exam)),
        "exams.create" => Some(handle_exams_create(state, req)),
        "exams.update" => Some(handle_exams_update(state, req)),
        "exams.delete" => Some(handle_exams_delete(state, req)),
        "exams.setGrade" => Some(handle_exams_set_grade(state, req)),
        _ => None,
    }
}
