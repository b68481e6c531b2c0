use crate::ipc::helpers::{list, mutate, required_i64, required_object};
use crate::ipc::types::{AppState, Request};
use crate::query::EntityKind;

fn handle_courses_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let draft = match required_object(req, "draft") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.create_course(draft))
}

fn handle_courses_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let course_id = match required_i64(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let patch = match required_object(req, "patch") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.update_course(course_id, patch))
}

fn handle_courses_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let course_id = match required_i64(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.delete_course(course_id))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(list(state, req, EntityKind::Course)),
        "courses.create" => Some(handle_courses_create(state, req)),
        "courses.update" => Some(handle_courses_update(state, req)),
        "courses.delete" => Some(handle_courses_delete(state, req)),
        _ => None,
    }
}
