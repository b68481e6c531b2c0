//! Faculties, departments, programs and the program curriculum.

use crate::ipc::error::records_err;
use crate::ipc::helpers::{
    acting_scope, db_conn, list, mutate, required_i64, required_object, required_str, respond,
};
use crate::ipc::types::{AppState, Request};
use crate::query::{self, EntityKind};
use serde_json::json;

fn handle_faculty_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let abbr = match required_str(req, "abbr") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let patch = match required_object(req, "patch") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.update_faculty(&abbr, patch))
}

fn handle_department_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let code = match required_str(req, "code") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let patch = match required_object(req, "patch") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.update_department(&code, patch))
}

fn handle_program_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let code = match required_str(req, "code") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let patch = match required_object(req, "patch") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| v.update_program(&code, patch))
}

fn handle_create(state: &mut AppState, req: &Request, kind: EntityKind) -> serde_json::Value {
    let draft = match required_object(req, "draft") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| match kind {
        EntityKind::Faculty => v.create_faculty(draft),
        EntityKind::Department => v.create_department(draft),
        _ => v.create_program(draft),
    })
}

fn handle_delete(state: &mut AppState, req: &Request, kind: EntityKind) -> serde_json::Value {
    let key = if kind == EntityKind::Faculty { "abbr" } else { "code" };
    let id = match required_str(req, key) {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| match kind {
        EntityKind::Faculty => v.delete_faculty(&id),
        EntityKind::Department => v.delete_department(&id),
        _ => v.delete_program(&id),
    })
}

fn handle_curriculum_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let scope = match acting_scope(req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let program_code = match required_str(req, "programCode") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match query::list_curriculum(conn, &scope, &program_code) {
        Ok(courses) => respond(req, &json!({ "programCode": program_code, "courses": courses })),
        Err(e) => records_err(&req.id, &e),
    }
}

fn handle_curriculum_change(state: &mut AppState, req: &Request, link: bool) -> serde_json::Value {
    let program_code = match required_str(req, "programCode") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let course_id = match required_i64(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    mutate(state, req, |v| {
        if link {
            v.link_course(&program_code, course_id)
        } else {
            v.unlink_course(&program_code, course_id)
        }
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "faculties.list" => Some(list(state, req, EntityKind::Faculty)),
        "faculties.create" => Some(handle_create(state, req, EntityKind::Faculty)),
        "faculties.update" => Some(handle_faculty_update(state, req)),
        "faculties.delete" => Some(handle_delete(state, req, EntityKind::Faculty)),
        "departments.list" => Some(list(state, req, EntityKind::Department)),
        "departments.create" => Some(handle_create(state, req, EntityKind::Department)),
        "departments.update" => Some(handle_department_update(state, req)),
        "departments.delete" => Some(handle_delete(state, req, EntityKind::Department)),
        "programs.list" => Some(list(state, req, EntityKind::Program)),
        "programs.create" => Some(handle_create(state, req, EntityKind::Program)),
        "programs.update" => Some(handle_program_update(state, req)),
        "programs.delete" => Some(handle_delete(state, req, EntityKind::Program)),
        "curriculum.list" => Some(handle_curriculum_list(state, req)),
        "curriculum.link" => Some(handle_curriculum_change(state, req, true)),
        "curriculum.unlink" => Some(handle_curriculum_change(state, req, false)),
        _ => None,
    }
}
