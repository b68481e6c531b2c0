use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_recordsd");
    let mut child = Command::new(exe)
        .env("RECORDSD_TODAY", "2025-01-15")
        .env_remove("RECORDSD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn recordsd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string()
}

fn engineer() -> serde_json::Value {
    json!({ "position": "engineer" })
}

fn head_of(dept: &str, staff_id: i64) -> serde_json::Value {
    json!({ "staffId": staff_id, "position": "department-head", "departmentCode": dept })
}

fn lecturer(staff_id: i64) -> serde_json::Value {
    json!({ "staffId": staff_id, "position": "lecturer" })
}

/// ENG faculty with CS and EE. Staff ids: 1 CS head, 2 CS lecturer,
/// 3 EE head, 4 EE lecturer. Courses: 1 Algorithms (CS), 2 Databases (CS),
/// 3 Circuits (EE). Students: 1001, 1002 in CS-B; 2001 in EE-B.
fn seed_university(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, workspace: &Path) {
    let eng = engineer();
    let _ = request_ok(
        stdin,
        reader,
        "seed-ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let steps = [
        ("faculties.create", json!({ "abbr": "ENG", "name": "Engineering" })),
        ("departments.create", json!({ "code": "CS", "name": "Computer Science", "facultyAbbr": "ENG" })),
        ("departments.create", json!({ "code": "EE", "name": "Electrical Engineering", "facultyAbbr": "ENG" })),
        ("programs.create", json!({ "code": "CS-B", "title": "CS Bachelor", "departmentCode": "CS" })),
        ("programs.create", json!({ "code": "EE-B", "title": "EE Bachelor", "departmentCode": "EE" })),
        ("courses.create", json!({ "title": "Algorithms", "workload": 72, "departmentCode": "CS" })),
        ("courses.create", json!({ "title": "Databases", "workload": "54", "departmentCode": "CS" })),
        ("courses.create", json!({ "title": "Circuits", "workload": 60, "departmentCode": "EE" })),
        ("staff.create", json!({ "fullName": "Helen Head", "position": "department-head", "departmentCode": "CS", "headOfDepartment": { "experienceYears": 12 } })),
        ("staff.create", json!({ "fullName": "Lev Lecturer", "position": "lecturer", "departmentCode": "CS", "supervisorId": 1, "salary": "1800.00", "lecturer": { "title": "Docent", "degree": "PhD" } })),
        ("staff.create", json!({ "fullName": "Ezra Head", "position": "department-head", "departmentCode": "EE" })),
        ("staff.create", json!({ "fullName": "Lena Lecturer", "position": "lecturer", "departmentCode": "EE", "supervisorId": 3 })),
    ];
    for (i, (method, draft)) in steps.into_iter().enumerate() {
        let id = format!("seed-{}", i);
        let _ = request_ok(stdin, reader, &id, method, json!({ "user": eng, "draft": draft }));
    }
    let students = [
        (head_of("CS", 1), json!({ "regNum": 1001, "fullName": "Sam Student", "programCode": "CS-B" })),
        (head_of("CS", 1), json!({ "regNum": "1002", "fullName": "Sasha Student", "programCode": "CS-B" })),
        (head_of("EE", 3), json!({ "regNum": 2001, "fullName": "Eva Student", "programCode": "EE-B" })),
    ];
    for (i, (user, draft)) in students.into_iter().enumerate() {
        let id = format!("seed-student-{}", i);
        let _ = request_ok(stdin, reader, &id, "students.create", json!({ "user": user, "draft": draft }));
    }
}

fn reg_nums(result: &serde_json::Value) -> Vec<i64> {
    result
        .get("students")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|row| row.get("regNum").and_then(|v| v.as_i64()))
        .collect()
}

#[test]
fn created_student_is_found_by_list() {
    let workspace = temp_dir("recordsd-students-roundtrip");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    seed_university(&mut stdin, &mut reader, &workspace);

    let draft = json!({ "regNum": 1003, "fullName": "Mira Newcomer", "programCode": "CS-B" });
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "user": head_of("CS", 1), "draft": draft }),
    );
    assert_eq!(created.get("regNum"), draft.get("regNum"));

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.list",
        json!({ "user": head_of("CS", 1), "filter": "newcomer" }),
    );
    let rows = listed.get("students").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.get("regNum"), draft.get("regNum"));
    assert_eq!(row.get("fullName"), draft.get("fullName"));
    assert_eq!(row.get("programCode"), draft.get("programCode"));
    assert_eq!(row.get("programTitle").and_then(|v| v.as_str()), Some("CS Bachelor"));
    assert_eq!(row.get("departmentCode").and_then(|v| v.as_str()), Some("CS"));
}

#[test]
fn students_are_scoped_through_their_program() {
    let workspace = temp_dir("recordsd-students-scope");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    seed_university(&mut stdin, &mut reader, &workspace);

    let guest = request_ok(&mut stdin, &mut reader, "1", "students.list", json!({}));
    assert_eq!(reg_nums(&guest), vec![1001, 1002, 2001]);

    let ee = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.list",
        json!({ "user": head_of("EE", 3) }),
    );
    assert_eq!(reg_nums(&ee), vec![2001]);

    let foreign = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "user": head_of("CS", 1), "draft": { "regNum": 3001, "fullName": "X", "programCode": "EE-B" } }),
    );
    assert_eq!(foreign, "forbidden");

    let foreign_delete = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "students.delete",
        json!({ "user": head_of("CS", 1), "regNum": 2001 }),
    );
    assert_eq!(foreign_delete, "forbidden");

    let by_lecturer = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "students.create",
        json!({ "user": lecturer(2), "draft": { "regNum": 3002, "fullName": "Y", "programCode": "CS-B" } }),
    );
    assert_eq!(by_lecturer, "unauthorized");
}

#[test]
fn registration_number_is_unique_and_immutable() {
    let workspace = temp_dir("recordsd-students-regnum");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    seed_university(&mut stdin, &mut reader, &workspace);

    let dup = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "user": head_of("CS", 1), "draft": { "regNum": 1001, "fullName": "Dup", "programCode": "CS-B" } }),
    );
    assert_eq!(dup, "conflict");

    let zero = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "user": head_of("CS", 1), "draft": { "regNum": "0", "fullName": "Zero", "programCode": "CS-B" } }),
    );
    assert_eq!(zero, "validation_error");

    let renumber = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "students.update",
        json!({ "user": engineer(), "regNum": 1001, "patch": { "regNum": 1009 } }),
    );
    assert_eq!(renumber, "validation_error");

    let moved = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.update",
        json!({ "user": engineer(), "regNum": 1001, "patch": { "programCode": "EE-B", "fullName": "Sam Moved" } }),
    );
    assert_eq!(moved.get("programCode").and_then(|v| v.as_str()), Some("EE-B"));
    assert_eq!(moved.get("regNum").and_then(|v| v.as_i64()), Some(1001));

    let head_edit = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "students.update",
        json!({ "user": head_of("CS", 1), "regNum": 1002, "patch": { "fullName": "Nope" } }),
    );
    assert_eq!(head_edit, "unauthorized");
}

#[test]
fn deleting_a_student_removes_their_exams() {
    let workspace = temp_dir("recordsd-students-delete");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    seed_university(&mut stdin, &mut reader, &workspace);

    for (i, course_id) in [1, 2].into_iter().enumerate() {
        let id = format!("exam-{}", i);
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &id,
            "exams.create",
            json!({
                "user": engineer(),
                "draft": { "date": "2024-05-20", "courseId": course_id, "regNum": 1002, "staffId": 2, "classroom": "A1", "grade": "4" }
            }),
        );
    }

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "del",
        "students.delete",
        json!({ "user": head_of("CS", 1), "regNum": 1002 }),
    );
    assert_eq!(removed.get("removed").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(removed.get("exams").and_then(|v| v.as_u64()), Some(2));

    let exams = request_ok(&mut stdin, &mut reader, "list", "exams.list", json!({}));
    assert_eq!(
        exams.get("exams").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );

    let again = request_err(
        &mut stdin,
        &mut reader,
        "again",
        "students.delete",
        json!({ "user": head_of("CS", 1), "regNum": 1002 }),
    );
    assert_eq!(again, "not_found");
}
