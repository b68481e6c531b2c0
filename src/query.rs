//! Scoped listings. Every call reads the tables afresh; joins for display
//! columns are done here from the foreign keys.

use crate::error::{RecordsError, RecordsResult};
use crate::model::{Course, Department, Exam, Faculty, Program, Staff, Student};
use crate::scope::Scope;
use crate::store;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Faculty,
    Department,
    Program,
    Course,
    Staff,
    Engineer,
    Examiner,
    Student,
    Exam,
}

impl EntityKind {
    /// Key under which the rows are returned to the UI.
    pub fn plural(self) -> &'static str {
        match self {
            Self::Faculty => "faculties",
            Self::Department => "departments",
            Self::Program => "programs",
            Self::Course => "courses",
            Self::Staff => "staff",
            Self::Engineer => "engineers",
            Self::Examiner => "examiners",
            Self::Student => "students",
            Self::Exam => "exams",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRow {
    #[serde(flatten)]
    pub department: Department,
    pub faculty_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramRow {
    #[serde(flatten)]
    pub program: Program,
    pub department_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRow {
    #[serde(flatten)]
    pub course: Course,
    pub department_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffRow {
    #[serde(flatten)]
    pub staff: Staff,
    pub department_name: Option<String>,
    pub supervisor_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    #[serde(flatten)]
    pub student: Student,
    pub program_title: Option<String>,
    pub department_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRow {
    #[serde(flatten)]
    pub exam: Exam,
    pub course_title: Option<String>,
    pub student_name: Option<String>,
    pub examiner_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Listing {
    Faculties(Vec<Faculty>),
    Departments(Vec<DepartmentRow>),
    Programs(Vec<ProgramRow>),
    Courses(Vec<CourseRow>),
    Staff(Vec<StaffRow>),
    Students(Vec<StudentRow>),
    Exams(Vec<ExamRow>),
}

impl Listing {
    pub fn len(&self) -> usize {
        match self {
            Self::Faculties(v) => v.len(),
            Self::Departments(v) => v.len(),
            Self::Programs(v) => v.len(),
            Self::Courses(v) => v.len(),
            Self::Staff(v) => v.len(),
            Self::Students(v) => v.len(),
            Self::Exams(v) => v.len(),
        }
    }
}

/// Case-insensitive substring match. A blank filter matches everything.
pub fn matches_filter(display: &str, filter: &str) -> bool {
    if filter.trim().is_empty() {
        return true;
    }
    display.to_lowercase().contains(&filter.to_lowercase())
}

fn keep_matching<T>(rows: Vec<T>, filter: &str, display: impl Fn(&T) -> String) -> Vec<T> {
    rows.into_iter()
        .filter(|r| matches_filter(&display(r), filter))
        .collect()
}

pub fn list(
    conn: &Connection,
    kind: EntityKind,
    scope: &Scope,
    filter: &str,
) -> RecordsResult<Listing> {
    let listing = match kind {
        EntityKind::Faculty => Listing::Faculties(keep_matching(
            store::faculties_all(conn)?,
            filter,
            |f| f.name.clone(),
        )),
        EntityKind::Department => Listing::Departments(list_departments(conn, filter)?),
        EntityKind::Program => Listing::Programs(list_programs(conn, scope, filter)?),
        EntityKind::Course => Listing::Courses(list_courses(conn, scope, filter)?),
        EntityKind::Staff => Listing::Staff(list_staff(conn, scope, filter, |s| !s.is_engineer())?),
        EntityKind::Engineer => Listing::Staff(list_staff(conn, scope, filter, Staff::is_engineer)?),
        EntityKind::Examiner => Listing::Staff(list_staff(conn, scope, filter, Staff::is_lecturer)?),
        EntityKind::Student => Listing::Students(list_students(conn, scope, filter)?),
        EntityKind::Exam => Listing::Exams(list_exams(conn, scope, filter)?),
    };
    Ok(listing)
}

fn department_names(conn: &Connection) -> rusqlite::Result<HashMap<String, String>> {
    Ok(store::departments_all(conn)?
        .into_iter()
        .map(|d| (d.code, d.name))
        .collect())
}

pub fn list_departments(conn: &Connection, filter: &str) -> RecordsResult<Vec<DepartmentRow>> {
    let faculties: HashMap<String, String> = store::faculties_all(conn)?
        .into_iter()
        .map(|f| (f.abbr, f.name))
        .collect();
    let rows = keep_matching(store::departments_all(conn)?, filter, |d| d.name.clone());
    Ok(rows
        .into_iter()
        .map(|department| DepartmentRow {
            faculty_name: faculties.get(&department.faculty_abbr).cloned(),
            department,
        })
        .collect())
}

pub fn list_programs(
    conn: &Connection,
    scope: &Scope,
    filter: &str,
) -> RecordsResult<Vec<ProgramRow>> {
    let names = department_names(conn)?;
    let rows = keep_matching(
        store::programs_all(conn, scope.department_filter.as_deref())?,
        filter,
        |p| p.title.clone(),
    );
    Ok(rows
        .into_iter()
        .map(|program| ProgramRow {
            department_name: names.get(&program.department_code).cloned(),
            program,
        })
        .collect())
}

fn course_rows(conn: &Connection, courses: Vec<Course>) -> RecordsResult<Vec<CourseRow>> {
    let names = department_names(conn)?;
    Ok(courses
        .into_iter()
        .map(|course| CourseRow {
            department_name: names.get(&course.department_code).cloned(),
            course,
        })
        .collect())
}

pub fn list_courses(conn: &Connection, scope: &Scope, filter: &str) -> RecordsResult<Vec<CourseRow>> {
    let rows = keep_matching(
        store::courses_all(conn, scope.department_filter.as_deref())?,
        filter,
        |c| c.title.clone(),
    );
    course_rows(conn, rows)
}

/// Courses linked to `program_code`, limited to the caller's departments.
pub fn list_curriculum(
    conn: &Connection,
    scope: &Scope,
    program_code: &str,
) -> RecordsResult<Vec<CourseRow>> {
    if store::program_get(conn, program_code)?.is_none() {
        return Err(RecordsError::not_found(format!(
            "program {} not found",
            program_code
        )));
    }
    let mut courses = Vec::new();
    for id in store::curriculum_course_ids(conn, program_code)? {
        if let Some(c) = store::course_get(conn, id)? {
            if scope.covers_department(&c.department_code) {
                courses.push(c);
            }
        }
    }
    course_rows(conn, courses)
}

fn list_staff(
    conn: &Connection,
    scope: &Scope,
    filter: &str,
    keep: impl Fn(&Staff) -> bool,
) -> RecordsResult<Vec<StaffRow>> {
    let names = department_names(conn)?;
    let everyone: HashMap<i64, String> = store::staff_all(conn, None)?
        .into_iter()
        .map(|s| (s.id, s.full_name))
        .collect();
    let rows: Vec<Staff> = store::staff_all(conn, scope.department_filter.as_deref())?
        .into_iter()
        .filter(|s| keep(s))
        .collect();
    let rows = keep_matching(rows, filter, |s| s.full_name.clone());
    Ok(rows
        .into_iter()
        .map(|staff| StaffRow {
            department_name: names.get(&staff.department_code).cloned(),
            supervisor_name: staff.supervisor_id.and_then(|id| everyone.get(&id).cloned()),
            staff,
        })
        .collect())
}

pub fn list_students(
    conn: &Connection,
    scope: &Scope,
    filter: &str,
) -> RecordsResult<Vec<StudentRow>> {
    let programs: HashMap<String, Program> = store::programs_all(conn, None)?
        .into_iter()
        .map(|p| (p.code.clone(), p))
        .collect();
    let rows = keep_matching(
        store::students_all(conn, scope.department_filter.as_deref())?,
        filter,
        |s| s.full_name.clone(),
    );
    Ok(rows
        .into_iter()
        .map(|student| {
            let program = programs.get(&student.program_code);
            StudentRow {
                program_title: program.map(|p| p.title.clone()),
                department_code: program.map(|p| p.department_code.clone()),
                student,
            }
        })
        .collect())
}

pub fn list_exams(conn: &Connection, scope: &Scope, filter: &str) -> RecordsResult<Vec<ExamRow>> {
    let examiner = if scope.own_exams_only {
        scope.examiner_id
    } else {
        None
    };
    let rows = keep_matching(
        store::exams_all(conn, scope.department_filter.as_deref(), examiner)?,
        filter,
        |e| e.reg_num.to_string(),
    );
    let courses: HashMap<i64, String> = store::courses_all(conn, None)?
        .into_iter()
        .map(|c| (c.id, c.title))
        .collect();
    let students: HashMap<i64, String> = store::students_all(conn, None)?
        .into_iter()
        .map(|s| (s.reg_num, s.full_name))
        .collect();
    let staff: HashMap<i64, String> = store::staff_all(conn, None)?
        .into_iter()
        .map(|s| (s.id, s.full_name))
        .collect();
    Ok(rows
        .into_iter()
        .map(|exam| ExamRow {
            course_title: courses.get(&exam.course_id).cloned(),
            student_name: students.get(&exam.reg_num).cloned(),
            examiner_name: staff.get(&exam.staff_id).cloned(),
            exam,
        })
        .collect())
}
