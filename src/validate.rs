//! Rule checking for every write. A `Validated` value can only be built in
//! this module, so the applier never persists an unchecked mutation.
//!
//! Checks run in a fixed order: capability, existence of the target row,
//! department ownership, field rules, uniqueness.

use crate::error::{RecordsError, RecordsResult};
use crate::model::{
    Course, Department, EngineerProfile, Exam, ExamKey, Faculty, HeadProfile, LecturerProfile,
    Position, Program, Salary, Staff, Student, GRADE_MAX, GRADE_MIN, MAX_CODE_LEN,
};
use crate::scope::{Capability, Scope};
use crate::store;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;

/// A form field as the UI sends it: a JSON number or the raw text box contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    fn text(&self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(t) => t.trim().to_string(),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(t) if t.trim().is_empty())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

fn present(v: &Option<FieldValue>) -> Option<&FieldValue> {
    v.as_ref().filter(|f| !f.is_blank())
}

fn required(label: &str) -> RecordsError {
    RecordsError::validation(format!("{} is required", label))
}

fn required_text(v: &Option<FieldValue>, label: &str) -> RecordsResult<String> {
    present(v).map(FieldValue::text).ok_or_else(|| required(label))
}

fn optional_text(v: &Option<FieldValue>) -> Option<String> {
    present(v).map(FieldValue::text)
}

fn int_value(f: &FieldValue, label: &str) -> RecordsResult<i64> {
    let bad = || RecordsError::validation(format!("{} must be a whole number", label));
    match f {
        FieldValue::Int(i) => Ok(*i),
        FieldValue::Float(x) if x.fract() == 0.0 && x.abs() < 9.0e15 => Ok(*x as i64),
        FieldValue::Float(_) => Err(bad()),
        FieldValue::Text(t) => t.trim().parse().map_err(|_| bad()),
    }
}

fn required_int(v: &Option<FieldValue>, label: &str) -> RecordsResult<i64> {
    match present(v) {
        Some(f) => int_value(f, label),
        None => Err(required(label)),
    }
}

fn optional_int(v: &Option<FieldValue>, label: &str) -> RecordsResult<Option<i64>> {
    present(v).map(|f| int_value(f, label)).transpose()
}

/// Best-effort read used for scope checks that run before field validation.
fn loose_int(v: &Option<FieldValue>) -> Option<i64> {
    present(v).and_then(|f| int_value(f, "").ok())
}

fn required_code(v: &Option<FieldValue>, label: &str) -> RecordsResult<String> {
    let code = required_text(v, label)?;
    if code.chars().count() > MAX_CODE_LEN {
        return Err(RecordsError::validation(format!(
            "{} must be at most {} characters",
            label, MAX_CODE_LEN
        )));
    }
    Ok(code)
}

/// ISO dates, plus the day-first form the old desktop forms used.
fn date_value(f: &FieldValue) -> RecordsResult<NaiveDate> {
    let t = f.text();
    NaiveDate::parse_from_str(&t, store::DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(&t, "%d.%m.%Y"))
        .map_err(|_| RecordsError::validation(format!("'{}' is not a calendar date", t)))
}

fn optional_salary(v: &Option<FieldValue>) -> RecordsResult<Option<Salary>> {
    match present(v) {
        None => Ok(None),
        Some(FieldValue::Int(i)) if *i < 0 => {
            Err(RecordsError::validation("salary must not be negative"))
        }
        Some(FieldValue::Int(i)) => i
            .checked_mul(100)
            .and_then(Salary::from_cents)
            .map(Some)
            .ok_or_else(|| RecordsError::validation(format!("salary {} is out of range", i))),
        Some(f) => Salary::parse(&f.text())
            .map(Some)
            .map_err(RecordsError::Validation),
    }
}

fn grade_value(v: &Option<FieldValue>) -> RecordsResult<Option<i64>> {
    match optional_int(v, "grade")? {
        None => Ok(None),
        Some(g) if (GRADE_MIN..=GRADE_MAX).contains(&g) => Ok(Some(g)),
        Some(g) => Err(RecordsError::validation(format!(
            "grade {} is outside {}..{}",
            g, GRADE_MIN, GRADE_MAX
        ))),
    }
}

fn keep_key<T: PartialEq + Display>(new: &T, old: &T, label: &str) -> RecordsResult<()> {
    if new == old {
        Ok(())
    } else {
        Err(RecordsError::validation(format!(
            "{} cannot be changed ({} -> {})",
            label, old, new
        )))
    }
}

fn parse_draft<T: DeserializeOwned>(raw: &Value, what: &str) -> RecordsResult<T> {
    if !raw.is_object() {
        return Err(RecordsError::validation(format!("{} must be an object", what)));
    }
    serde_json::from_value(raw.clone())
        .map_err(|e| RecordsError::validation(format!("invalid {}: {}", what, e)))
}

/// Overlays the patch keys on the current row's draft. A `null` in the
/// patch clears the field.
fn merge_patch<T: Serialize + DeserializeOwned>(
    current: &T,
    patch: &Value,
    what: &str,
) -> RecordsResult<T> {
    let Value::Object(changes) = patch else {
        return Err(RecordsError::validation(format!(
            "{} patch must be an object",
            what
        )));
    };
    let mut base = serde_json::to_value(current)
        .map_err(|e| RecordsError::validation(format!("invalid {}: {}", what, e)))?;
    if let Value::Object(fields) = &mut base {
        for (k, v) in changes {
            fields.insert(k.clone(), v.clone());
        }
    }
    parse_draft(&base, what)
}

// ------------------------------------------------------------------- drafts

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FacultyDraft {
    abbr: Option<FieldValue>,
    name: Option<FieldValue>,
}

impl From<&Faculty> for FacultyDraft {
    fn from(f: &Faculty) -> Self {
        Self {
            abbr: Some(f.abbr.as_str().into()),
            name: Some(f.name.as_str().into()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DepartmentDraft {
    code: Option<FieldValue>,
    name: Option<FieldValue>,
    faculty_abbr: Option<FieldValue>,
}

impl From<&Department> for DepartmentDraft {
    fn from(d: &Department) -> Self {
        Self {
            code: Some(d.code.as_str().into()),
            name: Some(d.name.as_str().into()),
            faculty_abbr: Some(d.faculty_abbr.as_str().into()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ProgramDraft {
    code: Option<FieldValue>,
    title: Option<FieldValue>,
    department_code: Option<FieldValue>,
}

impl From<&Program> for ProgramDraft {
    fn from(p: &Program) -> Self {
        Self {
            code: Some(p.code.as_str().into()),
            title: Some(p.title.as_str().into()),
            department_code: Some(p.department_code.as_str().into()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CourseDraft {
    title: Option<FieldValue>,
    workload: Option<FieldValue>,
    department_code: Option<FieldValue>,
}

impl From<&Course> for CourseDraft {
    fn from(c: &Course) -> Self {
        Self {
            title: Some(c.title.as_str().into()),
            workload: Some(c.workload.into()),
            department_code: Some(c.department_code.as_str().into()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EngineerDraft {
    specialty: Option<FieldValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct LecturerDraft {
    title: Option<FieldValue>,
    degree: Option<FieldValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct HeadDraft {
    experience_years: Option<FieldValue>,
}

/// Extension objects are replaced whole by a patch; `null` removes one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StaffDraft {
    full_name: Option<FieldValue>,
    position: Option<FieldValue>,
    salary: Option<FieldValue>,
    department_code: Option<FieldValue>,
    supervisor_id: Option<FieldValue>,
    engineer: Option<EngineerDraft>,
    lecturer: Option<LecturerDraft>,
    head_of_department: Option<HeadDraft>,
}

impl From<&Staff> for StaffDraft {
    fn from(s: &Staff) -> Self {
        Self {
            full_name: Some(s.full_name.as_str().into()),
            position: Some(s.position.as_str().into()),
            salary: s.salary.map(|v| FieldValue::Text(v.to_string())),
            department_code: Some(s.department_code.as_str().into()),
            supervisor_id: s.supervisor_id.map(FieldValue::from),
            engineer: s.engineer.as_ref().map(|e| EngineerDraft {
                specialty: Some(e.specialty.as_str().into()),
            }),
            lecturer: s.lecturer.as_ref().map(|l| LecturerDraft {
                title: l.title.as_deref().map(FieldValue::from),
                degree: l.degree.as_deref().map(FieldValue::from),
            }),
            head_of_department: s.head_of_department.as_ref().map(|h| HeadDraft {
                experience_years: Some(h.experience_years.into()),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StudentDraft {
    reg_num: Option<FieldValue>,
    full_name: Option<FieldValue>,
    program_code: Option<FieldValue>,
}

impl From<&Student> for StudentDraft {
    fn from(s: &Student) -> Self {
        Self {
            reg_num: Some(s.reg_num.into()),
            full_name: Some(s.full_name.as_str().into()),
            program_code: Some(s.program_code.as_str().into()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ExamDraft {
    date: Option<FieldValue>,
    course_id: Option<FieldValue>,
    reg_num: Option<FieldValue>,
    staff_id: Option<FieldValue>,
    classroom: Option<FieldValue>,
    grade: Option<FieldValue>,
}

impl From<&Exam> for ExamDraft {
    fn from(e: &Exam) -> Self {
        Self {
            date: Some(FieldValue::Text(store::date_text(e.date))),
            course_id: Some(e.course_id.into()),
            reg_num: Some(e.reg_num.into()),
            staff_id: Some(e.staff_id.into()),
            classroom: Some(e.classroom.as_str().into()),
            grade: e.grade.map(FieldValue::from),
        }
    }
}

// ---------------------------------------------------------------- mutations

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateFaculty(Faculty),
    UpdateFaculty(Faculty),
    DeleteFaculty(String),
    CreateDepartment(Department),
    UpdateDepartment(Department),
    DeleteDepartment(String),
    CreateProgram(Program),
    UpdateProgram(Program),
    DeleteProgram(String),
    LinkCourse { program_code: String, course_id: i64 },
    UnlinkCourse { program_code: String, course_id: i64 },
    CreateCourse(Course),
    UpdateCourse(Course),
    DeleteCourse(i64),
    CreateStaff(Staff),
    UpdateStaff(Staff),
    DeleteStaff(i64),
    CreateStudent(Student),
    UpdateStudent(Student),
    DeleteStudent(i64),
    CreateExam(Exam),
    /// `old` differs from `exam.key()` when the edit moves the row.
    UpdateExam { old: ExamKey, exam: Exam },
    DeleteExam(ExamKey),
    SetGrade { key: ExamKey, grade: Option<i64> },
}

impl Mutation {
    /// Short label for logs, e.g. `course.delete`.
    pub fn action(&self) -> &'static str {
        match self {
            Self::CreateFaculty(_) => "faculty.create",
            Self::UpdateFaculty(_) => "faculty.update",
            Self::DeleteFaculty(_) => "faculty.delete",
            Self::CreateDepartment(_) => "department.create",
            Self::UpdateDepartment(_) => "department.update",
            Self::DeleteDepartment(_) => "department.delete",
            Self::CreateProgram(_) => "program.create",
            Self::UpdateProgram(_) => "program.update",
            Self::DeleteProgram(_) => "program.delete",
            Self::LinkCourse { .. } => "curriculum.link",
            Self::UnlinkCourse { .. } => "curriculum.unlink",
            Self::CreateCourse(_) => "course.create",
            Self::UpdateCourse(_) => "course.update",
            Self::DeleteCourse(_) => "course.delete",
            Self::CreateStaff(_) => "staff.create",
            Self::UpdateStaff(_) => "staff.update",
            Self::DeleteStaff(_) => "staff.delete",
            Self::CreateStudent(_) => "student.create",
            Self::UpdateStudent(_) => "student.update",
            Self::DeleteStudent(_) => "student.delete",
            Self::CreateExam(_) => "exam.create",
            Self::UpdateExam { .. } => "exam.update",
            Self::DeleteExam(_) => "exam.delete",
            Self::SetGrade { .. } => "exam.setGrade",
        }
    }

    pub fn key(&self) -> String {
        match self {
            Self::CreateFaculty(f) | Self::UpdateFaculty(f) => f.abbr.clone(),
            Self::CreateDepartment(d) | Self::UpdateDepartment(d) => d.code.clone(),
            Self::CreateProgram(p) | Self::UpdateProgram(p) => p.code.clone(),
            Self::DeleteFaculty(k) | Self::DeleteDepartment(k) | Self::DeleteProgram(k) => {
                k.clone()
            }
            Self::LinkCourse {
                program_code,
                course_id,
            }
            | Self::UnlinkCourse {
                program_code,
                course_id,
            } => format!("{}/{}", program_code, course_id),
            Self::CreateCourse(c) | Self::UpdateCourse(c) => c.id.to_string(),
            Self::CreateStaff(s) | Self::UpdateStaff(s) => s.id.to_string(),
            Self::CreateStudent(s) | Self::UpdateStudent(s) => s.reg_num.to_string(),
            Self::DeleteCourse(id) | Self::DeleteStaff(id) | Self::DeleteStudent(id) => {
                id.to_string()
            }
            Self::CreateExam(e) => e.key().to_string(),
            Self::UpdateExam { old, exam } if *old == exam.key() => old.to_string(),
            Self::UpdateExam { old, exam } => format!("{} -> {}", old, exam.key()),
            Self::DeleteExam(k) | Self::SetGrade { key: k, .. } => k.to_string(),
        }
    }
}

/// A mutation that passed every check for the caller's scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated(Mutation);

impl Validated {
    pub fn mutation(&self) -> &Mutation {
        &self.0
    }

    pub fn into_mutation(self) -> Mutation {
        self.0
    }
}

// ---------------------------------------------------------------- validator

pub struct Validator<'a> {
    conn: &'a Connection,
    scope: &'a Scope,
    today: NaiveDate,
}

impl<'a> Validator<'a> {
    pub fn new(conn: &'a Connection, scope: &'a Scope, today: NaiveDate) -> Self {
        Self { conn, scope, today }
    }

    /// Heads always write into their own department, whatever the form says.
    fn force_department(&self, field: &mut Option<FieldValue>) {
        if let Some(own) = &self.scope.department_filter {
            *field = Some(FieldValue::Text(own.clone()));
        }
    }

    fn existing_department(&self, v: &Option<FieldValue>) -> RecordsResult<String> {
        let code = required_text(v, "department")?;
        if store::department_get(self.conn, &code)?.is_none() {
            return Err(RecordsError::validation(format!(
                "department {} does not exist",
                code
            )));
        }
        Ok(code)
    }

    // ---------------------------------------------------------- faculties

    fn faculty(&self, abbr: &str) -> RecordsResult<Faculty> {
        store::faculty_get(self.conn, abbr)?
            .ok_or_else(|| RecordsError::not_found(format!("faculty {} not found", abbr)))
    }

    fn faculty_from_draft(d: &FacultyDraft) -> RecordsResult<Faculty> {
        Ok(Faculty {
            abbr: required_code(&d.abbr, "faculty abbreviation")?,
            name: required_text(&d.name, "faculty name")?,
        })
    }

    pub fn create_faculty(&self, draft: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::DirectoryManage)?;
        let d: FacultyDraft = parse_draft(draft, "faculty")?;
        let faculty = Self::faculty_from_draft(&d)?;
        if store::faculty_get(self.conn, &faculty.abbr)?.is_some() {
            return Err(RecordsError::conflict(format!(
                "faculty {} already exists",
                faculty.abbr
            )));
        }
        Ok(Validated(Mutation::CreateFaculty(faculty)))
    }

    pub fn update_faculty(&self, abbr: &str, patch: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::DirectoryManage)?;
        let current = self.faculty(abbr)?;
        let d = merge_patch(&FacultyDraft::from(&current), patch, "faculty")?;
        let faculty = Self::faculty_from_draft(&d)?;
        keep_key(&faculty.abbr, &current.abbr, "faculty abbreviation")?;
        Ok(Validated(Mutation::UpdateFaculty(faculty)))
    }

    pub fn delete_faculty(&self, abbr: &str) -> RecordsResult<Validated> {
        self.scope.require(Capability::DirectoryManage)?;
        let current = self.faculty(abbr)?;
        let departments = store::faculty_department_count(self.conn, &current.abbr)?;
        if departments > 0 {
            return Err(RecordsError::conflict(format!(
                "faculty {} still has {} department(s)",
                current.abbr, departments
            )));
        }
        Ok(Validated(Mutation::DeleteFaculty(current.abbr)))
    }

    // -------------------------------------------------------- departments

    fn department(&self, code: &str) -> RecordsResult<Department> {
        store::department_get(self.conn, code)?
            .ok_or_else(|| RecordsError::not_found(format!("department {} not found", code)))
    }

    fn department_from_draft(&self, d: &DepartmentDraft) -> RecordsResult<Department> {
        let code = required_code(&d.code, "department code")?;
        let name = required_text(&d.name, "department name")?;
        let faculty_abbr = required_text(&d.faculty_abbr, "faculty")?;
        if store::faculty_get(self.conn, &faculty_abbr)?.is_none() {
            return Err(RecordsError::validation(format!(
                "faculty {} does not exist",
                faculty_abbr
            )));
        }
        Ok(Department {
            code,
            name,
            faculty_abbr,
        })
    }

    pub fn create_department(&self, draft: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::DirectoryManage)?;
        let d: DepartmentDraft = parse_draft(draft, "department")?;
        let department = self.department_from_draft(&d)?;
        if store::department_get(self.conn, &department.code)?.is_some() {
            return Err(RecordsError::conflict(format!(
                "department {} already exists",
                department.code
            )));
        }
        Ok(Validated(Mutation::CreateDepartment(department)))
    }

    pub fn update_department(&self, code: &str, patch: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::DirectoryManage)?;
        let current = self.department(code)?;
        let d = merge_patch(&DepartmentDraft::from(&current), patch, "department")?;
        let department = self.department_from_draft(&d)?;
        keep_key(&department.code, &current.code, "department code")?;
        Ok(Validated(Mutation::UpdateDepartment(department)))
    }

    pub fn delete_department(&self, code: &str) -> RecordsResult<Validated> {
        self.scope.require(Capability::DirectoryManage)?;
        let current = self.department(code)?;
        let (courses, programs, staff) =
            store::department_reference_counts(self.conn, &current.code)?;
        if courses + programs + staff > 0 {
            return Err(RecordsError::conflict(format!(
                "department {} is still referenced by {} course(s), {} program(s), {} staff member(s)",
                current.code, courses, programs, staff
            )));
        }
        Ok(Validated(Mutation::DeleteDepartment(current.code)))
    }

    // ----------------------------------------------------------- programs

    fn program(&self, code: &str) -> RecordsResult<Program> {
        store::program_get(self.conn, code)?
            .ok_or_else(|| RecordsError::not_found(format!("program {} not found", code)))
    }

    fn program_from_draft(&self, d: &ProgramDraft) -> RecordsResult<Program> {
        Ok(Program {
            code: required_code(&d.code, "program code")?,
            title: required_text(&d.title, "program title")?,
            department_code: self.existing_department(&d.department_code)?,
        })
    }

    pub fn create_program(&self, draft: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::DirectoryManage)?;
        let d: ProgramDraft = parse_draft(draft, "program")?;
        let program = self.program_from_draft(&d)?;
        if store::program_get(self.conn, &program.code)?.is_some() {
            return Err(RecordsError::conflict(format!(
                "program {} already exists",
                program.code
            )));
        }
        Ok(Validated(Mutation::CreateProgram(program)))
    }

    pub fn update_program(&self, code: &str, patch: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::DirectoryManage)?;
        let current = self.program(code)?;
        let d = merge_patch(&ProgramDraft::from(&current), patch, "program")?;
        let program = self.program_from_draft(&d)?;
        keep_key(&program.code, &current.code, "program code")?;
        Ok(Validated(Mutation::UpdateProgram(program)))
    }

    pub fn delete_program(&self, code: &str) -> RecordsResult<Validated> {
        self.scope.require(Capability::DirectoryManage)?;
        let current = self.program(code)?;
        let students = store::program_student_count(self.conn, &current.code)?;
        if students > 0 {
            return Err(RecordsError::conflict(format!(
                "program {} still has {} student(s)",
                current.code, students
            )));
        }
        Ok(Validated(Mutation::DeleteProgram(current.code)))
    }

    pub fn link_course(&self, program_code: &str, course_id: i64) -> RecordsResult<Validated> {
        self.scope.require(Capability::DirectoryManage)?;
        let program = self.program(program_code)?;
        let course = self.course(course_id)?;
        if store::curriculum_exists(self.conn, &program.code, course.id)? {
            return Err(RecordsError::conflict(format!(
                "course {} is already in program {}",
                course.id, program.code
            )));
        }
        Ok(Validated(Mutation::LinkCourse {
            program_code: program.code,
            course_id: course.id,
        }))
    }

    pub fn unlink_course(&self, program_code: &str, course_id: i64) -> RecordsResult<Validated> {
        self.scope.require(Capability::DirectoryManage)?;
        if !store::curriculum_exists(self.conn, program_code, course_id)? {
            return Err(RecordsError::not_found(format!(
                "course {} is not in program {}",
                course_id, program_code
            )));
        }
        Ok(Validated(Mutation::UnlinkCourse {
            program_code: program_code.to_string(),
            course_id,
        }))
    }

    // ------------------------------------------------------------ courses

    fn course(&self, id: i64) -> RecordsResult<Course> {
        store::course_get(self.conn, id)?
            .ok_or_else(|| RecordsError::not_found(format!("course {} not found", id)))
    }

    fn course_from_draft(&self, id: i64, d: &CourseDraft) -> RecordsResult<Course> {
        let title = required_text(&d.title, "course title")?;
        let workload = required_int(&d.workload, "workload")?;
        if workload <= 0 {
            return Err(RecordsError::validation(
                "workload must be a positive number of hours",
            ));
        }
        Ok(Course {
            id,
            title,
            workload,
            department_code: self.existing_department(&d.department_code)?,
        })
    }

    pub fn create_course(&self, draft: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::CourseAdd)?;
        let mut d: CourseDraft = parse_draft(draft, "course")?;
        self.force_department(&mut d.department_code);
        let id = store::course_next_id(self.conn)?;
        Ok(Validated(Mutation::CreateCourse(
            self.course_from_draft(id, &d)?,
        )))
    }

    pub fn update_course(&self, id: i64, patch: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::CourseEdit)?;
        let current = self.course(id)?;
        self.scope
            .require_department(&current.department_code, &format!("course {}", id))?;
        let mut d = merge_patch(&CourseDraft::from(&current), patch, "course")?;
        self.force_department(&mut d.department_code);
        Ok(Validated(Mutation::UpdateCourse(
            self.course_from_draft(id, &d)?,
        )))
    }

    pub fn delete_course(&self, id: i64) -> RecordsResult<Validated> {
        self.scope.require(Capability::CourseDelete)?;
        let current = self.course(id)?;
        self.scope
            .require_department(&current.department_code, &format!("course {}", id))?;
        Ok(Validated(Mutation::DeleteCourse(id)))
    }

    // -------------------------------------------------------------- staff

    fn staff(&self, id: i64) -> RecordsResult<Staff> {
        store::staff_get(self.conn, id)?
            .ok_or_else(|| RecordsError::not_found(format!("staff member {} not found", id)))
    }

    fn staff_from_draft(&self, id: i64, d: &StaffDraft) -> RecordsResult<Staff> {
        let full_name = required_text(&d.full_name, "full name")?;
        let raw_position = required_text(&d.position, "position")?;
        let position = Position::parse(&raw_position).unwrap_or(Position::Other(raw_position));
        let salary = optional_salary(&d.salary)?;
        let department_code = self.existing_department(&d.department_code)?;
        let supervisor_id = optional_int(&d.supervisor_id, "supervisor")?;
        if let Some(sup) = supervisor_id {
            if sup == id {
                return Err(RecordsError::validation(
                    "a staff member cannot supervise themselves",
                ));
            }
            if store::staff_get(self.conn, sup)?.is_none() {
                return Err(RecordsError::validation(format!(
                    "supervisor {} does not exist",
                    sup
                )));
            }
        }
        let engineer = d.engineer.as_ref().map(engineer_profile).transpose()?;
        let lecturer = d.lecturer.as_ref().map(|l| LecturerProfile {
            title: optional_text(&l.title),
            degree: optional_text(&l.degree),
        });
        let head_of_department = d.head_of_department.as_ref().map(head_profile).transpose()?;
        Ok(Staff {
            id,
            full_name,
            position,
            salary,
            department_code,
            supervisor_id,
            engineer,
            lecturer,
            head_of_department,
        })
    }

    pub fn create_staff(&self, draft: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::StaffAdd)?;
        let mut d: StaffDraft = parse_draft(draft, "staff member")?;
        self.force_department(&mut d.department_code);
        let id = store::staff_next_id(self.conn)?;
        Ok(Validated(Mutation::CreateStaff(self.staff_from_draft(id, &d)?)))
    }

    pub fn update_staff(&self, id: i64, patch: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::StaffEdit)?;
        let current = self.staff(id)?;
        self.scope
            .require_department(&current.department_code, &format!("staff member {}", id))?;
        let mut d = merge_patch(&StaffDraft::from(&current), patch, "staff member")?;
        self.force_department(&mut d.department_code);
        Ok(Validated(Mutation::UpdateStaff(self.staff_from_draft(id, &d)?)))
    }

    pub fn delete_staff(&self, id: i64) -> RecordsResult<Validated> {
        self.scope.require(Capability::StaffDelete)?;
        let current = self.staff(id)?;
        self.scope
            .require_department(&current.department_code, &format!("staff member {}", id))?;
        Ok(Validated(Mutation::DeleteStaff(id)))
    }

    // ----------------------------------------------------------- students

    fn student(&self, reg_num: i64) -> RecordsResult<Student> {
        store::student_get(self.conn, reg_num)?
            .ok_or_else(|| RecordsError::not_found(format!("student {} not found", reg_num)))
    }

    fn student_department(&self, s: &Student) -> RecordsResult<String> {
        Ok(store::program_get(self.conn, &s.program_code)?
            .map(|p| p.department_code)
            .unwrap_or_default())
    }

    /// Ownership check on the program named in a draft, when it resolves.
    fn check_program_scope(&self, v: &Option<FieldValue>) -> RecordsResult<()> {
        let Some(code) = optional_text(v) else {
            return Ok(());
        };
        if let Some(p) = store::program_get(self.conn, &code)? {
            self.scope
                .require_department(&p.department_code, &format!("program {}", p.code))?;
        }
        Ok(())
    }

    fn student_from_draft(&self, d: &StudentDraft) -> RecordsResult<Student> {
        let reg_num = required_int(&d.reg_num, "registration number")?;
        if reg_num <= 0 {
            return Err(RecordsError::validation(
                "registration number must be a positive number",
            ));
        }
        let full_name = required_text(&d.full_name, "full name")?;
        let program_code = required_text(&d.program_code, "program")?;
        if store::program_get(self.conn, &program_code)?.is_none() {
            return Err(RecordsError::validation(format!(
                "program {} does not exist",
                program_code
            )));
        }
        Ok(Student {
            reg_num,
            full_name,
            program_code,
        })
    }

    pub fn create_student(&self, draft: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::StudentAdd)?;
        let d: StudentDraft = parse_draft(draft, "student")?;
        self.check_program_scope(&d.program_code)?;
        let student = self.student_from_draft(&d)?;
        if store::student_get(self.conn, student.reg_num)?.is_some() {
            return Err(RecordsError::conflict(format!(
                "registration number {} already exists",
                student.reg_num
            )));
        }
        Ok(Validated(Mutation::CreateStudent(student)))
    }

    pub fn update_student(&self, reg_num: i64, patch: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::StudentEdit)?;
        let current = self.student(reg_num)?;
        let dept = self.student_department(&current)?;
        self.scope
            .require_department(&dept, &format!("student {}", reg_num))?;
        let d = merge_patch(&StudentDraft::from(&current), patch, "student")?;
        self.check_program_scope(&d.program_code)?;
        let student = self.student_from_draft(&d)?;
        keep_key(&student.reg_num, &current.reg_num, "registration number")?;
        Ok(Validated(Mutation::UpdateStudent(student)))
    }

    pub fn delete_student(&self, reg_num: i64) -> RecordsResult<Validated> {
        self.scope.require(Capability::StudentDelete)?;
        let current = self.student(reg_num)?;
        let dept = self.student_department(&current)?;
        self.scope
            .require_department(&dept, &format!("student {}", reg_num))?;
        Ok(Validated(Mutation::DeleteStudent(reg_num)))
    }

    // -------------------------------------------------------------- exams

    fn exam(&self, key: &ExamKey) -> RecordsResult<Exam> {
        store::exam_get(self.conn, key)?
            .ok_or_else(|| RecordsError::not_found(format!("exam {} not found", key)))
    }

    fn check_exam_row_scope(&self, exam: &Exam) -> RecordsResult<()> {
        if self.scope.department_filter.is_none() {
            return Ok(());
        }
        let course = self.course(exam.course_id)?;
        self.scope
            .require_department(&course.department_code, &format!("exam {}", exam.key()))
    }

    /// Heads may only reference courses, students and examiners of their
    /// own department. References that do not resolve are left to field
    /// validation.
    fn check_exam_scope(&self, d: &ExamDraft) -> RecordsResult<()> {
        if self.scope.department_filter.is_none() {
            return Ok(());
        }
        if let Some(id) = loose_int(&d.course_id) {
            if let Some(c) = store::course_get(self.conn, id)? {
                self.scope
                    .require_department(&c.department_code, &format!("course {}", id))?;
            }
        }
        if let Some(reg) = loose_int(&d.reg_num) {
            if let Some(s) = store::student_get(self.conn, reg)? {
                let dept = self.student_department(&s)?;
                self.scope
                    .require_department(&dept, &format!("student {}", reg))?;
            }
        }
        if let Some(id) = loose_int(&d.staff_id) {
            if let Some(st) = store::staff_get(self.conn, id)? {
                self.scope
                    .require_department(&st.department_code, &format!("examiner {}", id))?;
            }
        }
        Ok(())
    }

    fn exam_from_draft(&self, d: &ExamDraft) -> RecordsResult<Exam> {
        let course_id = required_int(&d.course_id, "course")?;
        if store::course_get(self.conn, course_id)?.is_none() {
            return Err(RecordsError::validation(format!(
                "course {} does not exist",
                course_id
            )));
        }
        let reg_num = required_int(&d.reg_num, "student")?;
        if store::student_get(self.conn, reg_num)?.is_none() {
            return Err(RecordsError::validation(format!(
                "student {} does not exist",
                reg_num
            )));
        }
        let staff_id = required_int(&d.staff_id, "examiner")?;
        let examiner = store::staff_get(self.conn, staff_id)?.ok_or_else(|| {
            RecordsError::validation(format!("examiner {} does not exist", staff_id))
        })?;
        if !examiner.is_lecturer() {
            return Err(RecordsError::validation(format!(
                "{} is not a lecturer and cannot examine",
                examiner.full_name
            )));
        }
        let date = match present(&d.date) {
            Some(f) => date_value(f)?,
            None => return Err(required("exam date")),
        };
        if date > self.today {
            return Err(RecordsError::validation(format!(
                "exam date {} is in the future",
                date
            )));
        }
        Ok(Exam {
            date,
            course_id,
            reg_num,
            staff_id,
            classroom: required_text(&d.classroom, "classroom")?,
            grade: grade_value(&d.grade)?,
        })
    }

    fn ensure_free(&self, key: &ExamKey) -> RecordsResult<()> {
        if store::exam_get(self.conn, key)?.is_some() {
            return Err(RecordsError::conflict(format!(
                "student {} already has an exam in course {} on {}",
                key.reg_num, key.course_id, key.date
            )));
        }
        Ok(())
    }

    pub fn create_exam(&self, draft: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::ExamAdd)?;
        let d: ExamDraft = parse_draft(draft, "exam")?;
        self.check_exam_scope(&d)?;
        let exam = self.exam_from_draft(&d)?;
        self.ensure_free(&exam.key())?;
        Ok(Validated(Mutation::CreateExam(exam)))
    }

    pub fn update_exam(&self, key: &ExamKey, patch: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::ExamEdit)?;
        let current = self.exam(key)?;
        self.check_exam_row_scope(&current)?;
        let d = merge_patch(&ExamDraft::from(&current), patch, "exam")?;
        self.check_exam_scope(&d)?;
        let exam = self.exam_from_draft(&d)?;
        if exam.key() != *key {
            self.ensure_free(&exam.key())?;
        }
        Ok(Validated(Mutation::UpdateExam { old: *key, exam }))
    }

    pub fn delete_exam(&self, key: &ExamKey) -> RecordsResult<Validated> {
        self.scope.require(Capability::ExamDelete)?;
        let current = self.exam(key)?;
        self.check_exam_row_scope(&current)?;
        Ok(Validated(Mutation::DeleteExam(*key)))
    }

    /// Grading screen: the examiner records or clears a grade.
    pub fn set_grade(&self, key: &ExamKey, grade: &Value) -> RecordsResult<Validated> {
        self.scope.require(Capability::ExamGradeOwn)?;
        let current = self.exam(key)?;
        if Some(current.staff_id) != self.scope.examiner_id {
            return Err(RecordsError::forbidden(format!(
                "exam {} is graded by another examiner",
                key
            )));
        }
        let field: Option<FieldValue> = serde_json::from_value(grade.clone()).map_err(|_| {
            RecordsError::validation("grade must be a number, text or null")
        })?;
        Ok(Validated(Mutation::SetGrade {
            key: *key,
            grade: grade_value(&field)?,
        }))
    }
}

fn engineer_profile(d: &EngineerDraft) -> RecordsResult<EngineerProfile> {
    Ok(EngineerProfile {
        specialty: required_text(&d.specialty, "engineer specialty")?,
    })
}

fn head_profile(d: &HeadDraft) -> RecordsResult<HeadProfile> {
    let years = required_int(&d.experience_years, "experience years")?;
    if years < 0 {
        return Err(RecordsError::validation(
            "experience years must not be negative",
        ));
    }
    Ok(HeadProfile {
        experience_years: years,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{resolve, ActingUser};
    use crate::store::fixtures::seeded;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).expect("date")
    }

    fn scope_of(staff_id: i64, position: &str, dept: &str) -> Scope {
        resolve(Some(&ActingUser {
            staff_id: Some(staff_id),
            position: Some(position.into()),
            department_code: Some(dept.into()),
        }))
    }

    fn head_cs() -> Scope {
        scope_of(1, "department-head", "CS")
    }

    fn engineer() -> Scope {
        scope_of(3, "engineer", "CS")
    }

    fn key(date: &str, course_id: i64, reg_num: i64) -> ExamKey {
        ExamKey {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("date"),
            course_id,
            reg_num,
        }
    }

    fn code_of(r: RecordsResult<Validated>) -> &'static str {
        r.expect_err("expected a refusal").code()
    }

    #[test]
    fn field_values_coerce_from_text_and_numbers() {
        assert_eq!(required_int(&Some("  42 ".into()), "n").expect("int"), 42);
        assert_eq!(
            required_int(&Some(FieldValue::Float(3.0)), "n").expect("int"),
            3
        );
        assert!(required_int(&Some(FieldValue::Float(3.5)), "n").is_err());
        assert!(required_int(&Some("".into()), "n").is_err());
        assert_eq!(optional_int(&Some("   ".into()), "n").expect("blank"), None);
        assert_eq!(grade_value(&Some("".into())).expect("blank grade"), None);
        assert_eq!(grade_value(&Some(4.into())).expect("grade"), Some(4));
        assert!(grade_value(&Some("7".into())).is_err());
        assert!(grade_value(&Some("1".into())).is_err());
        assert_eq!(
            date_value(&"20.05.2024".into()).expect("day-first"),
            NaiveDate::from_ymd_opt(2024, 5, 20).expect("date")
        );
    }

    #[test]
    fn guest_is_refused_before_existence_is_checked() {
        let conn = seeded();
        let guest = Scope::guest();
        let v = Validator::new(&conn, &guest, today());
        assert_eq!(code_of(v.delete_course(999)), "unauthorized");
        assert_eq!(code_of(v.create_student(&json!({}))), "unauthorized");
    }

    #[test]
    fn head_course_edit_stays_in_own_department() {
        let conn = seeded();
        let scope = head_cs();
        let v = Validator::new(&conn, &scope, today());
        let ok = v
            .update_course(1, &json!({"title": "Algorithms II", "departmentCode": "EE"}))
            .expect("edit own course");
        let Mutation::UpdateCourse(c) = ok.into_mutation() else {
            panic!("expected course update");
        };
        assert_eq!(c.department_code, "CS");
        assert_eq!(c.title, "Algorithms II");
        assert_eq!(c.workload, 72);

        assert_eq!(code_of(v.update_course(3, &json!({"title": "x"}))), "forbidden");
        assert_eq!(code_of(v.update_course(99, &json!({}))), "not_found");
        assert_eq!(code_of(v.delete_course(1)), "unauthorized");
    }

    #[test]
    fn new_course_gets_next_id_and_positive_workload() {
        let conn = seeded();
        let scope = engineer();
        let v = Validator::new(&conn, &scope, today());
        let ok = v
            .create_course(&json!({"title": "Compilers", "workload": "36", "departmentCode": "CS"}))
            .expect("create");
        let Mutation::CreateCourse(c) = ok.into_mutation() else {
            panic!("expected course create");
        };
        assert_eq!(c.id, 4);
        assert_eq!(c.workload, 36);
        assert_eq!(
            code_of(v.create_course(&json!({"title": "X", "workload": 0, "departmentCode": "CS"}))),
            "validation_error"
        );
        assert_eq!(
            code_of(v.create_course(&json!({"title": "X", "workload": 5, "departmentCode": "ZZ"}))),
            "validation_error"
        );
        assert_eq!(
            code_of(v.create_course(&json!({"title": "X", "workload": 5, "bogus": 1}))),
            "validation_error"
        );
    }

    #[test]
    fn head_creates_staff_in_own_department() {
        let conn = seeded();
        let scope = head_cs();
        let v = Validator::new(&conn, &scope, today());
        let ok = v
            .create_staff(&json!({
                "fullName": "Nina New",
                "position": "lecturer",
                "salary": "1200,50",
                "departmentCode": "EE",
                "supervisorId": 1,
                "lecturer": {"title": "Assistant"}
            }))
            .expect("create staff");
        let Mutation::CreateStaff(s) = ok.into_mutation() else {
            panic!("expected staff create");
        };
        assert_eq!(s.id, 6);
        assert_eq!(s.department_code, "CS");
        assert_eq!(s.salary.map(Salary::cents), Some(120_050));
        assert_eq!(
            s.lecturer,
            Some(LecturerProfile {
                title: Some("Assistant".into()),
                degree: None
            })
        );
    }

    #[test]
    fn staff_field_rules() {
        let conn = seeded();
        let scope = engineer();
        let v = Validator::new(&conn, &scope, today());
        let base = json!({"fullName": "A", "position": "engineer", "departmentCode": "CS"});
        let mut neg = base.clone();
        neg["salary"] = json!("-5");
        assert_eq!(code_of(v.create_staff(&neg)), "validation_error");
        let mut no_specialty = base.clone();
        no_specialty["engineer"] = json!({"specialty": " "});
        assert_eq!(code_of(v.create_staff(&no_specialty)), "validation_error");
        let mut ghost_boss = base.clone();
        ghost_boss["supervisorId"] = json!(77);
        assert_eq!(code_of(v.create_staff(&ghost_boss)), "validation_error");
        assert_eq!(
            code_of(v.update_staff(2, &json!({"supervisorId": 2}))),
            "validation_error"
        );
        assert_eq!(
            code_of(v.update_staff(1, &json!({"headOfDepartment": {"experienceYears": -1}}))),
            "validation_error"
        );
    }

    #[test]
    fn null_extension_in_patch_removes_it() {
        let conn = seeded();
        let scope = engineer();
        let v = Validator::new(&conn, &scope, today());
        let ok = v
            .update_staff(2, &json!({"lecturer": null, "salary": ""}))
            .expect("update");
        let Mutation::UpdateStaff(s) = ok.into_mutation() else {
            panic!("expected staff update");
        };
        assert_eq!(s.lecturer, None);
        assert_eq!(s.salary, None);
        assert_eq!(s.supervisor_id, Some(1));
    }

    #[test]
    fn student_registration_number_rules() {
        let conn = seeded();
        let head = head_cs();
        let v = Validator::new(&conn, &head, today());
        assert_eq!(
            code_of(v.create_student(&json!({"regNum": 1001, "fullName": "Dup", "programCode": "CS-B"}))),
            "conflict"
        );
        assert_eq!(
            code_of(v.create_student(&json!({"regNum": 3001, "fullName": "X", "programCode": "EE-B"}))),
            "forbidden"
        );
        assert_eq!(
            code_of(v.create_student(&json!({"regNum": "-4", "fullName": "X", "programCode": "CS-B"}))),
            "validation_error"
        );
        assert!(v
            .create_student(&json!({"regNum": "3001", "fullName": "New", "programCode": "CS-B"}))
            .is_ok());
        assert_eq!(code_of(v.delete_student(2001)), "forbidden");

        let eng = engineer();
        let v = Validator::new(&conn, &eng, today());
        assert_eq!(
            code_of(v.update_student(1001, &json!({"regNum": 1009}))),
            "validation_error"
        );
        assert!(v.update_student(1001, &json!({"fullName": "Sam Renamed"})).is_ok());
    }

    #[test]
    fn exam_date_must_not_be_in_the_future() {
        let conn = seeded();
        let scope = engineer();
        let v = Validator::new(&conn, &scope, today());
        let draft = |date: &str| {
            json!({"date": date, "courseId": 2, "regNum": 1002, "staffId": 2, "classroom": "B1"})
        };
        assert_eq!(code_of(v.create_exam(&draft("2025-01-16"))), "validation_error");
        assert!(v.create_exam(&draft("2025-01-15")).is_ok());
    }

    #[test]
    fn exam_triple_must_be_unique_and_examiner_a_lecturer() {
        let conn = seeded();
        let scope = engineer();
        let v = Validator::new(&conn, &scope, today());
        assert_eq!(
            code_of(v.create_exam(&json!({
                "date": "2024-05-20", "courseId": 1, "regNum": 1001, "staffId": 2, "classroom": "C3"
            }))),
            "conflict"
        );
        assert_eq!(
            code_of(v.create_exam(&json!({
                "date": "2024-05-22", "courseId": 1, "regNum": 1001, "staffId": 1, "classroom": "C3"
            }))),
            "validation_error"
        );
        assert_eq!(
            code_of(v.create_exam(&json!({
                "date": "2024-05-22", "courseId": 1, "regNum": 1001, "staffId": 2, "classroom": "C3", "grade": 6
            }))),
            "validation_error"
        );
    }

    #[test]
    fn head_cannot_schedule_across_departments() {
        let conn = seeded();
        let ee = scope_of(4, "department-head", "EE");
        let v = Validator::new(&conn, &ee, today());
        assert_eq!(
            code_of(v.create_exam(&json!({
                "date": "2024-09-01", "courseId": 1, "regNum": 2001, "staffId": 5, "classroom": "E1"
            }))),
            "forbidden"
        );
        assert_eq!(
            code_of(v.delete_exam(&key("2024-05-20", 1, 1001))),
            "forbidden"
        );
        assert!(v.delete_exam(&key("2024-06-01", 3, 2001)).is_ok());
    }

    #[test]
    fn moving_an_exam_onto_an_existing_key_conflicts() {
        let conn = seeded();
        let scope = engineer();
        let v = Validator::new(&conn, &scope, today());
        let from = key("2024-05-20", 1, 1002);
        assert_eq!(
            code_of(v.update_exam(&from, &json!({"regNum": 1001}))),
            "conflict"
        );
        let ok = v
            .update_exam(&from, &json!({"date": "2024-05-23"}))
            .expect("move");
        let Mutation::UpdateExam { old, exam } = ok.into_mutation() else {
            panic!("expected exam update");
        };
        assert_eq!(old, from);
        assert_eq!(exam.key(), key("2024-05-23", 1, 1002));
        let same = v
            .update_exam(&from, &json!({"classroom": "Z9"}))
            .expect("edit in place");
        assert!(matches!(
            same.mutation(),
            Mutation::UpdateExam { old, exam } if *old == exam.key()
        ));
    }

    #[test]
    fn set_grade_order_of_checks() {
        let conn = seeded();
        let lev = scope_of(2, "lecturer", "CS");
        let lena = scope_of(5, "lecturer", "EE");
        let k = key("2024-05-20", 1, 1002);

        let v = Validator::new(&conn, &lev, today());
        assert_eq!(code_of(v.set_grade(&k, &json!("7"))), "validation_error");
        assert_eq!(code_of(v.set_grade(&k, &json!(true))), "validation_error");
        let cleared = v.set_grade(&k, &json!("")).expect("clear");
        assert_eq!(
            cleared.into_mutation(),
            Mutation::SetGrade { key: k, grade: None }
        );
        let graded = v.set_grade(&k, &json!(4)).expect("grade");
        assert_eq!(
            graded.into_mutation(),
            Mutation::SetGrade {
                key: k,
                grade: Some(4)
            }
        );
        assert_eq!(
            code_of(v.set_grade(&key("2030-01-01", 1, 1002), &json!(4))),
            "not_found"
        );

        let v = Validator::new(&conn, &lena, today());
        assert_eq!(code_of(v.set_grade(&k, &json!(4))), "forbidden");

        let eng = engineer();
        let v = Validator::new(&conn, &eng, today());
        assert_eq!(code_of(v.set_grade(&k, &json!(4))), "unauthorized");
    }

    #[test]
    fn directory_rules() {
        let conn = seeded();
        let scope = engineer();
        let v = Validator::new(&conn, &scope, today());
        assert_eq!(code_of(v.delete_faculty("ENG")), "conflict");
        assert_eq!(code_of(v.delete_department("CS")), "conflict");
        assert_eq!(code_of(v.delete_program("CS-B")), "conflict");
        assert_eq!(
            code_of(v.create_department(&json!({"code": "MA", "name": "Maths", "facultyAbbr": "SCI"}))),
            "validation_error"
        );
        assert_eq!(
            code_of(v.create_faculty(&json!({"abbr": "ABCDEFGHIJK", "name": "Too long"}))),
            "validation_error"
        );
        assert_eq!(
            code_of(v.create_faculty(&json!({"abbr": "ENG", "name": "Again"}))),
            "conflict"
        );
        assert_eq!(
            code_of(v.update_program("CS-B", &json!({"code": "CS-M"}))),
            "validation_error"
        );
        assert_eq!(code_of(v.link_course("CS-B", 1)), "conflict");
        assert_eq!(code_of(v.link_course("CS-B", 42)), "not_found");
        assert!(v.link_course("CS-B", 2).is_ok());
        assert_eq!(code_of(v.unlink_course("EE-B", 1)), "not_found");

        let head = head_cs();
        let v = Validator::new(&conn, &head, today());
        assert_eq!(
            code_of(v.create_faculty(&json!({"abbr": "SCI", "name": "Science"}))),
            "unauthorized"
        );
    }
}
