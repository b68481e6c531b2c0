//! Table-level reads and writes. No rule checking happens here: callers go
//! through the validator, and only the applier writes.

use crate::model::{
    Course, Department, EngineerProfile, Exam, ExamKey, Faculty, HeadProfile, LecturerProfile,
    Position, Program, Salary, Staff, Student,
};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn date_text(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

fn date_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ---------------------------------------------------------------- faculties

fn faculty_from_row(row: &Row) -> rusqlite::Result<Faculty> {
    Ok(Faculty {
        abbr: row.get(0)?,
        name: row.get(1)?,
    })
}

pub fn faculties_all(conn: &Connection) -> rusqlite::Result<Vec<Faculty>> {
    let mut stmt = conn.prepare("SELECT abbr, name FROM faculties ORDER BY abbr")?;
    let rows = stmt.query_map([], faculty_from_row)?;
    rows.collect()
}

pub fn faculty_get(conn: &Connection, abbr: &str) -> rusqlite::Result<Option<Faculty>> {
    conn.query_row(
        "SELECT abbr, name FROM faculties WHERE abbr = ?",
        [abbr],
        faculty_from_row,
    )
    .optional()
}

pub fn faculty_insert(conn: &Connection, f: &Faculty) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO faculties(abbr, name) VALUES(?, ?)",
        (&f.abbr, &f.name),
    )?;
    Ok(())
}

pub fn faculty_update(conn: &Connection, f: &Faculty) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE faculties SET name = ? WHERE abbr = ?",
        (&f.name, &f.abbr),
    )
}

pub fn faculty_delete(conn: &Connection, abbr: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM faculties WHERE abbr = ?", [abbr])
}

pub fn faculty_department_count(conn: &Connection, abbr: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM departments WHERE faculty_abbr = ?",
        [abbr],
        |r| r.get(0),
    )
}

// -------------------------------------------------------------- departments

fn department_from_row(row: &Row) -> rusqlite::Result<Department> {
    Ok(Department {
        code: row.get(0)?,
        name: row.get(1)?,
        faculty_abbr: row.get(2)?,
    })
}

pub fn departments_all(conn: &Connection) -> rusqlite::Result<Vec<Department>> {
    let mut stmt =
        conn.prepare("SELECT code, name, faculty_abbr FROM departments ORDER BY code")?;
    let rows = stmt.query_map([], department_from_row)?;
    rows.collect()
}

pub fn department_get(conn: &Connection, code: &str) -> rusqlite::Result<Option<Department>> {
    conn.query_row(
        "SELECT code, name, faculty_abbr FROM departments WHERE code = ?",
        [code],
        department_from_row,
    )
    .optional()
}

pub fn department_insert(conn: &Connection, d: &Department) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO departments(code, name, faculty_abbr) VALUES(?, ?, ?)",
        (&d.code, &d.name, &d.faculty_abbr),
    )?;
    Ok(())
}

pub fn department_update(conn: &Connection, d: &Department) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE departments SET name = ?, faculty_abbr = ? WHERE code = ?",
        (&d.name, &d.faculty_abbr, &d.code),
    )
}

pub fn department_delete(conn: &Connection, code: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM departments WHERE code = ?", [code])
}

/// Rows that still point at a department: (courses, programs, staff).
pub fn department_reference_counts(
    conn: &Connection,
    code: &str,
) -> rusqlite::Result<(i64, i64, i64)> {
    conn.query_row(
        "SELECT
           (SELECT COUNT(*) FROM courses WHERE dept_code = ?1),
           (SELECT COUNT(*) FROM programs WHERE dept_code = ?1),
           (SELECT COUNT(*) FROM staff WHERE dept_code = ?1)",
        [code],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )
}

// ----------------------------------------------------------------- programs

fn program_from_row(row: &Row) -> rusqlite::Result<Program> {
    Ok(Program {
        code: row.get(0)?,
        title: row.get(1)?,
        department_code: row.get(2)?,
    })
}

pub fn programs_all(conn: &Connection, dept: Option<&str>) -> rusqlite::Result<Vec<Program>> {
    let mut stmt = conn.prepare(
        "SELECT code, title, dept_code
         FROM programs
         WHERE ?1 IS NULL OR dept_code = ?1
         ORDER BY code",
    )?;
    let rows = stmt.query_map([dept], program_from_row)?;
    rows.collect()
}

pub fn program_get(conn: &Connection, code: &str) -> rusqlite::Result<Option<Program>> {
    conn.query_row(
        "SELECT code, title, dept_code FROM programs WHERE code = ?",
        [code],
        program_from_row,
    )
    .optional()
}

pub fn program_insert(conn: &Connection, p: &Program) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO programs(code, title, dept_code) VALUES(?, ?, ?)",
        (&p.code, &p.title, &p.department_code),
    )?;
    Ok(())
}

pub fn program_update(conn: &Connection, p: &Program) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE programs SET title = ?, dept_code = ? WHERE code = ?",
        (&p.title, &p.department_code, &p.code),
    )
}

pub fn program_delete(conn: &Connection, code: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM programs WHERE code = ?", [code])
}

pub fn program_student_count(conn: &Connection, code: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM students WHERE program_code = ?",
        [code],
        |r| r.get(0),
    )
}

// --------------------------------------------------------------- curriculum

pub fn curriculum_course_ids(conn: &Connection, program_code: &str) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT course_id FROM curriculum WHERE program_code = ? ORDER BY course_id",
    )?;
    let rows = stmt.query_map([program_code], |r| r.get(0))?;
    rows.collect()
}

pub fn curriculum_exists(
    conn: &Connection,
    program_code: &str,
    course_id: i64,
) -> rusqlite::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM curriculum WHERE program_code = ? AND course_id = ?",
            (program_code, course_id),
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn curriculum_insert(
    conn: &Connection,
    program_code: &str,
    course_id: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO curriculum(program_code, course_id) VALUES(?, ?)",
        (program_code, course_id),
    )?;
    Ok(())
}

pub fn curriculum_delete(
    conn: &Connection,
    program_code: &str,
    course_id: i64,
) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM curriculum WHERE program_code = ? AND course_id = ?",
        (program_code, course_id),
    )
}

pub fn curriculum_delete_for_course(conn: &Connection, course_id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM curriculum WHERE course_id = ?", [course_id])
}

pub fn curriculum_delete_for_program(
    conn: &Connection,
    program_code: &str,
) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM curriculum WHERE program_code = ?",
        [program_code],
    )
}

// ------------------------------------------------------------------ courses

fn course_from_row(row: &Row) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        title: row.get(1)?,
        workload: row.get(2)?,
        department_code: row.get(3)?,
    })
}

pub fn courses_all(conn: &Connection, dept: Option<&str>) -> rusqlite::Result<Vec<Course>> {
    let mut stmt = conn.prepare(
        "SELECT course_id, title, workload, dept_code
         FROM courses
         WHERE ?1 IS NULL OR dept_code = ?1
         ORDER BY course_id",
    )?;
    let rows = stmt.query_map([dept], course_from_row)?;
    rows.collect()
}

pub fn course_get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Course>> {
    conn.query_row(
        "SELECT course_id, title, workload, dept_code FROM courses WHERE course_id = ?",
        [id],
        course_from_row,
    )
    .optional()
}

pub fn course_next_id(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(course_id), 0) + 1 FROM courses",
        [],
        |r| r.get(0),
    )
}

pub fn course_insert(conn: &Connection, c: &Course) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO courses(course_id, title, workload, dept_code) VALUES(?, ?, ?, ?)",
        (c.id, &c.title, c.workload, &c.department_code),
    )?;
    Ok(())
}

pub fn course_update(conn: &Connection, c: &Course) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE courses SET title = ?, workload = ?, dept_code = ? WHERE course_id = ?",
        (&c.title, c.workload, &c.department_code, c.id),
    )
}

pub fn course_delete(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM courses WHERE course_id = ?", [id])
}

// -------------------------------------------------------------------- staff

const STAFF_SELECT: &str = "SELECT
       s.staff_id,
       s.dept_code,
       s.full_name,
       s.position,
       s.salary_cents,
       s.supervisor_id,
       e.specialty,
       l.staff_id,
       l.title,
       l.degree,
       h.experience_years
     FROM staff s
     LEFT JOIN engineers e ON e.staff_id = s.staff_id
     LEFT JOIN lecturers l ON l.staff_id = s.staff_id
     LEFT JOIN heads_of_department h ON h.staff_id = s.staff_id";

fn staff_from_row(row: &Row) -> rusqlite::Result<Staff> {
    let raw_position: String = row.get(3)?;
    let position = Position::parse(&raw_position).unwrap_or(Position::Other(raw_position));
    let salary_cents: Option<i64> = row.get(4)?;
    let specialty: Option<String> = row.get(6)?;
    let lecturer_id: Option<i64> = row.get(7)?;
    let experience_years: Option<i64> = row.get(10)?;
    Ok(Staff {
        id: row.get(0)?,
        department_code: row.get(1)?,
        full_name: row.get(2)?,
        position,
        salary: salary_cents.and_then(Salary::from_cents),
        supervisor_id: row.get(5)?,
        engineer: specialty.map(|specialty| EngineerProfile { specialty }),
        lecturer: match lecturer_id {
            Some(_) => Some(LecturerProfile {
                title: row.get(8)?,
                degree: row.get(9)?,
            }),
            None => None,
        },
        head_of_department: experience_years.map(|experience_years| HeadProfile { experience_years }),
    })
}

pub fn staff_all(conn: &Connection, dept: Option<&str>) -> rusqlite::Result<Vec<Staff>> {
    let sql = format!(
        "{} WHERE ?1 IS NULL OR s.dept_code = ?1 ORDER BY s.staff_id",
        STAFF_SELECT
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([dept], staff_from_row)?;
    rows.collect()
}

pub fn staff_get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Staff>> {
    let sql = format!("{} WHERE s.staff_id = ?", STAFF_SELECT);
    conn.query_row(&sql, [id], staff_from_row).optional()
}

pub fn staff_next_id(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(staff_id), 0) + 1 FROM staff",
        [],
        |r| r.get(0),
    )
}

pub fn staff_insert(conn: &Connection, s: &Staff) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO staff(staff_id, dept_code, full_name, position, salary_cents, supervisor_id)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            s.id,
            &s.department_code,
            &s.full_name,
            s.position.as_str(),
            s.salary.map(Salary::cents),
            s.supervisor_id,
        ),
    )?;
    staff_write_profiles(conn, s)
}

pub fn staff_update(conn: &Connection, s: &Staff) -> rusqlite::Result<usize> {
    let changed = conn.execute(
        "UPDATE staff
         SET dept_code = ?, full_name = ?, position = ?, salary_cents = ?, supervisor_id = ?
         WHERE staff_id = ?",
        (
            &s.department_code,
            &s.full_name,
            s.position.as_str(),
            s.salary.map(Salary::cents),
            s.supervisor_id,
            s.id,
        ),
    )?;
    staff_write_profiles(conn, s)?;
    Ok(changed)
}

/// Makes the extension tables mirror the profiles carried by `s`.
fn staff_write_profiles(conn: &Connection, s: &Staff) -> rusqlite::Result<()> {
    staff_delete_profiles(conn, s.id)?;
    if let Some(e) = &s.engineer {
        conn.execute(
            "INSERT INTO engineers(staff_id, specialty) VALUES(?, ?)",
            (s.id, &e.specialty),
        )?;
    }
    if let Some(l) = &s.lecturer {
        conn.execute(
            "INSERT INTO lecturers(staff_id, title, degree) VALUES(?, ?, ?)",
            (s.id, l.title.as_deref(), l.degree.as_deref()),
        )?;
    }
    if let Some(h) = &s.head_of_department {
        conn.execute(
            "INSERT INTO heads_of_department(staff_id, experience_years) VALUES(?, ?)",
            (s.id, h.experience_years),
        )?;
    }
    Ok(())
}

pub fn staff_delete_profiles(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    let mut n = conn.execute("DELETE FROM engineers WHERE staff_id = ?", [id])?;
    n += conn.execute("DELETE FROM lecturers WHERE staff_id = ?", [id])?;
    n += conn.execute("DELETE FROM heads_of_department WHERE staff_id = ?", [id])?;
    Ok(n)
}

pub fn staff_clear_supervisor(conn: &Connection, supervisor_id: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE staff SET supervisor_id = NULL WHERE supervisor_id = ?",
        [supervisor_id],
    )
}

pub fn staff_delete(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM staff WHERE staff_id = ?", [id])
}

// ----------------------------------------------------------------- students

fn student_from_row(row: &Row) -> rusqlite::Result<Student> {
    Ok(Student {
        reg_num: row.get(0)?,
        full_name: row.get(1)?,
        program_code: row.get(2)?,
    })
}

/// Students whose program belongs to `dept` (all students when `None`).
pub fn students_all(conn: &Connection, dept: Option<&str>) -> rusqlite::Result<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT st.reg_num, st.full_name, st.program_code
         FROM students st
         JOIN programs p ON p.code = st.program_code
         WHERE ?1 IS NULL OR p.dept_code = ?1
         ORDER BY st.reg_num",
    )?;
    let rows = stmt.query_map([dept], student_from_row)?;
    rows.collect()
}

pub fn student_get(conn: &Connection, reg_num: i64) -> rusqlite::Result<Option<Student>> {
    conn.query_row(
        "SELECT reg_num, full_name, program_code FROM students WHERE reg_num = ?",
        [reg_num],
        student_from_row,
    )
    .optional()
}

pub fn student_insert(conn: &Connection, s: &Student) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO students(reg_num, program_code, full_name) VALUES(?, ?, ?)",
        (s.reg_num, &s.program_code, &s.full_name),
    )?;
    Ok(())
}

pub fn student_update(conn: &Connection, s: &Student) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE students SET program_code = ?, full_name = ? WHERE reg_num = ?",
        (&s.program_code, &s.full_name, s.reg_num),
    )
}

pub fn student_delete(conn: &Connection, reg_num: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM students WHERE reg_num = ?", [reg_num])
}

// -------------------------------------------------------------------- exams

fn exam_from_row(row: &Row) -> rusqlite::Result<Exam> {
    Ok(Exam {
        date: date_column(row, 0)?,
        course_id: row.get(1)?,
        reg_num: row.get(2)?,
        staff_id: row.get(3)?,
        classroom: row.get(4)?,
        grade: row.get(5)?,
    })
}

/// Exams of courses in `dept` and/or examined by `examiner`.
pub fn exams_all(
    conn: &Connection,
    dept: Option<&str>,
    examiner: Option<i64>,
) -> rusqlite::Result<Vec<Exam>> {
    let mut stmt = conn.prepare(
        "SELECT ex.exam_date, ex.course_id, ex.reg_num, ex.staff_id, ex.classroom, ex.grade
         FROM exams ex
         JOIN courses c ON c.course_id = ex.course_id
         WHERE (?1 IS NULL OR c.dept_code = ?1)
           AND (?2 IS NULL OR ex.staff_id = ?2)
         ORDER BY ex.exam_date, ex.course_id, ex.reg_num",
    )?;
    let rows = stmt.query_map((dept, examiner), exam_from_row)?;
    rows.collect()
}

pub fn exam_get(conn: &Connection, key: &ExamKey) -> rusqlite::Result<Option<Exam>> {
    conn.query_row(
        "SELECT exam_date, course_id, reg_num, staff_id, classroom, grade
         FROM exams
         WHERE exam_date = ? AND course_id = ? AND reg_num = ?",
        (date_text(key.date), key.course_id, key.reg_num),
        exam_from_row,
    )
    .optional()
}

pub fn exam_insert(conn: &Connection, e: &Exam) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO exams(exam_date, course_id, reg_num, staff_id, classroom, grade)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            date_text(e.date),
            e.course_id,
            e.reg_num,
            e.staff_id,
            &e.classroom,
            e.grade,
        ),
    )?;
    Ok(())
}

/// Updates the non-key columns of the exam identified by `e.key()`.
pub fn exam_update(conn: &Connection, e: &Exam) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE exams SET staff_id = ?, classroom = ?, grade = ?
         WHERE exam_date = ? AND course_id = ? AND reg_num = ?",
        (
            e.staff_id,
            &e.classroom,
            e.grade,
            date_text(e.date),
            e.course_id,
            e.reg_num,
        ),
    )
}

pub fn exam_set_grade(conn: &Connection, key: &ExamKey, grade: Option<i64>) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE exams SET grade = ? WHERE exam_date = ? AND course_id = ? AND reg_num = ?",
        (grade, date_text(key.date), key.course_id, key.reg_num),
    )
}

pub fn exam_delete(conn: &Connection, key: &ExamKey) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM exams WHERE exam_date = ? AND course_id = ? AND reg_num = ?",
        (date_text(key.date), key.course_id, key.reg_num),
    )
}

pub fn exams_delete_for_course(conn: &Connection, course_id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM exams WHERE course_id = ?", [course_id])
}

pub fn exams_delete_for_student(conn: &Connection, reg_num: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM exams WHERE reg_num = ?", [reg_num])
}

pub fn exams_delete_for_staff(conn: &Connection, staff_id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM exams WHERE staff_id = ?", [staff_id])
}
