use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "records.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Creates every table and index if missing. Safe to run on an existing workspace.
pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS faculties(
            abbr TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS departments(
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            faculty_abbr TEXT NOT NULL,
            FOREIGN KEY(faculty_abbr) REFERENCES faculties(abbr)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_departments_faculty ON departments(faculty_abbr)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS programs(
            code TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            dept_code TEXT NOT NULL,
            FOREIGN KEY(dept_code) REFERENCES departments(code)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_programs_dept ON programs(dept_code)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            course_id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            workload INTEGER NOT NULL CHECK(workload > 0),
            dept_code TEXT NOT NULL,
            FOREIGN KEY(dept_code) REFERENCES departments(code)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_dept ON courses(dept_code)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS curriculum(
            program_code TEXT NOT NULL,
            course_id INTEGER NOT NULL,
            PRIMARY KEY(program_code, course_id),
            FOREIGN KEY(program_code) REFERENCES programs(code),
            FOREIGN KEY(course_id) REFERENCES courses(course_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_curriculum_course ON curriculum(course_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS staff(
            staff_id INTEGER PRIMARY KEY,
            dept_code TEXT NOT NULL,
            full_name TEXT NOT NULL,
            position TEXT NOT NULL,
            salary_cents INTEGER CHECK(salary_cents IS NULL OR salary_cents >= 0),
            supervisor_id INTEGER,
            FOREIGN KEY(dept_code) REFERENCES departments(code),
            FOREIGN KEY(supervisor_id) REFERENCES staff(staff_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_staff_dept ON staff(dept_code)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_staff_supervisor ON staff(supervisor_id)",
        [],
    )?;

    // One row per staff member at most: the staff id is the primary key.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS engineers(
            staff_id INTEGER PRIMARY KEY,
            specialty TEXT NOT NULL,
            FOREIGN KEY(staff_id) REFERENCES staff(staff_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS lecturers(
            staff_id INTEGER PRIMARY KEY,
            title TEXT,
            degree TEXT,
            FOREIGN KEY(staff_id) REFERENCES staff(staff_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS heads_of_department(
            staff_id INTEGER PRIMARY KEY,
            experience_years INTEGER NOT NULL CHECK(experience_years >= 0),
            FOREIGN KEY(staff_id) REFERENCES staff(staff_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            reg_num INTEGER PRIMARY KEY,
            program_code TEXT NOT NULL,
            full_name TEXT NOT NULL,
            FOREIGN KEY(program_code) REFERENCES programs(code)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_program ON students(program_code)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS exams(
            exam_date TEXT NOT NULL,
            course_id INTEGER NOT NULL,
            reg_num INTEGER NOT NULL,
            staff_id INTEGER NOT NULL,
            classroom TEXT NOT NULL,
            grade INTEGER CHECK(grade IS NULL OR (grade >= 2 AND grade <= 5)),
            PRIMARY KEY(exam_date, course_id, reg_num),
            FOREIGN KEY(course_id) REFERENCES courses(course_id),
            FOREIGN KEY(reg_num) REFERENCES students(reg_num),
            FOREIGN KEY(staff_id) REFERENCES staff(staff_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_exams_course ON exams(course_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_exams_student ON exams(reg_num)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_exams_staff ON exams(staff_id)",
        [],
    )?;

    Ok(())
}
