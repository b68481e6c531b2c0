//! Persists validated mutations. Validation and writes share one
//! transaction, so a refused or failing step leaves the database untouched.

use crate::error::{RecordsError, RecordsResult};
use crate::model::{Course, Department, Exam, Faculty, Program, Staff, Student};
use crate::store;
use crate::validate::{Mutation, Validated};
use rusqlite::Connection;
use serde::Serialize;

/// Rows removed by a delete, including cascades.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Removal {
    pub removed: usize,
    pub exams: usize,
    pub curriculum_links: usize,
    pub profiles: usize,
    pub subordinates_released: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Applied {
    Faculty(Faculty),
    Department(Department),
    Program(Program),
    Course(Course),
    Staff(Staff),
    Student(Student),
    Exam(Exam),
    #[serde(rename_all = "camelCase")]
    Link {
        program_code: String,
        course_id: i64,
        linked: bool,
    },
    Removed(Removal),
}

fn reread<T>(found: Option<T>, what: String) -> RecordsResult<T> {
    found.ok_or_else(|| RecordsError::not_found(format!("{} vanished while saving", what)))
}

/// Writes one mutation and returns the row as stored.
pub fn apply(conn: &Connection, validated: Validated) -> RecordsResult<Applied> {
    let applied = match validated.into_mutation() {
        Mutation::CreateFaculty(f) => {
            store::faculty_insert(conn, &f)?;
            Applied::Faculty(reread(store::faculty_get(conn, &f.abbr)?, format!("faculty {}", f.abbr))?)
        }
        Mutation::UpdateFaculty(f) => {
            store::faculty_update(conn, &f)?;
            Applied::Faculty(reread(store::faculty_get(conn, &f.abbr)?, format!("faculty {}", f.abbr))?)
        }
        Mutation::DeleteFaculty(abbr) => Applied::Removed(Removal {
            removed: store::faculty_delete(conn, &abbr)?,
            ..Removal::default()
        }),
        Mutation::CreateDepartment(d) => {
            store::department_insert(conn, &d)?;
            Applied::Department(reread(
                store::department_get(conn, &d.code)?,
                format!("department {}", d.code),
            )?)
        }
        Mutation::UpdateDepartment(d) => {
            store::department_update(conn, &d)?;
            Applied::Department(reread(
                store::department_get(conn, &d.code)?,
                format!("department {}", d.code),
            )?)
        }
        Mutation::DeleteDepartment(code) => Applied::Removed(Removal {
            removed: store::department_delete(conn, &code)?,
            ..Removal::default()
        }),
        Mutation::CreateProgram(p) => {
            store::program_insert(conn, &p)?;
            Applied::Program(reread(store::program_get(conn, &p.code)?, format!("program {}", p.code))?)
        }
        Mutation::UpdateProgram(p) => {
            store::program_update(conn, &p)?;
            Applied::Program(reread(store::program_get(conn, &p.code)?, format!("program {}", p.code))?)
        }
        Mutation::DeleteProgram(code) => {
            let curriculum_links = store::curriculum_delete_for_program(conn, &code)?;
            Applied::Removed(Removal {
                removed: store::program_delete(conn, &code)?,
                curriculum_links,
                ..Removal::default()
            })
        }
        Mutation::LinkCourse {
            program_code,
            course_id,
        } => {
            store::curriculum_insert(conn, &program_code, course_id)?;
            Applied::Link {
                program_code,
                course_id,
                linked: true,
            }
        }
        Mutation::UnlinkCourse {
            program_code,
            course_id,
        } => {
            store::curriculum_delete(conn, &program_code, course_id)?;
            Applied::Link {
                program_code,
                course_id,
                linked: false,
            }
        }
        Mutation::CreateCourse(c) => {
            store::course_insert(conn, &c)?;
            Applied::Course(reread(store::course_get(conn, c.id)?, format!("course {}", c.id))?)
        }
        Mutation::UpdateCourse(c) => {
            store::course_update(conn, &c)?;
            Applied::Course(reread(store::course_get(conn, c.id)?, format!("course {}", c.id))?)
        }
        Mutation::DeleteCourse(id) => {
            let exams = store::exams_delete_for_course(conn, id)?;
            let curriculum_links = store::curriculum_delete_for_course(conn, id)?;
            Applied::Removed(Removal {
                removed: store::course_delete(conn, id)?,
                exams,
                curriculum_links,
                ..Removal::default()
            })
        }
        Mutation::CreateStaff(s) => {
            store::staff_insert(conn, &s)?;
            Applied::Staff(reread(store::staff_get(conn, s.id)?, format!("staff member {}", s.id))?)
        }
        Mutation::UpdateStaff(s) => {
            store::staff_update(conn, &s)?;
            Applied::Staff(reread(store::staff_get(conn, s.id)?, format!("staff member {}", s.id))?)
        }
        Mutation::DeleteStaff(id) => {
            let exams = store::exams_delete_for_staff(conn, id)?;
            let subordinates_released = store::staff_clear_supervisor(conn, id)?;
            let profiles = store::staff_delete_profiles(conn, id)?;
            Applied::Removed(Removal {
                removed: store::staff_delete(conn, id)?,
                exams,
                profiles,
                subordinates_released,
                ..Removal::default()
            })
        }
        Mutation::CreateStudent(s) => {
            store::student_insert(conn, &s)?;
            Applied::Student(reread(
                store::student_get(conn, s.reg_num)?,
                format!("student {}", s.reg_num),
            )?)
        }
        Mutation::UpdateStudent(s) => {
            store::student_update(conn, &s)?;
            Applied::Student(reread(
                store::student_get(conn, s.reg_num)?,
                format!("student {}", s.reg_num),
            )?)
        }
        Mutation::DeleteStudent(reg_num) => {
            let exams = store::exams_delete_for_student(conn, reg_num)?;
            Applied::Removed(Removal {
                removed: store::student_delete(conn, reg_num)?,
                exams,
                ..Removal::default()
            })
        }
        Mutation::CreateExam(e) => {
            store::exam_insert(conn, &e)?;
            Applied::Exam(reread(store::exam_get(conn, &e.key())?, format!("exam {}", e.key()))?)
        }
        Mutation::UpdateExam { old, exam } => {
            if old == exam.key() {
                store::exam_update(conn, &exam)?;
            } else {
                store::exam_delete(conn, &old)?;
                store::exam_insert(conn, &exam)?;
            }
            Applied::Exam(reread(
                store::exam_get(conn, &exam.key())?,
                format!("exam {}", exam.key()),
            )?)
        }
        Mutation::DeleteExam(key) => Applied::Removed(Removal {
            removed: store::exam_delete(conn, &key)?,
            ..Removal::default()
        }),
        Mutation::SetGrade { key, grade } => {
            store::exam_set_grade(conn, &key, grade)?;
            Applied::Exam(reread(store::exam_get(conn, &key)?, format!("exam {}", key))?)
        }
    };
    Ok(applied)
}

/// Runs `validate` and the resulting writes in one transaction. Nothing is
/// kept unless both succeed.
pub fn commit<F>(conn: &Connection, validate: F) -> RecordsResult<Applied>
where
    F: FnOnce(&Connection) -> RecordsResult<Validated>,
{
    let tx = conn.unchecked_transaction()?;
    let validated = match validate(&tx) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(code = e.code(), error = %e, "mutation refused");
            return Err(e);
        }
    };
    let action = validated.mutation().action();
    let key = validated.mutation().key();
    let applied = apply(&tx, validated)?;
    tx.commit()?;
    match &applied {
        Applied::Removed(r) => tracing::info!(
            action,
            key = %key,
            removed = r.removed,
            exams = r.exams,
            curriculum_links = r.curriculum_links,
            profiles = r.profiles,
            subordinates_released = r.subordinates_released,
            "committed"
        ),
        _ => tracing::info!(action, key = %key, "committed"),
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExamKey;
    use crate::scope::{resolve, ActingUser, Scope};
    use crate::store::fixtures::seeded;
    use crate::validate::Validator;
    use chrono::NaiveDate;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).expect("date")
    }

    fn engineer() -> Scope {
        resolve(Some(&ActingUser {
            staff_id: Some(3),
            position: Some("engineer".into()),
            department_code: Some("CS".into()),
        }))
    }

    fn exam_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM exams", [], |r| r.get(0))
            .expect("count exams")
    }

    #[test]
    fn deleting_a_course_takes_its_exams_and_links() {
        let conn = seeded();
        let scope = engineer();
        let applied = commit(&conn, |c| Validator::new(c, &scope, today()).delete_course(1))
            .expect("delete course");
        let Applied::Removed(r) = applied else {
            panic!("expected removal");
        };
        assert_eq!(r.removed, 1);
        assert_eq!(r.exams, 2);
        assert_eq!(r.curriculum_links, 1);
        assert_eq!(exam_count(&conn), 2);
        assert!(store::course_get(&conn, 1).expect("query").is_none());
    }

    #[test]
    fn deleting_staff_releases_subordinates() {
        let conn = seeded();
        let scope = engineer();
        let applied = commit(&conn, |c| Validator::new(c, &scope, today()).delete_staff(1))
            .expect("delete staff");
        let Applied::Removed(r) = applied else {
            panic!("expected removal");
        };
        assert_eq!(r.subordinates_released, 1);
        assert_eq!(r.profiles, 1);
        let lev = store::staff_get(&conn, 2).expect("query").expect("lev");
        assert_eq!(lev.supervisor_id, None);
    }

    #[test]
    fn refused_mutation_leaves_no_trace() {
        let conn = seeded();
        let scope = engineer();
        let err = commit(&conn, |c| {
            store::exams_delete_for_course(c, 1)?;
            Validator::new(c, &scope, today()).delete_course(999)
        })
        .expect_err("unknown course");
        assert_eq!(err.code(), "not_found");
        assert_eq!(exam_count(&conn), 4);
    }

    #[test]
    fn key_changing_edit_moves_the_row() {
        let conn = seeded();
        let scope = engineer();
        let from = ExamKey {
            date: NaiveDate::from_ymd_opt(2024, 5, 20).expect("date"),
            course_id: 1,
            reg_num: 1002,
        };
        let applied = commit(&conn, |c| {
            Validator::new(c, &scope, today()).update_exam(&from, &json!({"courseId": 2}))
        })
        .expect("move exam");
        let Applied::Exam(e) = applied else {
            panic!("expected exam");
        };
        assert_eq!(e.course_id, 2);
        assert!(store::exam_get(&conn, &from).expect("query").is_none());
        assert_eq!(exam_count(&conn), 4);
    }

    #[test]
    fn set_grade_round_trips_through_storage() {
        let conn = seeded();
        let lev = resolve(Some(&ActingUser {
            staff_id: Some(2),
            position: Some("lecturer".into()),
            department_code: None,
        }));
        let key = ExamKey {
            date: NaiveDate::from_ymd_opt(2024, 5, 20).expect("date"),
            course_id: 1,
            reg_num: 1001,
        };
        let applied = commit(&conn, |c| {
            Validator::new(c, &lev, today()).set_grade(&key, &json!(""))
        })
        .expect("clear grade");
        let Applied::Exam(e) = applied else {
            panic!("expected exam");
        };
        assert_eq!(e.grade, None);
        let applied = commit(&conn, |c| {
            Validator::new(c, &lev, today()).set_grade(&key, &json!("3"))
        })
        .expect("set grade");
        let Applied::Exam(e) = applied else {
            panic!("expected exam");
        };
        assert_eq!(e.grade, Some(3));
    }

    #[test]
    fn created_student_is_listed() {
        let conn = seeded();
        let head = resolve(Some(&ActingUser {
            staff_id: Some(1),
            position: Some("department-head".into()),
            department_code: Some("CS".into()),
        }));
        commit(&conn, |c| {
            Validator::new(c, &head, today()).create_student(&json!({
                "regNum": 1003, "fullName": "Mira Newcomer", "programCode": "CS-B"
            }))
        })
        .expect("create student");
        let rows = crate::query::list_students(&conn, &head, "newcomer").expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].student.reg_num, 1003);
        assert_eq!(rows[0].student.program_code, "CS-B");
    }
}
