use crate::error::RecordsError;
use crate::model::Position;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;

/// Who is calling. Supplied by the UI on every request; absent means guest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActingUser {
    #[serde(default)]
    pub staff_id: Option<i64>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub department_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capability {
    CourseAdd,
    CourseEdit,
    CourseDelete,
    StaffAdd,
    StaffEdit,
    StaffDelete,
    StudentAdd,
    StudentEdit,
    StudentDelete,
    ExamAdd,
    ExamEdit,
    ExamDelete,
    ExamGradeOwn,
    DirectoryManage,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CourseAdd => "courses:add",
            Self::CourseEdit => "courses:edit",
            Self::CourseDelete => "courses:delete",
            Self::StaffAdd => "staff:add",
            Self::StaffEdit => "staff:edit",
            Self::StaffDelete => "staff:delete",
            Self::StudentAdd => "students:add",
            Self::StudentEdit => "students:edit",
            Self::StudentDelete => "students:delete",
            Self::ExamAdd => "exams:add",
            Self::ExamEdit => "exams:edit",
            Self::ExamDelete => "exams:delete",
            Self::ExamGradeOwn => "exams:grade-own",
            Self::DirectoryManage => "directory:manage",
        }
    }
}

impl Serialize for Capability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

const HEAD_CAPABILITIES: &[Capability] = &[
    Capability::CourseEdit,
    Capability::StaffAdd,
    Capability::StudentAdd,
    Capability::StudentDelete,
    Capability::ExamAdd,
    Capability::ExamEdit,
    Capability::ExamDelete,
];

const ENGINEER_CAPABILITIES: &[Capability] = &[
    Capability::CourseAdd,
    Capability::CourseEdit,
    Capability::CourseDelete,
    Capability::StaffAdd,
    Capability::StaffEdit,
    Capability::StaffDelete,
    Capability::StudentEdit,
    Capability::ExamAdd,
    Capability::ExamEdit,
    Capability::ExamDelete,
    Capability::DirectoryManage,
];

const LECTURER_CAPABILITIES: &[Capability] = &[Capability::ExamGradeOwn];

/// Visibility and write rights of one caller for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub department_filter: Option<String>,
    pub own_exams_only: bool,
    pub examiner_id: Option<i64>,
    pub capabilities: BTreeSet<Capability>,
}

impl Scope {
    pub fn guest() -> Self {
        Self {
            department_filter: None,
            own_exams_only: false,
            examiner_id: None,
            capabilities: BTreeSet::new(),
        }
    }

    pub fn can(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }

    pub fn require(&self, cap: Capability) -> Result<(), RecordsError> {
        if self.can(cap) {
            Ok(())
        } else {
            Err(RecordsError::Unauthorized(format!(
                "missing capability {}",
                cap.as_str()
            )))
        }
    }

    /// True when a row owned by `dept_code` is inside this scope.
    pub fn covers_department(&self, dept_code: &str) -> bool {
        match self.department_filter.as_deref() {
            Some(own) => own == dept_code,
            None => true,
        }
    }

    pub fn require_department(&self, dept_code: &str, what: &str) -> Result<(), RecordsError> {
        if self.covers_department(dept_code) {
            Ok(())
        } else {
            Err(RecordsError::forbidden(format!(
                "{} belongs to department {} outside your scope",
                what, dept_code
            )))
        }
    }
}

pub fn resolve(user: Option<&ActingUser>) -> Scope {
    let Some(user) = user else {
        return Scope::guest();
    };
    let position = user.position.as_deref().and_then(Position::parse);
    let department = user
        .department_code
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    match position {
        Some(Position::DepartmentHead) => {
            let Some(dept) = department else {
                tracing::warn!(staff_id = ?user.staff_id, "department head without department; read-only");
                return Scope::guest();
            };
            Scope {
                department_filter: Some(dept),
                own_exams_only: false,
                examiner_id: None,
                capabilities: HEAD_CAPABILITIES.iter().copied().collect(),
            }
        }
        Some(Position::Engineer) => Scope {
            department_filter: None,
            own_exams_only: false,
            examiner_id: None,
            capabilities: ENGINEER_CAPABILITIES.iter().copied().collect(),
        },
        Some(Position::Lecturer) => {
            let Some(staff_id) = user.staff_id else {
                tracing::warn!("lecturer without staff id; read-only");
                return Scope::guest();
            };
            Scope {
                department_filter: None,
                own_exams_only: true,
                examiner_id: Some(staff_id),
                capabilities: LECTURER_CAPABILITIES.iter().copied().collect(),
            }
        }
        Some(Position::Other(_)) | None => Scope::guest(),
    }
}
