use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;

/// Longest code the directory tables accept (department, program, faculty keys).
pub const MAX_CODE_LEN: usize = 10;

pub const GRADE_MIN: i64 = 2;
pub const GRADE_MAX: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    pub abbr: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub code: String,
    pub name: String,
    pub faculty_abbr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub code: String,
    pub title: String,
    pub department_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub workload: i64,
    pub department_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    DepartmentHead,
    Lecturer,
    Engineer,
    Other(String),
}

impl Position {
    /// Recognizes the canonical labels and the legacy Russian ones.
    /// Anything else non-empty is kept verbatim as `Other`.
    pub fn parse(raw: &str) -> Option<Self> {
        let t = raw.trim();
        if t.is_empty() {
            return None;
        }
        let lower = t.to_lowercase();
        let p = match lower.as_str() {
            "department-head" | "head" | "зав. кафедрой" => Self::DepartmentHead,
            "lecturer" | "преподаватель" => Self::Lecturer,
            "engineer" | "инженер" => Self::Engineer,
            _ => Self::Other(t.to_string()),
        };
        Some(p)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::DepartmentHead => "department-head",
            Self::Lecturer => "lecturer",
            Self::Engineer => "engineer",
            Self::Other(s) => s,
        }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Non-negative money amount held as whole cents (numeric(10,2) in the old schema).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Salary(i64);

impl Salary {
    pub const MAX_CENTS: i64 = 9_999_999_999;

    pub fn from_cents(cents: i64) -> Option<Self> {
        if (0..=Self::MAX_CENTS).contains(&cents) {
            Some(Self(cents))
        } else {
            None
        }
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    /// Accepts `1500`, `1500.5`, `1500.50` and the comma form `1500,50`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let t = raw.trim();
        let bad = || format!("salary '{}' is not a non-negative amount", t);
        if t.is_empty() || t.starts_with('-') || t.starts_with('+') {
            return Err(bad());
        }
        let normalized = t.replace(',', ".");
        let (whole, frac) = match normalized.split_once('.') {
            Some((w, f)) => (w, f),
            None => (normalized.as_str(), ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        if frac.len() > 2 {
            return Err(format!("salary '{}' has more than two decimal places", t));
        }
        let whole: i64 = whole.parse().map_err(|_| bad())?;
        let mut frac_cents: i64 = if frac.is_empty() {
            0
        } else {
            frac.parse().map_err(|_| bad())?
        };
        if frac.len() == 1 {
            frac_cents *= 10;
        }
        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .and_then(Self::from_cents)
            .ok_or_else(|| format!("salary '{}' exceeds 99999999.99", t))
    }
}

impl fmt::Display for Salary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Salary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0 as f64 / 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineerProfile {
    pub specialty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LecturerProfile {
    pub title: Option<String>,
    pub degree: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadProfile {
    pub experience_years: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: i64,
    pub full_name: String,
    pub position: Position,
    pub salary: Option<Salary>,
    pub department_code: String,
    pub supervisor_id: Option<i64>,
    pub engineer: Option<EngineerProfile>,
    pub lecturer: Option<LecturerProfile>,
    pub head_of_department: Option<HeadProfile>,
}

impl Staff {
    /// Engineers are managed on their own screen and kept out of the staff list.
    pub fn is_engineer(&self) -> bool {
        self.position == Position::Engineer || self.engineer.is_some()
    }

    /// Only lecturers may be assigned as examiners.
    pub fn is_lecturer(&self) -> bool {
        self.position == Position::Lecturer || self.lecturer.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub reg_num: i64,
    pub full_name: String,
    pub program_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamKey {
    pub date: NaiveDate,
    pub course_id: i64,
    pub reg_num: i64,
}

impl fmt::Display for ExamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.date, self.course_id, self.reg_num)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub date: NaiveDate,
    pub course_id: i64,
    pub reg_num: i64,
    pub staff_id: i64,
    pub classroom: String,
    pub grade: Option<i64>,
}

impl Exam {
    pub fn key(&self) -> ExamKey {
        ExamKey {
            date: self.date,
            course_id: self.course_id,
            reg_num: self.reg_num,
        }
    }
}
