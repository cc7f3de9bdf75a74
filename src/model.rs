use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new_v4() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(SubjectId);
string_id!(AssessmentTypeId);
string_id!(ScoreId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Semester {
    First,
    Second,
}

impl Semester {
    pub const BOTH: [Semester; 2] = [Semester::First, Semester::Second];

    /// Storage code: 1 or 2.
    pub fn code(self) -> i64 {
        match self {
            Semester::First => 1,
            Semester::Second => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Semester::First),
            2 => Some(Semester::Second),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "1" => Some(Semester::First),
            "second" | "2" => Some(Semester::Second),
            _ => None,
        }
    }
}

/// A grading period: school year (by its starting calendar year) and semester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub school_year: i32,
    pub semester: Semester,
}

impl Period {
    pub fn new(school_year: i32, semester: Semester) -> Self {
        Self {
            school_year,
            semester,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentType {
    pub id: AssessmentTypeId,
    pub subject_id: SubjectId,
    pub name: String,
    /// Integer percentage. Totals per subject are not forced to 100.
    pub weight: i64,
}

/// One recorded assessment result. `value` is in whatever scale the owning
/// school year uses; the record itself carries no scale tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub id: ScoreId,
    pub subject_id: SubjectId,
    pub assessment_type_id: AssessmentTypeId,
    pub value: f64,
    pub period: Period,
    pub recorded_on: Option<NaiveDate>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalOverride {
    pub subject_id: SubjectId,
    pub period: Period,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStatistic {
    pub average: Option<f64>,
    pub score_count: usize,
    pub has_override: bool,
}
