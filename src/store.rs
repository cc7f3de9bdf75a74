//! Persistence boundary for the engine.
//!
//! The engine only talks to [`GradeStore`]; [`SqliteStore`] is the adapter the
//! sidecar uses over the workspace database.

use crate::model::{
    AssessmentType, AssessmentTypeId, FinalOverride, Period, ScoreId, ScoreRecord, Semester,
    Subject, SubjectId,
};
use crate::scale::GradingScale;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

pub trait GradeStore {
    fn fetch_subjects(&self) -> Result<Vec<Subject>, StoreError>;

    fn fetch_scores(
        &self,
        subject_id: Option<&SubjectId>,
        school_year: i32,
        semester: Option<Semester>,
    ) -> Result<Vec<ScoreRecord>, StoreError>;

    fn fetch_override(
        &self,
        subject_id: &SubjectId,
        period: Period,
    ) -> Result<Option<FinalOverride>, StoreError>;

    /// All overrides of a school year, optionally narrowed to one semester.
    fn fetch_overrides(
        &self,
        school_year: i32,
        semester: Option<Semester>,
    ) -> Result<Vec<FinalOverride>, StoreError>;

    /// `None` returns every subject's types in one read.
    fn fetch_assessment_types(
        &self,
        subject_id: Option<&SubjectId>,
    ) -> Result<Vec<AssessmentType>, StoreError>;

    /// Standalone batch update of score rows, in one transaction. A scale
    /// conversion goes through [`GradeStore::commit_conversion`] instead,
    /// which shares the same row writer.
    fn save_scores(&self, records: &[ScoreRecord]) -> Result<(), StoreError>;

    fn upsert_override(&self, value: &FinalOverride) -> Result<(), StoreError>;

    /// Returns whether an override existed.
    fn delete_override(&self, subject_id: &SubjectId, period: Period) -> Result<bool, StoreError>;

    /// Writes converted score and override values together with the school
    /// year's new active scale in a single commit. Either all of it lands or
    /// none of it does.
    fn commit_conversion(
        &self,
        school_year: i32,
        scale: GradingScale,
        scores: &[ScoreRecord],
        overrides: &[FinalOverride],
    ) -> Result<(), StoreError>;

    fn active_scale(&self, school_year: i32) -> Result<GradingScale, StoreError>;

    fn set_active_scale(&self, school_year: i32, scale: GradingScale) -> Result<(), StoreError>;
}

pub struct SqliteStore<'a> {
    conn: &'a Connection,
    default_scale: GradingScale,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            default_scale: GradingScale::default(),
        }
    }

    pub fn with_default_scale(mut self, scale: GradingScale) -> Self {
        self.default_scale = scale;
        self
    }
}

type RawScore = (
    String,
    String,
    String,
    f64,
    i32,
    i64,
    Option<String>,
    Option<String>,
);

fn decode_semester(code: i64) -> Result<Semester, StoreError> {
    Semester::from_code(code).ok_or_else(|| StoreError::CorruptRow(format!("semester code {code}")))
}

fn decode_score(raw: RawScore) -> Result<ScoreRecord, StoreError> {
    let (id, subject_id, assessment_type_id, value, school_year, semester, recorded_on, note) = raw;
    let recorded_on = match recorded_on.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| StoreError::CorruptRow(format!("recorded_on {s:?} on score {id}")))?,
        ),
    };
    Ok(ScoreRecord {
        id: ScoreId(id),
        subject_id: SubjectId(subject_id),
        assessment_type_id: AssessmentTypeId(assessment_type_id),
        value,
        period: Period::new(school_year, decode_semester(semester)?),
        recorded_on,
        note,
    })
}

fn write_scores(conn: &Connection, records: &[ScoreRecord]) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "UPDATE scores
         SET value = ?, school_year = ?, semester = ?, recorded_on = ?, note = ?
         WHERE id = ?",
    )?;
    for r in records {
        stmt.execute((
            r.value,
            r.period.school_year,
            r.period.semester.code(),
            r.recorded_on.map(|d| d.format("%Y-%m-%d").to_string()),
            r.note.as_deref(),
            r.id.as_str(),
        ))?;
    }
    Ok(())
}

fn write_override(conn: &Connection, o: &FinalOverride) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO final_overrides(subject_id, school_year, semester, value)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(subject_id, school_year, semester) DO UPDATE SET
           value = excluded.value",
        (
            o.subject_id.as_str(),
            o.period.school_year,
            o.period.semester.code(),
            o.value,
        ),
    )?;
    Ok(())
}

fn write_scale(conn: &Connection, school_year: i32, scale: GradingScale) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO school_year_settings(school_year, grading_scale)
         VALUES(?, ?)
         ON CONFLICT(school_year) DO UPDATE SET grading_scale = excluded.grading_scale",
        (school_year, scale.as_str()),
    )?;
    Ok(())
}

impl GradeStore for SqliteStore<'_> {
    fn fetch_subjects(&self) -> Result<Vec<Subject>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, sort_order FROM subjects ORDER BY sort_order, name")?;
        let subjects = stmt
            .query_map([], |r| {
                Ok(Subject {
                    id: SubjectId(r.get(0)?),
                    name: r.get(1)?,
                    sort_order: r.get(2)?,
                })
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
        Ok(subjects)
    }

    fn fetch_scores(
        &self,
        subject_id: Option<&SubjectId>,
        school_year: i32,
        semester: Option<Semester>,
    ) -> Result<Vec<ScoreRecord>, StoreError> {
        let mut sql = String::from(
            "SELECT id, subject_id, assessment_type_id, value, school_year, semester, recorded_on, note
             FROM scores
             WHERE school_year = ?",
        );
        let mut bind_values: Vec<Value> = vec![Value::Integer(school_year as i64)];
        if let Some(s) = semester {
            sql.push_str(" AND semester = ?");
            bind_values.push(Value::Integer(s.code()));
        }
        if let Some(id) = subject_id {
            sql.push_str(" AND subject_id = ?");
            bind_values.push(Value::Text(id.0.clone()));
        }
        sql.push_str(" ORDER BY subject_id, semester, recorded_on, rowid");

        let mut stmt = self.conn.prepare(&sql)?;
        let raw: Vec<RawScore> = stmt
            .query_map(params_from_iter(bind_values), |r| {
                Ok((
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    r.get(3)?,
                    r.get(4)?,
                    r.get(5)?,
                    r.get(6)?,
                    r.get(7)?,
                ))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
        raw.into_iter().map(decode_score).collect()
    }

    fn fetch_override(
        &self,
        subject_id: &SubjectId,
        period: Period,
    ) -> Result<Option<FinalOverride>, StoreError> {
        let value: Option<f64> = self
            .conn
            .query_row(
                "SELECT value FROM final_overrides
                 WHERE subject_id = ? AND school_year = ? AND semester = ?",
                (subject_id.as_str(), period.school_year, period.semester.code()),
                |r| r.get(0),
            )
            .optional()?;
        Ok(value.map(|value| FinalOverride {
            subject_id: subject_id.clone(),
            period,
            value,
        }))
    }

    fn fetch_overrides(
        &self,
        school_year: i32,
        semester: Option<Semester>,
    ) -> Result<Vec<FinalOverride>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT subject_id, semester, value FROM final_overrides
             WHERE school_year = ?1 AND (?2 IS NULL OR semester = ?2)
             ORDER BY subject_id, semester",
        )?;
        let raw: Vec<(String, i64, f64)> = stmt
            .query_map((school_year, semester.map(Semester::code)), |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
        raw.into_iter()
            .map(|(subject_id, sem, value)| {
                Ok(FinalOverride {
                    subject_id: SubjectId(subject_id),
                    period: Period::new(school_year, decode_semester(sem)?),
                    value,
                })
            })
            .collect()
    }

    fn fetch_assessment_types(
        &self,
        subject_id: Option<&SubjectId>,
    ) -> Result<Vec<AssessmentType>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, subject_id, name, weight FROM assessment_types
             WHERE ?1 IS NULL OR subject_id = ?1
             ORDER BY subject_id, sort_order",
        )?;
        let types = stmt
            .query_map([subject_id.map(|s| s.as_str())], |r| {
                Ok(AssessmentType {
                    id: AssessmentTypeId(r.get(0)?),
                    subject_id: SubjectId(r.get(1)?),
                    name: r.get(2)?,
                    weight: r.get(3)?,
                })
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
        Ok(types)
    }

    fn save_scores(&self, records: &[ScoreRecord]) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        write_scores(&tx, records)?;
        tx.commit()?;
        Ok(())
    }

    fn upsert_override(&self, value: &FinalOverride) -> Result<(), StoreError> {
        write_override(self.conn, value)
    }

    fn delete_override(&self, subject_id: &SubjectId, period: Period) -> Result<bool, StoreError> {
        let n = self.conn.execute(
            "DELETE FROM final_overrides WHERE subject_id = ? AND school_year = ? AND semester = ?",
            (subject_id.as_str(), period.school_year, period.semester.code()),
        )?;
        Ok(n > 0)
    }

    fn commit_conversion(
        &self,
        school_year: i32,
        scale: GradingScale,
        scores: &[ScoreRecord],
        overrides: &[FinalOverride],
    ) -> Result<(), StoreError> {
        // Dropping `tx` without commit rolls back everything written so far.
        let tx = self.conn.unchecked_transaction()?;
        write_scores(&tx, scores)?;
        for o in overrides {
            write_override(&tx, o)?;
        }
        write_scale(&tx, school_year, scale)?;
        tx.commit()?;
        Ok(())
    }

    fn active_scale(&self, school_year: i32) -> Result<GradingScale, StoreError> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT grading_scale FROM school_year_settings WHERE school_year = ?",
                [school_year],
                |r| r.get(0),
            )
            .optional()?;
        match stored {
            None => Ok(self.default_scale),
            Some(s) => s
                .parse()
                .map_err(|e| StoreError::CorruptRow(format!("school year {school_year}: {e}"))),
        }
    }

    fn set_active_scale(&self, school_year: i32, scale: GradingScale) -> Result<(), StoreError> {
        write_scale(self.conn, school_year, scale)
    }
}
