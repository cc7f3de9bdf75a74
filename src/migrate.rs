use crate::convert::convert;
use crate::model::{FinalOverride, ScoreRecord};
use crate::scale::GradingScale;
use crate::store::{GradeStore, StoreError};
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutcome {
    pub success: bool,
    pub converted_count: usize,
    pub error_message: Option<String>,
}

impl ConversionOutcome {
    fn succeeded(converted_count: usize) -> Self {
        Self {
            success: true,
            converted_count,
            error_message: None,
        }
    }

    fn failed(e: &StoreError) -> Self {
        Self {
            success: false,
            converted_count: 0,
            error_message: Some(e.to_string()),
        }
    }
}

/// Rewrites every score and final override of `school_year` (both semesters)
/// from `from` to `to` and makes `to` the year's active scale, all in one
/// commit. A year with nothing to convert is left untouched.
///
/// On failure nothing is written and the outcome carries the reason. Callers
/// must not run two conversions of the same school year concurrently.
pub fn convert_school_year<S>(
    store: &S,
    school_year: i32,
    from: GradingScale,
    to: GradingScale,
) -> ConversionOutcome
where
    S: GradeStore + ?Sized,
{
    let loaded = store
        .fetch_scores(None, school_year, None)
        .and_then(|scores| Ok((scores, store.fetch_overrides(school_year, None)?)));
    let (scores, overrides) = match loaded {
        Ok(v) => v,
        Err(e) => {
            error!(school_year, error = %e, "grading scale conversion could not read records");
            return ConversionOutcome::failed(&e);
        }
    };

    if scores.is_empty() && overrides.is_empty() {
        return ConversionOutcome::succeeded(0);
    }

    let scores: Vec<ScoreRecord> = scores
        .into_iter()
        .map(|mut s| {
            s.value = convert(s.value, from, to);
            s
        })
        .collect();
    let overrides: Vec<FinalOverride> = overrides
        .into_iter()
        .map(|mut o| {
            o.value = convert(o.value, from, to);
            o
        })
        .collect();
    let converted_count = scores.len() + overrides.len();

    info!(
        school_year,
        %from,
        %to,
        scores = scores.len(),
        overrides = overrides.len(),
        "converting school year"
    );
    match store.commit_conversion(school_year, to, &scores, &overrides) {
        Ok(()) => {
            info!(school_year, converted_count, "school year converted");
            ConversionOutcome::succeeded(converted_count)
        }
        Err(e) => {
            error!(school_year, error = %e, "grading scale conversion rolled back");
            ConversionOutcome::failed(&e)
        }
    }
}
