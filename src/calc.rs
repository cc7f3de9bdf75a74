use crate::model::{AssessmentType, AssessmentTypeId, Period, ScoreRecord, Semester, SubjectId};
use crate::store::{GradeStore, StoreError};
use serde::Serialize;
use std::collections::HashMap;

/// One-decimal round-half-up: `floor(10*x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedScore {
    pub value: f64,
    pub weight: f64,
}

impl WeightedScore {
    pub fn new(value: f64, weight: f64) -> Self {
        Self { value, weight }
    }
}

/// `Σ(value·weight) / Σ(weight)`, or `None` for empty input or a zero total weight.
/// Scale-agnostic; callers pass values already in the active scale.
pub fn weighted_average<I>(scores: I) -> Option<f64>
where
    I: IntoIterator<Item = WeightedScore>,
{
    let mut weighted_sum = 0.0_f64;
    let mut weight_total = 0.0_f64;
    for s in scores {
        weighted_sum += s.value * s.weight;
        weight_total += s.weight;
    }
    if weight_total != 0.0 {
        Some(weighted_sum / weight_total)
    } else {
        None
    }
}

/// Plain mean of the present values.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0_f64, 0_usize), |(sum, n), v| (sum + v, n + 1));
    if count > 0 {
        Some(sum / count as f64)
    } else {
        None
    }
}

pub fn weight_index(types: &[AssessmentType]) -> HashMap<&AssessmentTypeId, i64> {
    types.iter().map(|t| (&t.id, t.weight)).collect()
}

/// Pairs scores with the current weight of their assessment type.
/// A score whose type is not in `weights` counts with weight 0.
pub fn weigh<'a, I>(
    scores: I,
    weights: &'a HashMap<&'a AssessmentTypeId, i64>,
) -> impl Iterator<Item = WeightedScore> + 'a
where
    I: IntoIterator<Item = &'a ScoreRecord>,
    I::IntoIter: 'a,
{
    scores.into_iter().map(move |s| {
        let weight = weights.get(&s.assessment_type_id).copied().unwrap_or(0);
        WeightedScore::new(s.value, weight as f64)
    })
}

/// The displayed average for one subject and period: the final override when
/// one exists, else the weighted mean of the period's scores.
pub fn period_average<S>(
    store: &S,
    subject_id: &SubjectId,
    period: Period,
) -> Result<Option<f64>, StoreError>
where
    S: GradeStore + ?Sized,
{
    if let Some(o) = store.fetch_override(subject_id, period)? {
        return Ok(Some(o.value));
    }

    let scores = store.fetch_scores(Some(subject_id), period.school_year, Some(period.semester))?;
    if scores.is_empty() {
        return Ok(None);
    }
    let types = store.fetch_assessment_types(Some(subject_id))?;
    let weights = weight_index(&types);
    Ok(weighted_average(weigh(&scores, &weights)))
}

/// School-year rollup: unweighted mean of the two semester averages that exist.
pub fn year_average<S>(
    store: &S,
    subject_id: &SubjectId,
    school_year: i32,
) -> Result<Option<f64>, StoreError>
where
    S: GradeStore + ?Sized,
{
    let mut semester_averages = Vec::with_capacity(Semester::BOTH.len());
    for semester in Semester::BOTH {
        semester_averages.push(period_average(
            store,
            subject_id,
            Period::new(school_year, semester),
        )?);
    }
    Ok(mean(semester_averages))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightSummary {
    pub total: i64,
    /// `total == 100`. Reported, never corrected.
    pub complete: bool,
}

pub fn weight_summary(types: &[AssessmentType]) -> WeightSummary {
    let total = types.iter().map(|t| t.weight).sum();
    WeightSummary {
        total,
        complete: total == 100,
    }
}
