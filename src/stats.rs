use crate::calc::{mean, weigh, weight_index, weighted_average};
use crate::model::{AssessmentType, Period, ScoreRecord, Subject, SubjectId, SubjectStatistic};
use crate::scale::GradingScale;
use crate::store::{GradeStore, StoreError};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::warn;

/// A subject together with everything needed to compute its statistics
/// without going back to the store.
#[derive(Debug, Clone)]
pub struct LoadedSubject {
    pub subject: Subject,
    pub assessment_types: Vec<AssessmentType>,
    pub scores: Vec<ScoreRecord>,
}

pub type StatisticsMap = HashMap<SubjectId, SubjectStatistic>;

/// Loads every subject with its assessment types and the period's scores in
/// three reads.
pub fn load_subjects<S>(store: &S, period: Period) -> Result<Vec<LoadedSubject>, StoreError>
where
    S: GradeStore + ?Sized,
{
    let subjects = store.fetch_subjects()?;
    let mut types_by_subject: HashMap<SubjectId, Vec<AssessmentType>> = HashMap::new();
    for t in store.fetch_assessment_types(None)? {
        types_by_subject.entry(t.subject_id.clone()).or_default().push(t);
    }
    let mut scores_by_subject: HashMap<SubjectId, Vec<ScoreRecord>> = HashMap::new();
    for s in store.fetch_scores(None, period.school_year, Some(period.semester))? {
        scores_by_subject.entry(s.subject_id.clone()).or_default().push(s);
    }

    Ok(subjects
        .into_iter()
        .map(|subject| LoadedSubject {
            assessment_types: types_by_subject.remove(&subject.id).unwrap_or_default(),
            scores: scores_by_subject.remove(&subject.id).unwrap_or_default(),
            subject,
        })
        .collect())
}

/// Statistics for one subject given its override for the period, if any.
/// `score_count` counts the period's scores even when an override wins.
pub fn subject_statistic(
    loaded: &LoadedSubject,
    period: Period,
    override_value: Option<f64>,
) -> SubjectStatistic {
    let in_period: Vec<&ScoreRecord> = loaded
        .scores
        .iter()
        .filter(|s| s.period == period)
        .collect();

    let average = override_value.or_else(|| {
        let weights = weight_index(&loaded.assessment_types);
        weighted_average(weigh(in_period.iter().copied(), &weights))
    });

    SubjectStatistic {
        average,
        score_count: in_period.len(),
        has_override: override_value.is_some(),
    }
}

/// Computes statistics for all `subjects` in one pass.
///
/// Overrides are read once and indexed by subject, so every subject sees the
/// same snapshot. An unreadable override set is treated as empty.
pub fn batch_statistics<S>(store: &S, subjects: &[LoadedSubject], period: Period) -> StatisticsMap
where
    S: GradeStore + ?Sized,
{
    let overrides = match store.fetch_overrides(period.school_year, Some(period.semester)) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                school_year = period.school_year,
                semester = ?period.semester,
                error = %e,
                "override index unavailable; computing from scores only"
            );
            Vec::new()
        }
    };
    let override_index: HashMap<&SubjectId, f64> = overrides
        .iter()
        .filter(|o| o.period == period)
        .map(|o| (&o.subject_id, o.value))
        .collect();

    subjects
        .iter()
        .map(|loaded| {
            let id = &loaded.subject.id;
            let stat = subject_statistic(loaded, period, override_index.get(id).copied());
            (id.clone(), stat)
        })
        .collect()
}

/// Unweighted mean of the subjects' averages; subjects without one are skipped.
pub fn overall_average(statistics: &StatisticsMap) -> Option<f64> {
    mean(statistics.values().map(|s| s.average))
}

/// Best subjects first according to `scale`; subjects without an average go
/// last. Ties break on name.
pub fn sort_by_average(
    subjects: &[Subject],
    statistics: &StatisticsMap,
    scale: GradingScale,
) -> Vec<Subject> {
    let average_of = |s: &Subject| statistics.get(&s.id).and_then(|st| st.average);
    let by_name = |a: &Subject, b: &Subject| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    };

    let mut sorted = subjects.to_vec();
    sorted.sort_by(|a, b| match (average_of(a), average_of(b)) {
        (Some(x), Some(y)) => {
            let ord = if scale.is_lower_better() {
                x.partial_cmp(&y)
            } else {
                y.partial_cmp(&x)
            };
            ord.unwrap_or(Ordering::Equal).then_with(|| by_name(a, b))
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => by_name(a, b),
    });
    sorted
}
