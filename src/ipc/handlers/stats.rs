use crate::calc::{period_average, year_average};
use crate::ipc::helpers::{dispatch, Ctx, Handler, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::Subject;
use crate::stats::{batch_statistics, load_subjects, overall_average, sort_by_average};
use crate::store::GradeStore;
use serde_json::json;

fn stats_period_average(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = ctx.subject_id()?;
    let period = ctx.params.period()?;
    let store = ctx.store();
    let scale = store.active_scale(period.school_year)?;
    let average = period_average(&store, &subject_id, period)?;
    Ok(json!({
        "average": average,
        "display": average.map(|v| scale.format(v)),
    }))
}

fn stats_year_average(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = ctx.subject_id()?;
    let school_year = ctx.params.school_year()?;
    let store = ctx.store();
    let scale = store.active_scale(school_year)?;
    let average = year_average(&store, &subject_id, school_year)?;
    Ok(json!({
        "average": average,
        "display": average.map(|v| scale.format(v)),
    }))
}

fn stats_batch(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let period = ctx.params.period()?;
    let store = ctx.store();
    let scale = store.active_scale(period.school_year)?;
    let loaded = load_subjects(&store, period)?;
    let statistics = batch_statistics(&store, &loaded, period);

    let subjects: Vec<Subject> = loaded.into_iter().map(|l| l.subject).collect();
    let ordered = sort_by_average(&subjects, &statistics, scale);
    let per_subject: Vec<serde_json::Value> = ordered
        .iter()
        .filter_map(|s| {
            let stat = statistics.get(&s.id)?;
            Some(json!({
                "subjectId": s.id,
                "name": s.name,
                "average": stat.average,
                "display": stat.average.map(|v| scale.format(v)),
                "scoreCount": stat.score_count,
                "hasOverride": stat.has_override,
            }))
        })
        .collect();
    let overall = overall_average(&statistics);

    Ok(json!({
        "scale": scale,
        "perSubject": per_subject,
        "overallAverage": overall,
        "overallDisplay": overall.map(|v| scale.format(v)),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: Handler = match req.method.as_str() {
        "stats.periodAverage" => stats_period_average,
        "stats.yearAverage" => stats_year_average,
        "stats.batch" => stats_batch,
        _ => return None,
    };
    Some(dispatch(state, req, handler))
}
