use crate::ipc::helpers::{db_err, dispatch, Ctx, Handler, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{ScoreId, SubjectId};
use crate::store::GradeStore;
use chrono::NaiveDate;
use rusqlite::OptionalExtension;
use serde_json::json;

fn recorded_on_param(ctx: &Ctx<'_>) -> Result<Option<String>, HandlerErr> {
    let Some(raw) = ctx.params.opt_str_param("recordedOn") else {
        return Ok(None);
    };
    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Ok(d) => Ok(Some(d.format("%Y-%m-%d").to_string())),
        Err(_) => Err(HandlerErr::bad_params("recordedOn must be YYYY-MM-DD")
            .with_details(json!({ "recordedOn": raw }))),
    }
}

fn scores_list(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let school_year = ctx.params.school_year()?;
    let semester = ctx.params.opt_semester()?;
    let subject_id = match ctx.params.opt_str_param("subjectId") {
        Some(id) => {
            let id = SubjectId(id);
            ctx.require_subject(&id)?;
            Some(id)
        }
        None => None,
    };

    let store = ctx.store();
    let scale = store.active_scale(school_year)?;
    let scores = store.fetch_scores(subject_id.as_ref(), school_year, semester)?;
    let rows: Vec<serde_json::Value> = scores
        .iter()
        .map(|s| {
            let mut row = json!(s);
            row["display"] = json!(scale.format(s.value));
            row
        })
        .collect();
    Ok(json!({ "scale": scale, "scores": rows }))
}

fn scores_create(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = ctx.subject_id()?;
    let assessment_type_id = ctx.params.str_param("assessmentTypeId")?;
    let period = ctx.params.period()?;
    let value = ctx.params.f64_param("value")?;
    let recorded_on = recorded_on_param(ctx)?;
    let note = ctx.params.opt_str_param("note");

    let owned_by_subject = ctx
        .conn
        .query_row(
            "SELECT 1 FROM assessment_types WHERE id = ? AND subject_id = ?",
            (&assessment_type_id, subject_id.as_str()),
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?
        .is_some();
    if !owned_by_subject {
        return Err(
            HandlerErr::new("not_found", "assessment type not found for subject").with_details(
                json!({ "subjectId": subject_id, "assessmentTypeId": assessment_type_id }),
            ),
        );
    }

    ctx.validate_value(period.school_year, value)?;

    let id = ScoreId::new_v4();
    ctx.conn
        .execute(
            "INSERT INTO scores(id, subject_id, assessment_type_id, value, school_year, semester, recorded_on, note)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.as_str(),
                subject_id.as_str(),
                &assessment_type_id,
                value,
                period.school_year,
                period.semester.code(),
                recorded_on,
                note,
            ),
        )
        .map_err(db_err("db_insert_failed", "scores"))?;
    Ok(json!({ "scoreId": id }))
}

fn lookup_school_year(ctx: &Ctx<'_>, score_id: &ScoreId) -> Result<i32, HandlerErr> {
    ctx.conn
        .query_row(
            "SELECT school_year FROM scores WHERE id = ?",
            [score_id.as_str()],
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?
        .ok_or_else(|| {
            HandlerErr::new("not_found", "score not found").with_details(json!({ "scoreId": score_id }))
        })
}

fn scores_update(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let score_id = ScoreId(ctx.params.str_param("scoreId")?);
    let value = ctx.params.f64_param("value")?;
    let school_year = lookup_school_year(ctx, &score_id)?;
    ctx.validate_value(school_year, value)?;

    ctx.conn
        .execute(
            "UPDATE scores SET value = ? WHERE id = ?",
            (value, score_id.as_str()),
        )
        .map_err(db_err("db_update_failed", "scores"))?;
    Ok(json!({ "ok": true }))
}

fn scores_delete(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let score_id = ScoreId(ctx.params.str_param("scoreId")?);
    let deleted = ctx
        .conn
        .execute("DELETE FROM scores WHERE id = ?", [score_id.as_str()])
        .map_err(db_err("db_delete_failed", "scores"))?;
    if deleted == 0 {
        return Err(HandlerErr::new("not_found", "score not found")
            .with_details(json!({ "scoreId": score_id })));
    }
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: Handler = match req.method.as_str() {
        "scores.list" => scores_list,
        "scores.create" => scores_create,
        "scores.update" => scores_update,
        "scores.delete" => scores_delete,
        _ => return None,
    };
    Some(dispatch(state, req, handler))
}
