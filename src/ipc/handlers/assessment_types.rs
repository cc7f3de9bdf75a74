use crate::calc::weight_summary;
use crate::ipc::helpers::{db_err, dispatch, Ctx, Handler, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::AssessmentTypeId;
use crate::store::GradeStore;
use rusqlite::OptionalExtension;
use serde_json::json;

fn weight_param(ctx: &Ctx<'_>) -> Result<Option<i64>, HandlerErr> {
    let Some(raw) = ctx.params.get("weight") else {
        return Ok(None);
    };
    match raw.as_i64() {
        Some(w) if (0..=100).contains(&w) => Ok(Some(w)),
        _ => Err(HandlerErr::bad_params("weight must be an integer percentage 0..=100")
            .with_details(json!({ "weight": raw }))),
    }
}

fn require_assessment_type(ctx: &Ctx<'_>) -> Result<AssessmentTypeId, HandlerErr> {
    let id = AssessmentTypeId(ctx.params.str_param("assessmentTypeId")?);
    let found = ctx
        .conn
        .query_row(
            "SELECT 1 FROM assessment_types WHERE id = ?",
            [id.as_str()],
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    if found.is_none() {
        return Err(HandlerErr::new("not_found", "assessment type not found")
            .with_details(json!({ "assessmentTypeId": id })));
    }
    Ok(id)
}

fn assessment_types_list(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = ctx.subject_id()?;
    let types = ctx.store().fetch_assessment_types(Some(&subject_id))?;
    let summary = weight_summary(&types);
    Ok(json!({
        "assessmentTypes": types,
        "weightTotal": summary.total,
        "weightsComplete": summary.complete,
    }))
}

fn assessment_types_create(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = ctx.subject_id()?;
    let name = ctx.params.name_param("name")?;
    let weight = weight_param(ctx)?.unwrap_or(0);

    let id = AssessmentTypeId::new_v4();
    ctx.conn
        .execute(
            "INSERT INTO assessment_types(id, subject_id, name, weight, sort_order)
             VALUES(?, ?, ?, ?,
               (SELECT COALESCE(MAX(sort_order), -1) + 1 FROM assessment_types WHERE subject_id = ?))",
            (id.as_str(), subject_id.as_str(), &name, weight, subject_id.as_str()),
        )
        .map_err(db_err("db_insert_failed", "assessment_types"))?;
    Ok(json!({ "assessmentTypeId": id }))
}

fn assessment_types_update(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let id = require_assessment_type(ctx)?;
    let name = match ctx.params.get("name") {
        None => None,
        Some(_) => Some(ctx.params.name_param("name")?),
    };
    let weight = weight_param(ctx)?;
    if name.is_none() && weight.is_none() {
        return Err(HandlerErr::bad_params("nothing to update: pass name and/or weight"));
    }

    ctx.conn
        .execute(
            "UPDATE assessment_types
             SET name = COALESCE(?, name), weight = COALESCE(?, weight)
             WHERE id = ?",
            (name.as_deref(), weight, id.as_str()),
        )
        .map_err(db_err("db_update_failed", "assessment_types"))?;
    Ok(json!({ "ok": true }))
}

fn assessment_types_delete(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let id = require_assessment_type(ctx)?;
    // Scores of this type are removed with it.
    ctx.conn
        .execute("DELETE FROM assessment_types WHERE id = ?", [id.as_str()])
        .map_err(db_err("db_delete_failed", "assessment_types"))?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: Handler = match req.method.as_str() {
        "assessmentTypes.list" => assessment_types_list,
        "assessmentTypes.create" => assessment_types_create,
        "assessmentTypes.update" => assessment_types_update,
        "assessmentTypes.delete" => assessment_types_delete,
        _ => return None,
    };
    Some(dispatch(state, req, handler))
}
