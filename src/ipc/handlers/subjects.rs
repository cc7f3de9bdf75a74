use crate::ipc::helpers::{db_err, dispatch, Ctx, Handler, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::SubjectId;
use crate::store::GradeStore;
use serde_json::json;

fn subjects_list(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let subjects = ctx.store().fetch_subjects()?;
    Ok(json!({ "subjects": subjects }))
}

fn subjects_create(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let name = ctx.params.name_param("name")?;
    let id = SubjectId::new_v4();
    ctx.conn
        .execute(
            "INSERT INTO subjects(id, name, sort_order)
             VALUES(?, ?, (SELECT COALESCE(MAX(sort_order), -1) + 1 FROM subjects))",
            (id.as_str(), &name),
        )
        .map_err(db_err("db_insert_failed", "subjects"))?;
    Ok(json!({ "subjectId": id }))
}

fn subjects_rename(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let id = ctx.subject_id()?;
    let name = ctx.params.name_param("name")?;
    ctx.conn
        .execute(
            "UPDATE subjects SET name = ? WHERE id = ?",
            (&name, id.as_str()),
        )
        .map_err(db_err("db_update_failed", "subjects"))?;
    Ok(json!({ "ok": true }))
}

fn subjects_delete(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let id = ctx.subject_id()?;
    // Assessment types, scores and overrides go with it (ON DELETE CASCADE).
    ctx.conn
        .execute("DELETE FROM subjects WHERE id = ?", [id.as_str()])
        .map_err(db_err("db_delete_failed", "subjects"))?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: Handler = match req.method.as_str() {
        "subjects.list" => subjects_list,
        "subjects.create" => subjects_create,
        "subjects.rename" => subjects_rename,
        "subjects.delete" => subjects_delete,
        _ => return None,
    };
    Some(dispatch(state, req, handler))
}
