use crate::ipc::helpers::{dispatch, Ctx, Handler, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::FinalOverride;
use crate::store::GradeStore;
use serde_json::json;

fn overrides_get(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = ctx.subject_id()?;
    let period = ctx.params.period()?;
    let store = ctx.store();
    let scale = store.active_scale(period.school_year)?;
    let found = store.fetch_override(&subject_id, period)?;
    Ok(json!({
        "override": found,
        "display": found.as_ref().map(|o| scale.format(o.value)),
    }))
}

fn overrides_set(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = ctx.subject_id()?;
    let period = ctx.params.period()?;
    let value = ctx.params.f64_param("value")?;
    ctx.validate_value(period.school_year, value)?;

    ctx.store().upsert_override(&FinalOverride {
        subject_id,
        period,
        value,
    })?;
    Ok(json!({ "ok": true }))
}

fn overrides_delete(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = ctx.subject_id()?;
    let period = ctx.params.period()?;
    let deleted = ctx.store().delete_override(&subject_id, period)?;
    Ok(json!({ "deleted": deleted }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: Handler = match req.method.as_str() {
        "overrides.get" => overrides_get,
        "overrides.set" => overrides_set,
        "overrides.delete" => overrides_delete,
        _ => return None,
    };
    Some(dispatch(state, req, handler))
}
