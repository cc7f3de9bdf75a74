use crate::convert::convert;
use crate::ipc::helpers::{dispatch, dispatch_pure, Ctx, HandlerErr, Params};
use crate::ipc::types::{AppState, Request};
use crate::migrate::convert_school_year;
use crate::scale::GradingScale;
use crate::store::GradeStore;
use serde_json::json;
use tracing::info;

fn describe(scale: GradingScale) -> serde_json::Value {
    json!({
        "scale": scale,
        "min": scale.min(),
        "max": scale.max(),
        "isLowerBetter": scale.is_lower_better(),
    })
}

fn scale_get(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let school_year = ctx.params.school_year()?;
    let scale = ctx.store().active_scale(school_year)?;
    Ok(describe(scale))
}

fn scale_set(ctx: &Ctx<'_>) -> Result<serde_json::Value, HandlerErr> {
    let school_year = ctx.params.school_year()?;
    let target = ctx.params.scale_param("scale")?;
    let convert_existing = ctx.params.bool_param("convertExisting");

    let store = ctx.store();
    let current = store.active_scale(school_year)?;

    let mut conversion = None;
    if convert_existing && current != target {
        // A conversion that rewrites rows also commits the new setting.
        let outcome = convert_school_year(&store, school_year, current, target);
        if !outcome.success {
            // Stored values and the setting are unchanged.
            return Err(HandlerErr::new(
                "migration_failed",
                outcome
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "conversion failed".to_string()),
            )
            .with_details(json!(outcome)));
        }
        conversion = Some(outcome);
    }

    let committed = conversion.as_ref().is_some_and(|c| c.converted_count > 0);
    if !committed {
        store.set_active_scale(school_year, target)?;
    }
    info!(school_year, from = %current, to = %target, convert_existing, "grading scale changed");

    let mut result = describe(target);
    result["previousScale"] = json!(current);
    result["conversion"] = json!(conversion);
    Ok(result)
}

fn scale_convert(params: &Params<'_>) -> Result<serde_json::Value, HandlerErr> {
    let value = params.f64_param("value")?;
    let from = params.scale_param("from")?;
    let to = params.scale_param("to")?;
    let converted = convert(value, from, to);
    Ok(json!({
        "value": converted,
        "display": to.format(converted),
    }))
}

fn scale_canonical(params: &Params<'_>) -> Result<serde_json::Value, HandlerErr> {
    let scale = params.scale_param("scale")?;
    let mut result = describe(scale);
    result["values"] = json!(scale.canonical_values());
    Ok(result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "scale.get" => Some(dispatch(state, req, scale_get)),
        "scale.set" => Some(dispatch(state, req, scale_set)),
        "scale.convert" => Some(dispatch_pure(req, scale_convert)),
        "scale.canonical" => Some(dispatch_pure(req, scale_canonical)),
        _ => None,
    }
}
