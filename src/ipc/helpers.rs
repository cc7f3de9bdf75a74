use crate::config::WorkspaceConfig;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{Period, Semester, SubjectId};
use crate::scale::GradingScale;
use crate::store::{GradeStore, SqliteStore, StoreError};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        HandlerErr::new("db_query_failed", e.to_string())
    }
}

pub fn db_err<'a>(
    code: &'static str,
    table: &'a str,
) -> impl FnOnce(rusqlite::Error) -> HandlerErr + 'a {
    move |e| HandlerErr::new(code, e.to_string()).with_details(json!({ "table": table }))
}

/// Typed access to a request's `params` object.
#[derive(Clone, Copy)]
pub struct Params<'a>(pub &'a serde_json::Value);

impl<'a> Params<'a> {
    pub fn get(&self, key: &str) -> Option<&'a serde_json::Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn str_param(&self, key: &str) -> Result<String, HandlerErr> {
        match self.get(key).and_then(|v| v.as_str()) {
            Some(v) => Ok(v.to_string()),
            None => Err(HandlerErr::bad_params(format!("missing {key}"))),
        }
    }

    pub fn opt_str_param(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn name_param(&self, key: &str) -> Result<String, HandlerErr> {
        let name = self.str_param(key)?.trim().to_string();
        if name.is_empty() {
            return Err(HandlerErr::bad_params(format!("{key} must not be empty")));
        }
        Ok(name)
    }

    pub fn f64_param(&self, key: &str) -> Result<f64, HandlerErr> {
        self.get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| HandlerErr::bad_params(format!("missing/invalid {key}")))
    }

    pub fn bool_param(&self, key: &str) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    pub fn school_year(&self) -> Result<i32, HandlerErr> {
        self.get("schoolYear")
            .and_then(|v| v.as_i64())
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| HandlerErr::bad_params("missing/invalid schoolYear"))
    }

    pub fn opt_semester(&self) -> Result<Option<Semester>, HandlerErr> {
        let Some(raw) = self.get("semester") else {
            return Ok(None);
        };
        let parsed = match raw {
            serde_json::Value::String(s) => Semester::parse(s),
            other => other.as_i64().and_then(Semester::from_code),
        };
        parsed
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params("semester must be 'first', 'second', 1 or 2"))
    }

    /// Semester is mandatory wherever a period is scoped; there is no default.
    pub fn semester(&self) -> Result<Semester, HandlerErr> {
        self.opt_semester()?
            .ok_or_else(|| HandlerErr::bad_params("missing semester"))
    }

    pub fn period(&self) -> Result<Period, HandlerErr> {
        Ok(Period::new(self.school_year()?, self.semester()?))
    }

    pub fn scale_param(&self, key: &str) -> Result<GradingScale, HandlerErr> {
        let raw = self.str_param(key)?;
        raw.parse::<GradingScale>()
            .map_err(|e| HandlerErr::bad_params(e.to_string()))
    }
}

/// Everything a handler may touch once a workspace is open.
pub struct Ctx<'a> {
    pub conn: &'a Connection,
    pub config: &'a WorkspaceConfig,
    pub params: Params<'a>,
}

impl<'a> Ctx<'a> {
    pub fn store(&self) -> SqliteStore<'a> {
        SqliteStore::new(self.conn).with_default_scale(self.config.grades.default_scale)
    }

    pub fn subject_id(&self) -> Result<SubjectId, HandlerErr> {
        let id = SubjectId(self.params.str_param("subjectId")?);
        self.require_subject(&id)?;
        Ok(id)
    }

    pub fn require_subject(&self, id: &SubjectId) -> Result<(), HandlerErr> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM subjects WHERE id = ?", [id.as_str()], |r| {
                r.get::<_, i64>(0)
            })
            .optional()
            .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
        match found {
            Some(_) => Ok(()),
            None => Err(HandlerErr::new("not_found", "subject not found")
                .with_details(json!({ "subjectId": id }))),
        }
    }

    /// Rejects values outside the school year's active scale.
    pub fn validate_value(&self, school_year: i32, value: f64) -> Result<GradingScale, HandlerErr> {
        let scale = self.store().active_scale(school_year)?;
        if !scale.is_valid(value) {
            return Err(HandlerErr::new(
                "invalid_range",
                format!("value must be between {} and {}", scale.min(), scale.max()),
            )
            .with_details(json!({
                "value": value,
                "scale": scale,
                "min": scale.min(),
                "max": scale.max(),
            })));
        }
        Ok(scale)
    }
}

pub type Handler = fn(&Ctx<'_>) -> Result<serde_json::Value, HandlerErr>;

/// Runs a handler that needs an open workspace and wraps its outcome.
pub fn dispatch(state: &AppState, req: &Request, handler: Handler) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let ctx = Ctx {
        conn,
        config: &state.config,
        params: Params(&req.params),
    };
    match handler(&ctx) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub type PureHandler = fn(&Params<'_>) -> Result<serde_json::Value, HandlerErr>;

/// Runs a handler that works on its params alone.
pub fn dispatch_pure(req: &Request, handler: PureHandler) -> serde_json::Value {
    match handler(&Params(&req.params)) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}
