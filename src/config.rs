use crate::db::DEFAULT_DB_FILE;
use crate::scale::GradingScale;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "gradebookd.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub database: DatabaseConfig,
    pub grades: GradesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub file_name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_DB_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradesConfig {
    /// Scale for school years without a stored setting.
    pub default_scale: GradingScale,
}

impl WorkspaceConfig {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let cfg: WorkspaceConfig = toml::from_str(raw).context("invalid gradebookd.toml")?;
        if cfg.database.file_name.trim().is_empty() {
            anyhow::bail!("database.file_name must not be empty");
        }
        Ok(cfg)
    }

    /// Reads `gradebookd.toml` from the workspace. `Ok(None)` when absent.
    pub fn load(workspace: &Path) -> anyhow::Result<Option<Self>> {
        let path = workspace.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&raw).map(Some)
    }
}
