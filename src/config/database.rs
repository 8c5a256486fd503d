//! Database configuration.

use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Sqlite,
    Mysql,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    pub connection_string: String,
    pub table_prefix: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            kind: DatabaseKind::Sqlite,
            connection_string: "sqlite://./data/orchestration.db?mode=rwc".to_string(),
            table_prefix: "orch_".to_string(),
            max_connections: 10,
        }
    }
}

impl DatabaseConfig {
    /// Creates the parent directory of a sqlite file URL, if needed.
    pub fn ensure_database_path(&self) -> Result<()> {
        if self.kind != DatabaseKind::Sqlite || self.connection_string.contains(":memory:") {
            return Ok(());
        }

        let path_str = self
            .connection_string
            .strip_prefix("sqlite://")
            .unwrap_or(&self.connection_string);
        let path_str = path_str.split('?').next().unwrap_or(path_str);
        let db_path = Path::new(path_str);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ProxyError::config_with_source(
                        format!("failed to create database directory: {}", parent.display()),
                        e,
                    )
                })?;
                tracing::info!(path = %parent.display(), "created database directory");
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn is_sqlite(&self) -> bool {
        self.kind == DatabaseKind::Sqlite
    }
}
