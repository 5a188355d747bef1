use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{EtlError, Result};
use crate::extract::TableSelector;
use crate::types::FieldNames;

/// Everything a single pipeline run needs. Built once and passed into
/// [`crate::pipeline::Pipeline::new`]; nothing here is global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub source_url: String,
    pub field_names: FieldNames,
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub table_name: String,
    pub log_path: PathBuf,
    pub query_threshold: f64,
    pub table_selector: TableSelector,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            field_names: FieldNames::default(),
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            query_threshold: DEFAULT_QUERY_THRESHOLD,
            table_selector: TableSelector::default(),
        }
    }
}

impl EtlConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        let config: EtlConfig = toml::from_str(&config_content)?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EtlError::Config(e.to_string()))
    }

    /// Apply `GDP_ETL_*` environment variables on top of the current values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_SOURCE_URL) {
            self.source_url = v;
        }
        if let Some(v) = lookup(ENV_CSV_PATH) {
            self.csv_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_DB_PATH) {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_TABLE_NAME) {
            self.table_name = v;
        }
        if let Some(v) = lookup(ENV_LOG_PATH) {
            self.log_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_QUERY_THRESHOLD) {
            self.query_threshold = v.trim().parse().map_err(|_| {
                EtlError::Config(format!("{} is not a number: '{}'", ENV_QUERY_THRESHOLD, v))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_url.trim().is_empty() {
            return Err(EtlError::Config("source_url must not be empty".into()));
        }
        for (name, path) in [
            ("csv_path", &self.csv_path),
            ("db_path", &self.db_path),
            ("log_path", &self.log_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(EtlError::Config(format!("{} must not be empty", name)));
            }
        }
        ensure_identifier("table_name", &self.table_name)?;
        ensure_identifier("field_names.label", &self.field_names.label)?;
        ensure_identifier("field_names.value", &self.field_names.value)?;
        self.field_names.normalized_value()?;
        if !self.query_threshold.is_finite() {
            return Err(EtlError::Config("query_threshold must be finite".into()));
        }
        if let TableSelector::Containing(text) = &self.table_selector {
            if text.is_empty() {
                return Err(EtlError::Config(
                    "table_selector.containing must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Table and column names are interpolated into SQL text, so only plain
/// identifiers are accepted.
fn ensure_identifier(field: &str, value: &str) -> Result<()> {
    let mut chars = value.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(EtlError::Config(format!(
            "{} '{}' is not a valid identifier",
            field, value
        )))
    }
}
