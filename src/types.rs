use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};

/// Markup text as returned by a fetcher. Consumed once by extraction.
#[derive(Debug, Clone)]
pub struct RawDocument(String);

impl RawDocument {
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A qualifying table row before any numeric cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    pub country: String,
    /// GDP in millions, exactly as it appeared in the document
    pub raw_gdp: String,
}

/// A row after unit normalization: GDP in billions, rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub country: String,
    pub gdp_billions: f64,
}

/// Column names for the value and label fields.
///
/// `value` names the raw millions column; the persisted column name is
/// derived from it by [`FieldNames::normalized_value`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNames {
    pub value: String,
    pub label: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            value: crate::constants::DEFAULT_VALUE_FIELD.to_string(),
            label: crate::constants::DEFAULT_LABEL_FIELD.to_string(),
        }
    }
}

impl FieldNames {
    /// `GDP_USD_millions` -> `GDP_USD_billions`
    pub fn normalized_value(&self) -> Result<String> {
        if !self.value.contains("millions") {
            return Err(EtlError::Config(format!(
                "value field '{}' does not name a millions unit",
                self.value
            )));
        }
        Ok(self.value.replace("millions", "billions"))
    }
}
