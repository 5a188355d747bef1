use tracing::{info, instrument};

use crate::error::{EtlError, Result};
use crate::types::{NormalizedRecord, RecordRow};

/// Rounds to 2 decimal places, ties to even on the scaled value.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Parses a millions figure such as `"21,427,700"`, dropping thousands separators.
pub fn parse_millions(raw: &str) -> Result<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    let value: f64 = cleaned.parse().map_err(|e: std::num::ParseFloatError| EtlError::Parse {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !value.is_finite() {
        return Err(EtlError::Parse {
            value: raw.to_string(),
            reason: "not a finite number".to_string(),
        });
    }
    if value < 0.0 {
        return Err(EtlError::Parse {
            value: raw.to_string(),
            reason: "GDP cannot be negative".to_string(),
        });
    }
    Ok(value)
}

pub fn normalize_row(row: RecordRow) -> Result<NormalizedRecord> {
    let millions = parse_millions(&row.raw_gdp)?;
    Ok(NormalizedRecord {
        country: row.country,
        gdp_billions: round_to_cents(millions / 1000.0),
    })
}

/// Converts every extracted row from millions to billions, preserving order.
#[instrument(skip_all, fields(rows = rows.len()))]
pub fn transform(rows: Vec<RecordRow>) -> Result<Vec<NormalizedRecord>> {
    let records = rows
        .into_iter()
        .map(normalize_row)
        .collect::<Result<Vec<_>>>()?;
    info!("Normalized {} records to billions", records.len());
    Ok(records)
}
