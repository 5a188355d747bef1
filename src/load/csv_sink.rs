use std::fs::{self, Permissions};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{info, instrument};

use crate::error::{EtlError, Result};
use crate::types::{FieldNames, NormalizedRecord};

/// Writes the records as CSV with a leading positional index column.
///
/// The file is staged next to `path` and renamed into place, so readers see
/// either the previous file or the complete new one.
#[instrument(skip(records, field_names), fields(rows = records.len()))]
pub fn write_csv(records: &[NormalizedRecord], path: &Path, field_names: &FieldNames) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let staged = NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::Writer::from_writer(staged.as_file());
        let value_name = field_names.normalized_value()?;
        writer.write_record(["", field_names.label.as_str(), value_name.as_str()])?;
        for (index, record) in records.iter().enumerate() {
            writer.write_record([
                index.to_string(),
                record.country.clone(),
                format!("{:.2}", record.gdp_billions),
            ])?;
        }
        writer.flush()?;
    }
    // Staging files are created owner-only; publish with the mode readers expect
    if let Some(permissions) = target_permissions(path) {
        staged.as_file().set_permissions(permissions)?;
    }
    staged.as_file().sync_all()?;
    staged.persist(path)?;

    info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

/// Mode of the file being replaced, or 0644 for a new file.
fn target_permissions(path: &Path) -> Option<Permissions> {
    match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => new_file_permissions(),
    }
}

#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}

/// Reads a file produced by [`write_csv`], dropping the index column.
pub fn read_csv(path: &Path) -> Result<Vec<NormalizedRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let (Some(country), Some(value)) = (row.get(1), row.get(2)) else {
            return Err(EtlError::Structure(format!(
                "CSV row {:?} has fewer than 3 columns",
                row.position().map(|p| p.line())
            )));
        };
        let gdp_billions: f64 = value.parse().map_err(|e: std::num::ParseFloatError| EtlError::Parse {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
        records.push(NormalizedRecord {
            country: country.to_string(),
            gdp_billions,
        });
    }
    Ok(records)
}
