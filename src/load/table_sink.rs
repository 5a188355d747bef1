use rusqlite::params;
use tracing::{info, instrument};

use crate::error::Result;
use crate::storage::Storage;
use crate::types::{FieldNames, NormalizedRecord};

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Replaces the contents of `table` with `records` in a single transaction.
///
/// The table is dropped and recreated, so its schema always matches the
/// current field names. Nothing is visible to other connections until commit.
#[instrument(skip(storage, field_names, records), fields(rows = records.len()))]
pub fn load_table(
    storage: &mut Storage,
    table: &str,
    field_names: &FieldNames,
    records: &[NormalizedRecord],
) -> Result<usize> {
    let table_ident = quote_ident(table);
    let label_ident = quote_ident(&field_names.label);
    let value_ident = quote_ident(&field_names.normalized_value()?);

    let tx = storage.connection_mut()?.transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {t};
         CREATE TABLE {t} ({label} TEXT, {value} REAL);",
        t = table_ident,
        label = label_ident,
        value = value_ident,
    ))?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
            table_ident, label_ident, value_ident
        ))?;
        for record in records {
            stmt.execute(params![record.country, record.gdp_billions])?;
        }
    }
    tx.commit()?;

    info!("Loaded {} rows into table {}", records.len(), table);
    Ok(records.len())
}

/// Every row of `table` in stored order.
pub fn read_table(
    storage: &Storage,
    table: &str,
    field_names: &FieldNames,
) -> Result<Vec<NormalizedRecord>> {
    let sql = format!(
        "SELECT {}, {} FROM {} ORDER BY rowid",
        quote_ident(&field_names.label),
        quote_ident(&field_names.normalized_value()?),
        quote_ident(table)
    );
    let conn = storage.connection()?;
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(NormalizedRecord {
                country: row.get(0)?,
                gdp_billions: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
