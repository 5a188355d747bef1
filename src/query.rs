use rusqlite::params;
use std::io::Write;
use tracing::{info, instrument};

use crate::error::Result;
use crate::load::table_sink::quote_ident;
use crate::storage::Storage;
use crate::types::{FieldNames, NormalizedRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    /// Human-readable form of the statement that was run
    pub statement: String,
    pub rows: Vec<NormalizedRecord>,
}

/// Selects every row whose billions value is at least `threshold`, in stored
/// order. The statement and the matching rows are echoed to `out`.
#[instrument(skip(storage, field_names, out))]
pub fn run_query<W: Write>(
    storage: &Storage,
    table: &str,
    field_names: &FieldNames,
    threshold: f64,
    out: &mut W,
) -> Result<QueryOutput> {
    let value_name = field_names.normalized_value()?;
    let statement = format!(
        "SELECT * from {} WHERE {} >= {}",
        table, value_name, threshold
    );
    writeln!(out, "{}", statement)?;

    let sql = format!(
        "SELECT {}, {} FROM {} WHERE {} >= ?1 ORDER BY rowid",
        quote_ident(&field_names.label),
        quote_ident(&value_name),
        quote_ident(table),
        quote_ident(&value_name),
    );
    let conn = storage.connection()?;
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![threshold], |row| {
            Ok(NormalizedRecord {
                country: row.get(0)?,
                gdp_billions: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    write!(out, "{}", render_rows(&rows, &field_names.label, &value_name))?;
    out.flush()?;

    info!("Query matched {} rows", rows.len());
    Ok(QueryOutput { statement, rows })
}

/// Right-aligned text table with a leading row index.
pub fn render_rows(rows: &[NormalizedRecord], label: &str, value: &str) -> String {
    let index_width = rows.len().saturating_sub(1).to_string().len();
    let label_width = rows
        .iter()
        .map(|r| r.country.chars().count())
        .chain(std::iter::once(label.chars().count()))
        .max()
        .unwrap_or(0);
    let values: Vec<String> = rows.iter().map(|r| format!("{:.2}", r.gdp_billions)).collect();
    let value_width = values
        .iter()
        .map(|v| v.len())
        .chain(std::iter::once(value.len()))
        .max()
        .unwrap_or(0);

    let mut text = format!(
        "{:>iw$}  {:>lw$}  {:>vw$}\n",
        "",
        label,
        value,
        iw = index_width,
        lw = label_width,
        vw = value_width
    );
    for (i, (row, v)) in rows.iter().zip(&values).enumerate() {
        text.push_str(&format!(
            "{:<iw$}  {:>lw$}  {:>vw$}\n",
            i,
            row.country,
            v,
            iw = index_width,
            lw = label_width,
            vw = value_width
        ));
    }
    if rows.is_empty() {
        text.push_str("(no rows)\n");
    }
    text
}
