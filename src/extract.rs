use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::constants::{DEFAULT_TABLE_POSITION, PLACEHOLDER_DASH};
use crate::error::{EtlError, Result};
use crate::types::{RawDocument, RecordRow};

/// One cell of a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Cell text with footnote markers removed, trimmed
    pub text: String,
    /// Text of the first hyperlink inside the cell, if there is one
    pub link_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableRow {
    pub cells: Vec<Cell>,
}

/// The rows of one table body, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableBody {
    pub rows: Vec<TableRow>,
}

impl TableBody {
    pub fn contains_text(&self, needle: &str) -> bool {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .any(|c| c.text.contains(needle))
    }
}

/// Anything that can hand out table bodies by position.
pub trait TabularSource {
    fn table_count(&self) -> usize;
    fn get_table(&self, index: usize) -> Option<TableBody>;
}

/// How the GDP table body is located within a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSelector {
    /// Zero-based index among all table bodies
    Position(usize),
    /// First table body with a cell containing the given text
    Containing(String),
}

impl Default for TableSelector {
    fn default() -> Self {
        TableSelector::Position(DEFAULT_TABLE_POSITION)
    }
}

impl TableSelector {
    pub fn select<S: TabularSource + ?Sized>(&self, source: &S) -> Result<TableBody> {
        match self {
            TableSelector::Position(index) => source.get_table(*index).ok_or_else(|| {
                EtlError::Structure(format!(
                    "expected a table body at position {} but the document has {}",
                    index,
                    source.table_count()
                ))
            }),
            TableSelector::Containing(needle) => (0..source.table_count())
                .filter_map(|i| source.get_table(i))
                .find(|t| t.contains_text(needle))
                .ok_or_else(|| {
                    EtlError::Structure(format!("no table body contains '{}'", needle))
                }),
        }
    }
}

/// HTML markup parsed with `scraper`; table bodies are `tbody` elements.
pub struct HtmlDocument {
    html: Html,
    tbody: Selector,
    tr: Selector,
    td: Selector,
    a: Selector,
}

impl HtmlDocument {
    pub fn parse(markup: &str) -> Result<Self> {
        Ok(Self {
            html: Html::parse_document(markup),
            tbody: parse_selector("tbody")?,
            tr: parse_selector("tr")?,
            td: parse_selector("td")?,
            a: parse_selector("a")?,
        })
    }

    fn read_cell(&self, cell: ElementRef) -> Cell {
        let link_text = cell
            .select(&self.a)
            .next()
            .map(|a| a.text().collect::<String>().trim().to_string());

        Cell {
            text: cell_text(cell),
            link_text,
        }
    }
}

impl TabularSource for HtmlDocument {
    fn table_count(&self) -> usize {
        self.html.select(&self.tbody).count()
    }

    fn get_table(&self, index: usize) -> Option<TableBody> {
        let body = self.html.select(&self.tbody).nth(index)?;
        let rows = body
            .select(&self.tr)
            .map(|tr| TableRow {
                cells: tr.select(&self.td).map(|td| self.read_cell(td)).collect(),
            })
            .collect();
        Some(TableBody { rows })
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| EtlError::Structure(format!("invalid selector '{}': {:?}", css, e)))
}

/// Concatenated text of a cell, skipping anything inside `<sup>` (citation markers).
fn cell_text(cell: ElementRef) -> String {
    let cell_id = cell.id();
    let mut text = String::new();
    for node in cell.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let in_sup = node
            .ancestors()
            .take_while(|a| a.id() != cell_id)
            .any(|a| a.value().as_element().is_some_and(|e| e.name() == "sup"));
        if !in_sup {
            text.push_str(fragment);
        }
    }
    text.trim().to_string()
}

/// Applies the inclusion rule to one row: the first cell must carry a
/// non-empty link and the third cell must hold something other than the
/// placeholder dash.
pub fn qualify_row(row: &TableRow) -> Option<RecordRow> {
    if row.cells.len() < 3 {
        return None;
    }
    let country = row.cells[0].link_text.as_deref()?;
    if country.is_empty() {
        return None;
    }
    let raw_gdp = &row.cells[2].text;
    if raw_gdp == PLACEHOLDER_DASH {
        return None;
    }
    Some(RecordRow {
        country: country.to_string(),
        raw_gdp: raw_gdp.clone(),
    })
}

/// Pulls GDP rows out of an already-parsed tabular source.
pub fn extract_from<S: TabularSource + ?Sized>(
    source: &S,
    selector: &TableSelector,
) -> Result<Vec<RecordRow>> {
    let table = selector.select(source)?;
    let total = table.rows.len();

    let mut records = Vec::with_capacity(total);
    for (i, row) in table.rows.iter().enumerate() {
        if row.cells.is_empty() {
            continue;
        }
        match qualify_row(row) {
            Some(record) => records.push(record),
            None => debug!(row = i, "Skipping row that is not a linked country with a value"),
        }
    }

    info!("Extracted {} of {} rows", records.len(), total);
    if records.is_empty() {
        warn!("No rows qualified - the page structure may have changed");
    }
    Ok(records)
}

/// Parses markup and extracts the GDP rows from the selected table body.
#[instrument(skip_all, fields(bytes = document.len()))]
pub fn extract(document: RawDocument, selector: &TableSelector) -> Result<Vec<RecordRow>> {
    if document.is_empty() {
        return Err(EtlError::Structure("document is empty".to_string()));
    }
    let html = HtmlDocument::parse(document.as_str())?;
    extract_from(&html, selector)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(bodies: &[&str]) -> RawDocument {
        let tables: String = bodies
            .iter()
            .map(|b| format!("<table><tbody>{}</tbody></table>", b))
            .collect();
        RawDocument::new(format!("<html><body>{}</body></html>", tables))
    }

    const GDP_BODY: &str = r#"
        <tr><th>Country</th><th>Region</th><th>Estimate</th></tr>
        <tr><td>World</td><td>-</td><td>105,568,776</td></tr>
        <tr><td><a href="/wiki/United_States">United States</a></td><td>Americas</td><td>26,854,599</td></tr>
        <tr><td><a href="/wiki/Russia">Russia</a></td><td>Europe</td><td>—</td></tr>
        <tr><td><span><a href="/wiki/China">China</a></span></td><td>Asia</td><td>19,373,586<sup>[n 1]</sup></td></tr>
    "#;

    #[test]
    fn extracts_linked_rows_from_third_body() {
        let doc = page(&["<tr><td>a</td></tr>", "<tr><td>b</td></tr>", GDP_BODY]);
        let rows = extract(doc, &TableSelector::default()).unwrap();

        assert_eq!(
            rows,
            vec![
                RecordRow {
                    country: "United States".to_string(),
                    raw_gdp: "26,854,599".to_string(),
                },
                RecordRow {
                    country: "China".to_string(),
                    raw_gdp: "19,373,586".to_string(),
                },
            ]
        );
    }

    #[test]
    fn fewer_than_three_bodies_is_structure_error() {
        let doc = page(&[GDP_BODY, GDP_BODY]);
        let err = extract(doc, &TableSelector::default()).unwrap_err();
        assert!(matches!(err, EtlError::Structure(_)));
    }

    #[test]
    fn empty_document_is_structure_error() {
        let err = extract(RawDocument::new(""), &TableSelector::default()).unwrap_err();
        assert!(matches!(err, EtlError::Structure(ref msg) if msg.contains("empty")));
    }

    #[test]
    fn unlinked_world_row_with_dash_is_excluded() {
        let row = TableRow {
            cells: vec![
                Cell { text: "World".into(), link_text: None },
                Cell { text: "".into(), link_text: None },
                Cell { text: "—".into(), link_text: None },
            ],
        };
        assert_eq!(qualify_row(&row), None);
    }

    #[test]
    fn linked_row_with_dash_is_excluded() {
        let row = TableRow {
            cells: vec![
                Cell { text: "Russia".into(), link_text: Some("Russia".into()) },
                Cell { text: "Europe".into(), link_text: None },
                Cell { text: "—".into(), link_text: None },
            ],
        };
        assert_eq!(qualify_row(&row), None);
    }

    #[test]
    fn short_rows_are_skipped() {
        let row = TableRow {
            cells: vec![Cell { text: "Japan".into(), link_text: Some("Japan".into()) }],
        };
        assert_eq!(qualify_row(&row), None);
    }

    #[test]
    fn containing_selector_finds_body_by_text() {
        let doc = HtmlDocument::parse(page(&["<tr><td>x</td></tr>", GDP_BODY]).as_str()).unwrap();
        let rows = extract_from(&doc, &TableSelector::Containing("Americas".into())).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].country, "United States");
    }

    #[test]
    fn containing_selector_without_match_is_structure_error() {
        let doc = HtmlDocument::parse(page(&[GDP_BODY]).as_str()).unwrap();
        let err = extract_from(&doc, &TableSelector::Containing("Antarctica".into())).unwrap_err();
        assert!(matches!(err, EtlError::Structure(_)));
    }

    struct FixedTables(Vec<TableBody>);

    impl TabularSource for FixedTables {
        fn table_count(&self) -> usize {
            self.0.len()
        }

        fn get_table(&self, index: usize) -> Option<TableBody> {
            self.0.get(index).cloned()
        }
    }

    #[test]
    fn works_over_any_tabular_source() {
        let body = TableBody {
            rows: vec![TableRow {
                cells: vec![
                    Cell { text: "Chad".into(), link_text: Some("Chad".into()) },
                    Cell { text: "Africa".into(), link_text: None },
                    Cell { text: "12,596".into(), link_text: None },
                ],
            }],
        };
        let source = FixedTables(vec![body]);
        let rows = extract_from(&source, &TableSelector::Position(0)).unwrap();
        assert_eq!(rows[0].raw_gdp, "12,596");
    }
}
