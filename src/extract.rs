use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{EtlError, Result};
use crate::model::{BankRecord, NAME_COLUMN, USD_COLUMN};

static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th, td").unwrap());
static TH_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static TD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

// Leading numeric literal; trailing markers (`*`, `[1]`, `$`, newlines) are ignored.
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([0-9][0-9,]*(?:\.[0-9]+)?)").unwrap());

static FOOTNOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(?:\d+|[a-z]|note \d+)\]").unwrap());

/// Fields the extractor produces, in order.
pub const EXPECTED_COLUMNS: [&str; 2] = [NAME_COLUMN, USD_COLUMN];

/// How the ranking table is recognised inside the document.
///
/// The first `<table>` whose header row has a cell containing `name_header`
/// and a cell containing `value_header` (case-insensitive) wins; those header
/// positions pick the name and value columns.
#[derive(Debug, Clone)]
pub struct TableRule {
    pub name_header: String,
    pub value_header: String,
}

impl Default for TableRule {
    fn default() -> Self {
        TableRule {
            name_header: "Bank name".to_string(),
            value_header: "Market cap".to_string(),
        }
    }
}

struct LocatedTable<'a> {
    table: ElementRef<'a>,
    name_col: usize,
    value_col: usize,
}

/// Parse the ranking table out of `markup`, in document order.
pub fn extract(markup: &str, expected_columns: &[&str], rule: &TableRule) -> Result<Vec<BankRecord>> {
    if expected_columns != EXPECTED_COLUMNS {
        return Err(EtlError::Extraction(format!(
            "expected columns {:?}, got {:?}",
            EXPECTED_COLUMNS, expected_columns
        )));
    }

    let document = Html::parse_document(markup);
    let located = locate_table(&document, rule)?;

    let mut records = Vec::new();
    for (row_idx, row) in located.table.select(&ROW_SEL).enumerate() {
        // Header and separator rows carry no data cells.
        if row.select(&TD_SEL).next().is_none() {
            continue;
        }
        let cells: Vec<ElementRef> = row.select(&CELL_SEL).collect();

        let name_cell = cells.get(located.name_col).ok_or_else(|| {
            EtlError::Extraction(format!("row {}: missing name cell", row_idx))
        })?;
        let value_cell = cells.get(located.value_col).ok_or_else(|| {
            EtlError::Extraction(format!("row {}: missing market cap cell", row_idx))
        })?;

        let name = bank_name(name_cell);
        if name.is_empty() {
            return Err(EtlError::Extraction(format!("row {}: empty bank name", row_idx)));
        }
        let market_cap = parse_market_cap(&cell_text(value_cell)).map_err(|e| match e {
            EtlError::Conversion(msg) => EtlError::Conversion(format!("{} ({})", msg, name)),
            other => other,
        })?;

        records.push(BankRecord::new(name, market_cap)?);
    }

    debug!("Extracted {} rows", records.len());
    Ok(records)
}

fn locate_table<'a>(document: &'a Html, rule: &TableRule) -> Result<LocatedTable<'a>> {
    let name_needle = rule.name_header.to_lowercase();
    let value_needle = rule.value_header.to_lowercase();

    for (table_idx, table) in document.select(&TABLE_SEL).enumerate() {
        let Some(header) = table
            .select(&ROW_SEL)
            .find(|row| row.select(&TH_SEL).next().is_some())
        else {
            continue;
        };

        let labels: Vec<String> = header
            .select(&CELL_SEL)
            .map(|c| cell_text(&c).to_lowercase())
            .collect();
        let name_col = labels.iter().position(|l| l.contains(&name_needle));
        let value_col = labels.iter().position(|l| l.contains(&value_needle));

        if let (Some(name_col), Some(value_col)) = (name_col, value_col) {
            debug!(
                "Ranking table is table #{} (name col {}, value col {})",
                table_idx, name_col, value_col
            );
            return Ok(LocatedTable {
                table,
                name_col,
                value_col,
            });
        }
    }

    Err(EtlError::Extraction(format!(
        "no table with headers {:?} and {:?}",
        rule.name_header, rule.value_header
    )))
}

/// Title of the last titled link in the cell; the first is usually a flag
/// icon. In-page links (`#cite_note-2` footnotes) never name the bank.
fn bank_name(cell: &ElementRef) -> String {
    let links: Vec<ElementRef> = cell
        .select(&ANCHOR_SEL)
        .filter(|a| !a.value().attr("href").is_some_and(|h| h.starts_with('#')))
        .collect();

    let titled = links.iter().rev().find_map(|a| {
        a.value()
            .attr("title")
            .map(normalize)
            .filter(|t| !t.is_empty())
    });
    if let Some(title) = titled {
        return title;
    }
    match links.last() {
        Some(a) => cell_text(a),
        None => normalize(&FOOTNOTE_RE.replace_all(&cell_text(cell), "")),
    }
}

fn cell_text(el: &ElementRef) -> String {
    normalize(&el.text().collect::<String>())
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Numeric value of a market cap literal such as `432.92`, `1,024.5*` or `386.53[3]`.
pub fn parse_market_cap(literal: &str) -> Result<f64> {
    let caps = NUMBER_RE.captures(literal).ok_or_else(|| {
        EtlError::Conversion(format!("non-numeric market cap literal {:?}", literal))
    })?;
    caps[1]
        .replace(',', "")
        .parse::<f64>()
        .map_err(|e| EtlError::Conversion(format!("bad market cap literal {:?}: {}", literal, e)))
}
