use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::db::map_record;
use crate::error::{EtlError, Result};
use crate::model::{ConvertedBankRecord, OUTPUT_COLUMNS, USD_COLUMN};

/// The fixed read-only filter: `MC_USD_Billion >= min_usd`.
#[derive(Debug, Clone, Copy)]
pub struct MarketCapFilter {
    pub min_usd: f64,
}

impl Default for MarketCapFilter {
    fn default() -> Self {
        MarketCapFilter { min_usd: 100.0 }
    }
}

impl MarketCapFilter {
    pub fn statement(&self, table: &str) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} >= ?1",
            OUTPUT_COLUMNS.join(", "),
            table,
            USD_COLUMN
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub statement: String,
    pub min_usd: f64,
    pub rows: Vec<ConvertedBankRecord>,
}

/// Run the filter against `table`. Rows come back in the store's native order.
pub fn run_query(filter: &MarketCapFilter, conn: &Connection, table: &str) -> Result<QueryResult> {
    let statement = filter.statement(table);
    let fail = |e: rusqlite::Error| EtlError::Query(format!("{}: {}", statement, e));

    let mut stmt = conn.prepare(&statement).map_err(fail)?;
    let rows = stmt
        .query_map([filter.min_usd], map_record)
        .map_err(fail)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(fail)?;

    info!("Query returned {} rows", rows.len());
    Ok(QueryResult {
        statement,
        min_usd: filter.min_usd,
        rows,
    })
}

impl QueryResult {
    /// Aligned text table, statement first.
    pub fn render(&self) -> String {
        let mut out = format!("{}  -- ?1 = {}\n", self.statement, self.min_usd);
        out.push_str(&format!(
            "{:>3} | {:<44} | {:>14} | {:>14} | {:>14} | {:>14}\n",
            "#", OUTPUT_COLUMNS[0], OUTPUT_COLUMNS[1], OUTPUT_COLUMNS[2], OUTPUT_COLUMNS[3], OUTPUT_COLUMNS[4]
        ));
        out.push_str(&"-".repeat(123));
        out.push('\n');
        for (i, r) in self.rows.iter().enumerate() {
            out.push_str(&format!(
                "{:>3} | {:<44} | {:>14.2} | {:>14.2} | {:>14.2} | {:>14.2}\n",
                i,
                truncate(&r.name, 44),
                r.market_cap_usd,
                r.market_cap_gbp,
                r.market_cap_eur,
                r.market_cap_inr
            ));
        }
        out.push_str(&format!("{} rows", self.rows.len()));
        out
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| EtlError::Query(e.to_string()))
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}
