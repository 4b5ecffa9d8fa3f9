use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tracing::info;

use crate::error::{EtlError, Result};
use crate::model::ConvertedBankRecord;

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(|e| EtlError::persistence(path.display(), e))?;
    info!("SQLite connection opened: {:?}", path);
    Ok(conn)
}

/// Open an existing store without write access, for ad-hoc queries.
pub fn open_read_only(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| EtlError::Query(format!("cannot open {:?}: {}", path, e)))
}

/// Drop and recreate `table`, then insert the dataset in rank order.
///
/// `table` must already be a validated identifier.
pub fn replace_table(conn: &Connection, table: &str, records: &[ConvertedBankRecord]) -> Result<usize> {
    let fail = |e: rusqlite::Error| EtlError::persistence(table, e);

    let tx = conn.unchecked_transaction().map_err(fail)?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table};
         CREATE TABLE {table} (
             Name            TEXT NOT NULL,
             MC_USD_Billion  REAL NOT NULL,
             MC_GBP_Billion  REAL NOT NULL,
             MC_EUR_Billion  REAL NOT NULL,
             MC_INR_Billion  REAL NOT NULL
         );",
    ))
    .map_err(fail)?;

    let mut count = 0;
    {
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO {table} (Name, MC_USD_Billion, MC_GBP_Billion, MC_EUR_Billion, MC_INR_Billion)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            ))
            .map_err(fail)?;
        for r in records {
            count += stmt
                .execute(rusqlite::params![
                    r.name, r.market_cap_usd, r.market_cap_gbp, r.market_cap_eur, r.market_cap_inr,
                ])
                .map_err(fail)?;
        }
    }
    tx.commit().map_err(fail)?;

    info!("Loaded {} rows into table {}", count, table);
    Ok(count)
}

pub fn map_record(row: &rusqlite::Row) -> rusqlite::Result<ConvertedBankRecord> {
    Ok(ConvertedBankRecord {
        name: row.get(0)?,
        market_cap_usd: row.get(1)?,
        market_cap_gbp: row.get(2)?,
        market_cap_eur: row.get(3)?,
        market_cap_inr: row.get(4)?,
    })
}
