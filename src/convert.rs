use std::fmt;

use tracing::debug;

use crate::error::Result;
use crate::model::{BankDataset, BankRecord, ConvertedBankRecord};
use crate::rates::ExchangeRateTable;

/// Target currencies the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Gbp,
    Eur,
    Inr,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Gbp, Currency::Eur, Currency::Inr];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Gbp => "GBP",
            Currency::Eur => "EUR",
            Currency::Inr => "INR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Round half away from zero to two decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Attach GBP/EUR/INR values to every record, preserving order.
///
/// All rates are resolved up front, so a missing currency fails before any
/// record is produced.
pub fn convert(records: Vec<BankRecord>, rates: &ExchangeRateTable) -> Result<BankDataset> {
    let [gbp, eur, inr] = Currency::ALL.map(|c| rates.rate(c.code()));
    let (gbp, eur, inr) = (gbp?, eur?, inr?);
    debug!(
        "Converting {} records ({}={}, {}={}, {}={})",
        records.len(),
        Currency::Gbp,
        gbp,
        Currency::Eur,
        eur,
        Currency::Inr,
        inr
    );

    Ok(records
        .into_iter()
        .map(|r| {
            let usd = r.market_cap_usd();
            ConvertedBankRecord {
                market_cap_usd: usd,
                market_cap_gbp: round2(usd * gbp),
                market_cap_eur: round2(usd * eur),
                market_cap_inr: round2(usd * inr),
                name: r.name().to_string(),
            }
        })
        .collect())
}
