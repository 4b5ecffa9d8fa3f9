use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};

pub const NAME_COLUMN: &str = "Name";
pub const USD_COLUMN: &str = "MC_USD_Billion";

/// One row of the ranking table.
#[derive(Debug, Clone, PartialEq)]
pub struct BankRecord {
    name: String,
    market_cap_usd: f64,
}

impl BankRecord {
    pub fn new(name: impl Into<String>, market_cap_usd: f64) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EtlError::Extraction("bank name is empty".into()));
        }
        if !market_cap_usd.is_finite() || market_cap_usd < 0.0 {
            return Err(EtlError::Conversion(format!(
                "market cap for {} is not a non-negative number: {}",
                name, market_cap_usd
            )));
        }
        Ok(BankRecord {
            name,
            market_cap_usd,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn market_cap_usd(&self) -> f64 {
        self.market_cap_usd
    }
}

/// A `BankRecord` with all derived currency values attached.
///
/// Field names double as the CSV and SQLite column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedBankRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "MC_USD_Billion")]
    pub market_cap_usd: f64,
    #[serde(rename = "MC_GBP_Billion")]
    pub market_cap_gbp: f64,
    #[serde(rename = "MC_EUR_Billion")]
    pub market_cap_eur: f64,
    #[serde(rename = "MC_INR_Billion")]
    pub market_cap_inr: f64,
}

/// Converted records in source rank order.
pub type BankDataset = Vec<ConvertedBankRecord>;

/// Output columns, in order, excluding the CSV index column.
pub const OUTPUT_COLUMNS: [&str; 5] = [
    NAME_COLUMN,
    USD_COLUMN,
    "MC_GBP_Billion",
    "MC_EUR_Billion",
    "MC_INR_Billion",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_name() {
        assert!(matches!(
            BankRecord::new("  ", 10.0),
            Err(EtlError::Extraction(_))
        ));
    }

    #[test]
    fn rejects_negative_or_nan_value() {
        assert!(BankRecord::new("HSBC", -1.0).is_err());
        assert!(BankRecord::new("HSBC", f64::NAN).is_err());
    }

    #[test]
    fn accepts_zero() {
        let r = BankRecord::new("Tiny Bank", 0.0).unwrap();
        assert_eq!(r.name(), "Tiny Bank");
        assert_eq!(r.market_cap_usd(), 0.0);
    }
}
