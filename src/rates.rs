use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{EtlError, Result};

#[derive(Debug, Deserialize)]
struct RateRow {
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "Rate")]
    rate: f64,
}

/// Currency code → multiplier relative to USD. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct ExchangeRateTable {
    rates: HashMap<String, f64>,
}

impl ExchangeRateTable {
    /// Build from `(code, rate)` pairs. Duplicate codes and non-positive rates are rejected.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut rates = HashMap::new();
        for (code, rate) in pairs {
            let code = code.into().trim().to_uppercase();
            if code.is_empty() {
                return Err(EtlError::Conversion("empty currency code".into()));
            }
            if !rate.is_finite() || rate <= 0.0 {
                return Err(EtlError::Conversion(format!(
                    "rate for {} must be positive, got {}",
                    code, rate
                )));
            }
            if rates.insert(code.clone(), rate).is_some() {
                return Err(EtlError::Conversion(format!("duplicate rate for {}", code)));
            }
        }
        Ok(ExchangeRateTable { rates })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut pairs = Vec::new();
        for row in rdr.deserialize::<RateRow>() {
            let row = row.map_err(|e| EtlError::Conversion(format!("bad rate row: {}", e)))?;
            pairs.push((row.currency, row.rate));
        }
        let table = Self::from_pairs(pairs)?;
        if table.is_empty() {
            return Err(EtlError::Conversion("rate table has no rows".into()));
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            EtlError::Conversion(format!("cannot open rate table {:?}: {}", path, e))
        })?;
        let table = Self::from_reader(file)?;
        debug!("Loaded {} exchange rates from {:?}", table.len(), path);
        Ok(table)
    }

    /// Rate for `code`; an unknown currency is an error, never a default.
    pub fn rate(&self, code: &str) -> Result<f64> {
        self.rates
            .get(code)
            .copied()
            .ok_or_else(|| EtlError::Conversion(format!("missing rate for {}", code)))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_fixture() {
        let t = ExchangeRateTable::load(Path::new("tests/fixtures/exchange_rate.csv")).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.rate("GBP").unwrap(), 0.8);
        assert_eq!(t.rate("EUR").unwrap(), 0.93);
        assert_eq!(t.rate("INR").unwrap(), 82.95);
    }

    #[test]
    fn unknown_currency_is_an_error() {
        let t = ExchangeRateTable::from_pairs([("GBP", 0.8)]).unwrap();
        assert!(matches!(t.rate("JPY"), Err(EtlError::Conversion(_))));
    }

    #[test]
    fn duplicate_code_rejected() {
        let csv = "Currency,Rate\nGBP,0.8\ngbp,0.81\n";
        let err = ExchangeRateTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, EtlError::Conversion(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn non_positive_rate_rejected() {
        assert!(ExchangeRateTable::from_pairs([("EUR", 0.0)]).is_err());
        assert!(ExchangeRateTable::from_pairs([("EUR", -0.93)]).is_err());
    }

    #[test]
    fn non_numeric_rate_rejected() {
        let csv = "Currency,Rate\nEUR,abc\n";
        assert!(ExchangeRateTable::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn header_only_rate_file_rejected() {
        let err = ExchangeRateTable::from_reader("Currency,Rate\n".as_bytes()).unwrap_err();
        assert!(matches!(err, EtlError::Conversion(msg) if msg.contains("no rows")));
    }

    #[test]
    fn missing_file() {
        let err = ExchangeRateTable::load(Path::new("tests/fixtures/nope.csv")).unwrap_err();
        assert!(matches!(err, EtlError::Conversion(_)));
    }
}
