use std::path::PathBuf;
use std::sync::LazyLock;

use config::{Config, Environment, File};
use regex::Regex;
use serde::Deserialize;

use crate::error::{EtlError, Result};

const SOURCE_URL: &str =
    "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks";

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Everything a run needs, passed to the pipeline at construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Page holding the ranking table. Non-http values are read as local paths.
    pub source_url: String,
    pub rates_path: PathBuf,
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub table_name: String,
    pub log_path: PathBuf,
    /// Header text identifying the bank name column.
    pub name_header: String,
    /// Header text identifying the market cap column.
    pub value_header: String,
    pub query_min_usd: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            source_url: SOURCE_URL.to_string(),
            rates_path: PathBuf::from("exchange_rate.csv"),
            csv_path: PathBuf::from("Largest_banks_data.csv"),
            db_path: PathBuf::from("Banks.db"),
            table_name: "Largest_banks".to_string(),
            log_path: PathBuf::from("code_log.txt"),
            name_header: "Bank name".to_string(),
            value_header: "Market cap".to_string(),
            query_min_usd: 100.0,
        }
    }
}

impl Settings {
    /// Defaults, then `bank_etl.toml` if present, then `BANKS_*` env vars.
    pub fn load() -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name("bank_etl").required(false))
            .add_source(Environment::with_prefix("BANKS"))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| EtlError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !IDENT_RE.is_match(&self.table_name) {
            return Err(EtlError::Config(format!(
                "table_name {:?} is not a plain SQL identifier",
                self.table_name
            )));
        }
        if self.source_url.trim().is_empty() {
            return Err(EtlError::Config("source_url is empty".into()));
        }
        if self.name_header.trim().is_empty() || self.value_header.trim().is_empty() {
            return Err(EtlError::Config("column headers must not be empty".into()));
        }
        if !self.query_min_usd.is_finite() {
            return Err(EtlError::Config("query_min_usd must be finite".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.table_name, "Largest_banks");
        assert_eq!(s.query_min_usd, 100.0);
    }

    #[test]
    fn rejects_injected_table_name() {
        let s = Settings {
            table_name: "banks; DROP TABLE x".into(),
            ..Settings::default()
        };
        assert!(matches!(s.validate(), Err(EtlError::Config(_))));
    }

    #[test]
    fn partial_source_keeps_defaults() {
        let s: Settings = Config::builder()
            .set_override("table_name", "Top_banks")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(s.table_name, "Top_banks");
        assert_eq!(s.db_path, PathBuf::from("Banks.db"));
    }
}
