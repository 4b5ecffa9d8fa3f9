use std::path::PathBuf;

use indicatif::ProgressBar;
use tracing::{error, info, warn};

use crate::convert::convert;
use crate::db;
use crate::error::{EtlError, Stage, StageFailure};
use crate::export::write_csv;
use crate::extract::{extract, TableRule, EXPECTED_COLUMNS};
use crate::fetch::Fetcher;
use crate::progress::ProgressLog;
use crate::query::{run_query, MarketCapFilter, QueryResult};
use crate::rates::ExchangeRateTable;
use crate::settings::Settings;

const MSG_START: &str = "Preliminaries complete. Initiating ETL process";
const MSG_EXTRACTED: &str = "Data extraction complete. Initiating Transformation process";
const MSG_EMPTY: &str = "Extracted ranking table contained no data rows";
const MSG_TRANSFORMED: &str = "Data transformation complete. Initiating loading process";
const MSG_CSV: &str = "Data saved to CSV file";
const MSG_CONNECTED: &str = "SQL Connection initiated.";
const MSG_LOADED: &str = "Data loaded to Database as table. Running the query";
const MSG_DONE: &str = "Process Complete.";

/// What a completed run produced.
pub struct RunSummary {
    pub records: usize,
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub query: QueryResult,
}

/// fetch → extract → convert → write-file → write-db → query, strictly in order.
pub struct Pipeline<F: Fetcher> {
    settings: Settings,
    fetcher: F,
    log: ProgressLog,
    progress: ProgressBar,
}

impl<F: Fetcher> Pipeline<F> {
    pub fn new(settings: Settings, fetcher: F) -> Self {
        let log = ProgressLog::new(settings.log_path.clone());
        Pipeline {
            settings,
            fetcher,
            log,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        progress.set_length(Stage::ALL.len() as u64);
        self.progress = progress;
        self
    }

    /// Run every stage once. The first failing stage ends the run; outputs
    /// written by earlier stages are left in place.
    pub fn run(&self) -> Result<RunSummary, StageFailure> {
        let s = &self.settings;

        let markup = self.stage(Stage::Fetching, || {
            self.log.log(MSG_START)?;
            self.fetcher.fetch(&s.source_url)
        })?;

        let records = self.stage(Stage::Extracting, || {
            let rule = TableRule {
                name_header: s.name_header.clone(),
                value_header: s.value_header.clone(),
            };
            let records = extract(&markup, &EXPECTED_COLUMNS, &rule)?;
            if records.is_empty() {
                warn!("Ranking table at {} has no data rows", s.source_url);
                self.log.log(MSG_EMPTY)?;
            }
            self.log.log(MSG_EXTRACTED)?;
            Ok(records)
        })?;
        drop(markup);

        let dataset = self.stage(Stage::Converting, || {
            let rates = ExchangeRateTable::load(&s.rates_path)?;
            let dataset = convert(records, &rates)?;
            self.log.log(MSG_TRANSFORMED)?;
            Ok(dataset)
        })?;

        self.stage(Stage::WritingFile, || {
            write_csv(&s.csv_path, &dataset)?;
            self.log.log(MSG_CSV)
        })?;

        let conn = self.stage(Stage::WritingStore, || {
            let conn = db::connect(&s.db_path)?;
            self.log.log(MSG_CONNECTED)?;
            db::replace_table(&conn, &s.table_name, &dataset)?;
            self.log.log(MSG_LOADED)?;
            Ok(conn)
        })?;

        let query = self.stage(Stage::Querying, || {
            let filter = MarketCapFilter {
                min_usd: s.query_min_usd,
            };
            let result = run_query(&filter, &conn, &s.table_name)?;
            self.log.log(MSG_DONE)?;
            Ok(result)
        })?;
        drop(conn);

        self.progress.finish_and_clear();
        info!("Pipeline completed: {} records", dataset.len());

        Ok(RunSummary {
            records: dataset.len(),
            csv_path: s.csv_path.clone(),
            db_path: s.db_path.clone(),
            log_path: self.log.path().to_path_buf(),
            query,
        })
    }

    fn stage<T>(
        &self,
        stage: Stage,
        body: impl FnOnce() -> Result<T, EtlError>,
    ) -> Result<T, StageFailure> {
        self.progress.set_message(stage.label());
        match body() {
            Ok(value) => {
                self.progress.inc(1);
                Ok(value)
            }
            Err(error) => {
                self.progress.abandon_with_message(format!("failed at {}", stage));
                error!("Stage {} failed: {}", stage, error);
                Err(StageFailure { stage, error })
            }
        }
    }
}
