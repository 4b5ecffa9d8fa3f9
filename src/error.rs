use std::fmt;

use thiserror::Error;

/// Failure classes of a pipeline run. Every one of them is fatal.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("extraction: {0}")]
    Extraction(String),

    #[error("conversion: {0}")]
    Conversion(String),

    #[error("persist {target}: {reason}")]
    Persistence { target: String, reason: String },

    #[error("query: {0}")]
    Query(String),

    #[error("config: {0}")]
    Config(String),
}

impl EtlError {
    pub fn persistence(target: impl fmt::Display, reason: impl fmt::Display) -> Self {
        EtlError::Persistence {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = EtlError> = std::result::Result<T, E>;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Extracting,
    Converting,
    WritingFile,
    WritingStore,
    Querying,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Fetching,
        Stage::Extracting,
        Stage::Converting,
        Stage::WritingFile,
        Stage::WritingStore,
        Stage::Querying,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Fetching => "fetch",
            Stage::Extracting => "extract",
            Stage::Converting => "convert",
            Stage::WritingFile => "write-file",
            Stage::WritingStore => "write-db",
            Stage::Querying => "query",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal `Failed(stage)` state of a run.
///
/// A progress-log write that fails is reported against the stage that was
/// writing the line, as a `Persistence` error naming the log file. The first
/// such write happens inside `Fetching`, so an unwritable log stops the run
/// before any output is touched.
#[derive(Debug, Error)]
#[error("failed at stage {stage}: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: EtlError,
}
