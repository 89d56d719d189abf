use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("invalid rsid: {0:?}")]
    InvalidRsid(String),

    #[error("no phenotypes given in {0:?}")]
    InvalidPhenotypes(String),

    #[error("failed to read rsid list at {0}")]
    InputRead(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("BioIndex request failed: {0}")]
    BioindexHttp(String),

    #[error("BioIndex returned status {status}: {message}")]
    BioindexStatus { status: u16, message: String },

    #[error("malformed response from {endpoint}: {detail}")]
    MalformedResponse { endpoint: String, detail: String },

    #[error("no association rows match phenotypes {0}")]
    NoMatchingPhenotype(String),

    #[error("failed to load dataset catalog: {0}")]
    #[diagnostic(help("the catalog is required before any rsid can be processed"))]
    DatasetCatalog(String),

    #[error("result file error: {0}")]
    Ledger(String),
}

impl FetchError {
    /// Errors that abort a single rsid rather than the whole run.
    pub fn is_per_rsid(&self) -> bool {
        matches!(
            self,
            FetchError::BioindexHttp(_)
                | FetchError::BioindexStatus { .. }
                | FetchError::MalformedResponse { .. }
                | FetchError::NoMatchingPhenotype(_)
        )
    }

    pub(crate) fn malformed(endpoint: &str, detail: impl Into<String>) -> Self {
        FetchError::MalformedResponse {
            endpoint: endpoint.to_string(),
            detail: detail.into(),
        }
    }
}
