use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bioindex::BioindexClient;
use crate::catalog::DatasetCatalog;
use crate::domain::{AssociationPage, AssociationTable, OutputRecord, PhenotypeSet, Rsid, VariantId};
use crate::error::FetchError;
use crate::ledger::{LedgerStatus, ResumeLedger};
use crate::select::select_best;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_processed: usize,
    pub skipped_failed: usize,
    pub started_at: String,
    pub finished_at: String,
    pub output: String,
    pub failed_path: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct Fetcher<C: BioindexClient> {
    client: C,
    catalog: DatasetCatalog,
}

impl<C: BioindexClient> Fetcher<C> {
    /// Loads the dataset catalog; failure here is fatal for the run.
    pub fn new(client: C) -> Result<Self, FetchError> {
        let catalog = client.dataset_catalog().map_err(|err| match err {
            FetchError::DatasetCatalog(_) => err,
            other => FetchError::DatasetCatalog(other.to_string()),
        })?;
        if catalog.is_empty() {
            warn!("dataset catalog is empty, every pmid will fall back to its dataset name");
        } else {
            info!(datasets = catalog.len(), "dataset catalog loaded");
        }
        Ok(Self { client, catalog })
    }

    pub fn process(
        &self,
        rsid: &Rsid,
        phenotypes: &PhenotypeSet,
    ) -> Result<OutputRecord, FetchError> {
        let variant = self.client.lookup_variant(rsid)?;
        debug!(rsid = rsid.as_str(), varid = variant.varid.as_str(), "variant resolved");
        let gene = self.client.nearest_gene(&variant)?;
        let table = self.association_table(&variant)?;
        let best = select_best(&table, phenotypes)?;
        let pmid = self.catalog.publication_id(&best.dataset);
        Ok(OutputRecord::new(rsid, &variant, &gene, &best, pmid))
    }

    fn association_table(&self, variant: &VariantId) -> Result<AssociationTable, FetchError> {
        match self.client.associations(variant)? {
            AssociationPage::Table(table) => Ok(table),
            AssociationPage::Token(token) => {
                debug!(varid = variant.varid.as_str(), "following continuation token");
                self.client.continuation(&token)
            }
        }
    }

    /// Processes `rsids` in order, skipping any the ledger already holds.
    ///
    /// Per-rsid failures are recorded in the ledger; only ledger write
    /// errors end the run early.
    pub fn run(
        &self,
        rsids: &[Rsid],
        phenotypes: &PhenotypeSet,
        ledger: &mut ResumeLedger,
        sink: &dyn ProgressSink,
    ) -> Result<RunSummary, FetchError> {
        let started_at = Utc::now();
        let total = rsids.len();
        let mut summary = RunSummary {
            total,
            succeeded: 0,
            failed: 0,
            skipped_processed: 0,
            skipped_failed: 0,
            started_at: started_at.to_rfc3339(),
            finished_at: String::new(),
            output: ledger.output_path().to_string(),
            failed_path: ledger.failed_path().to_string(),
        };

        for (index, rsid) in rsids.iter().enumerate() {
            match ledger.status(rsid) {
                LedgerStatus::Processed => {
                    summary.skipped_processed += 1;
                    sink.event(ProgressEvent {
                        message: format!("skipping processed rsid: {rsid}"),
                        elapsed: None,
                    });
                    continue;
                }
                LedgerStatus::Failed => {
                    summary.skipped_failed += 1;
                    sink.event(ProgressEvent {
                        message: format!("skipping previously failed rsid: {rsid}"),
                        elapsed: None,
                    });
                    continue;
                }
                LedgerStatus::Pending => {}
            }

            sink.event(ProgressEvent {
                message: format!("processing {}/{total} rsid: {rsid}", index + 1),
                elapsed: None,
            });
            let start = Instant::now();
            match self.process(rsid, phenotypes) {
                Ok(record) => {
                    ledger.record_success(&record)?;
                    summary.succeeded += 1;
                    sink.event(ProgressEvent {
                        message: format!(
                            "{rsid}: {} gene={} pvalue={} pmid={}",
                            record.varid, record.gene, record.pvalue, record.pmid
                        ),
                        elapsed: Some(start.elapsed()),
                    });
                }
                Err(err) => {
                    warn!(rsid = rsid.as_str(), error = %err, "rsid failed");
                    ledger.record_failure(rsid)?;
                    summary.failed += 1;
                    sink.event(ProgressEvent {
                        message: format!("error processing rsid {rsid}: {err}"),
                        elapsed: Some(start.elapsed()),
                    });
                }
            }
        }

        summary.finished_at = Utc::now().to_rfc3339();
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped_processed + summary.skipped_failed,
            "run finished"
        );
        Ok(summary)
    }
}
