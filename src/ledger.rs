use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{OutputRecord, Rsid};
use crate::error::FetchError;

pub const FAILED_HEADER: [&str; 1] = ["rsid"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerStatus {
    Pending,
    Processed,
    Failed,
}

/// Append-only record of outcomes, rebuilt from the two result files.
#[derive(Debug)]
pub struct ResumeLedger {
    output_path: Utf8PathBuf,
    failed_path: Utf8PathBuf,
    processed: HashSet<String>,
    failed: HashSet<String>,
}

impl ResumeLedger {
    /// Reads existing outcomes, creating either file with its header if absent.
    pub fn open(output_path: &Utf8Path, failed_path: &Utf8Path) -> Result<Self, FetchError> {
        let processed = load_rsids(output_path, &OutputRecord::HEADER)?;
        let failed = load_rsids(failed_path, &FAILED_HEADER)?;
        Ok(Self {
            output_path: output_path.to_path_buf(),
            failed_path: failed_path.to_path_buf(),
            processed,
            failed,
        })
    }

    pub fn output_path(&self) -> &Utf8Path {
        &self.output_path
    }

    pub fn failed_path(&self) -> &Utf8Path {
        &self.failed_path
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn status(&self, rsid: &Rsid) -> LedgerStatus {
        if self.processed.contains(rsid.as_str()) {
            LedgerStatus::Processed
        } else if self.failed.contains(rsid.as_str()) {
            LedgerStatus::Failed
        } else {
            LedgerStatus::Pending
        }
    }

    pub fn record_success(&mut self, record: &OutputRecord) -> Result<(), FetchError> {
        let mut writer = append_writer(&self.output_path)?;
        writer
            .serialize(record)
            .map_err(|err| ledger_error(&self.output_path, err))?;
        writer
            .flush()
            .map_err(|err| ledger_error(&self.output_path, err))?;
        self.processed.insert(record.rsid.clone());
        Ok(())
    }

    pub fn record_failure(&mut self, rsid: &Rsid) -> Result<(), FetchError> {
        let mut writer = append_writer(&self.failed_path)?;
        writer
            .write_record([rsid.as_str()])
            .map_err(|err| ledger_error(&self.failed_path, err))?;
        writer
            .flush()
            .map_err(|err| ledger_error(&self.failed_path, err))?;
        self.failed.insert(rsid.as_str().to_string());
        Ok(())
    }
}

pub fn read_rsid_list(path: &Utf8Path) -> Result<Vec<Rsid>, FetchError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|_| FetchError::InputRead(path.as_std_path().to_path_buf()))?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::parse)
        .collect()
}

fn load_rsids(path: &Utf8Path, header: &[&str]) -> Result<HashSet<String>, FetchError> {
    let bytes = match fs::read(path.as_std_path()) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(err) => return Err(ledger_error(path, err)),
    };

    if bytes.iter().all(|byte| byte.is_ascii_whitespace()) {
        write_header(path, header)?;
        return Ok(HashSet::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes.as_slice());
    let column = reader
        .headers()
        .map_err(|err| ledger_error(path, err))?
        .iter()
        .position(|name| name.trim() == "rsid")
        .ok_or_else(|| FetchError::Ledger(format!("{path}: no rsid column in header")))?;

    let mut rsids = HashSet::new();
    for record in reader.records() {
        let record = record.map_err(|err| ledger_error(path, err))?;
        if let Some(rsid) = record.get(column).map(str::trim).filter(|v| !v.is_empty()) {
            rsids.insert(rsid.to_string());
        }
    }

    if bytes.last() != Some(&b'\n') {
        let mut file = OpenOptions::new()
            .append(true)
            .open(path.as_std_path())
            .map_err(|err| ledger_error(path, err))?;
        file.write_all(b"\n").map_err(|err| ledger_error(path, err))?;
    }
    Ok(rsids)
}

fn write_header(path: &Utf8Path, header: &[&str]) -> Result<(), FetchError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
        fs::create_dir_all(parent.as_std_path()).map_err(|err| ledger_error(path, err))?;
    }
    let mut writer = csv::Writer::from_path(path.as_std_path()).map_err(|err| ledger_error(path, err))?;
    writer
        .write_record(header)
        .map_err(|err| ledger_error(path, err))?;
    writer.flush().map_err(|err| ledger_error(path, err))
}

fn append_writer(path: &Utf8Path) -> Result<csv::Writer<fs::File>, FetchError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_std_path())
        .map_err(|err| ledger_error(path, err))?;
    Ok(csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file))
}

fn ledger_error(path: &Utf8Path, err: impl std::fmt::Display) -> FetchError {
    FetchError::Ledger(format!("{path}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_skipped_in_rsid_list() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("rs.txt")).unwrap();
        fs::write(path.as_std_path(), "rs1\n\n  rs2 \n").unwrap();
        let rsids = read_rsid_list(&path).unwrap();
        let names: Vec<_> = rsids.iter().map(Rsid::as_str).collect();
        assert_eq!(names, vec!["rs1", "rs2"]);
    }

    #[test]
    fn missing_trailing_newline_repaired() {
        let temp = tempfile::tempdir().unwrap();
        let failed = Utf8PathBuf::from_path_buf(temp.path().join("failed.csv")).unwrap();
        let output = Utf8PathBuf::from_path_buf(temp.path().join("out.csv")).unwrap();
        fs::write(failed.as_std_path(), "rsid\nrs1").unwrap();

        let mut ledger = ResumeLedger::open(&output, &failed).unwrap();
        ledger.record_failure(&"rs2".parse().unwrap()).unwrap();

        let content = fs::read_to_string(failed.as_std_path()).unwrap();
        assert_eq!(content, "rsid\nrs1\nrs2\n");
    }
}
