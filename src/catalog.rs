use std::collections::HashMap;

use serde_json::Value;

use crate::error::FetchError;

/// Portal dataset listing keyed by dataset name, with normalised PMIDs.
#[derive(Debug, Clone, Default)]
pub struct DatasetCatalog {
    pmids: HashMap<String, Option<String>>,
}

impl DatasetCatalog {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<String>)>,
        S: Into<String>,
    {
        let mut pmids = HashMap::new();
        for (name, pmid) in entries {
            pmids.entry(name.into()).or_insert(pmid);
        }
        Self { pmids }
    }

    pub fn from_json(raw: &Value) -> Result<Self, FetchError> {
        let rows = raw
            .get("data")
            .and_then(|data| data.as_array())
            .ok_or_else(|| FetchError::malformed("portal/datasets", "missing data array"))?;

        let mut pmids = HashMap::new();
        for row in rows {
            let Some(name) = row.get("name").and_then(|name| name.as_str()) else {
                continue;
            };
            pmids
                .entry(name.to_string())
                .or_insert_with(|| row.get("pmid").and_then(normalize_pmid));
        }
        Ok(Self { pmids })
    }

    pub fn len(&self) -> usize {
        self.pmids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pmids.is_empty()
    }

    /// PMID for `dataset`, or the dataset name itself when none is known.
    pub fn publication_id(&self, dataset: &str) -> String {
        match self.pmids.get(dataset) {
            Some(Some(pmid)) => pmid.clone(),
            _ => dataset.to_string(),
        }
    }
}

fn normalize_pmid(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Some(int.to_string())
            } else {
                number.as_f64().map(format_integral)
            }
        }
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            match text.parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => Some(format_integral(parsed)),
                _ => Some(text.to_string()),
            }
        }
        _ => None,
    }
}

fn format_integral(value: f64) -> String {
    format!("{}", value.trunc() as i64)
}
