use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FetchError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rsid(String);

impl Rsid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Rsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Rsid {
    type Err = FetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(FetchError::InvalidRsid(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Canonical BioIndex variant id together with its query-safe form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantId {
    pub varid: String,
    pub encoded: String,
}

impl VariantId {
    pub fn new(varid: impl Into<String>) -> Self {
        let varid = varid.into();
        let encoded = varid.replace(':', "%3A");
        Self { varid, encoded }
    }
}

/// The `nearest` field of a variant record, kept exactly as the API sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NearestGene(pub Value);

impl fmt::Display for NearestGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render_value(&self.0))
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(";"),
        other => other.to_string(),
    }
}

/// Target phenotypes parsed from a comma-separated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhenotypeSet(Vec<String>);

impl PhenotypeSet {
    pub fn contains(&self, phenotype: &str) -> bool {
        self.0.iter().any(|candidate| candidate == phenotype)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for PhenotypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

impl FromStr for PhenotypeSet {
    type Err = FetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut phenotypes = Vec::new();
        for part in value.split(',') {
            let part = part.trim();
            if !part.is_empty() && !phenotypes.iter().any(|p: &String| p == part) {
                phenotypes.push(part.to_string());
            }
        }
        if phenotypes.is_empty() {
            return Err(FetchError::InvalidPhenotypes(value.to_string()));
        }
        Ok(Self(phenotypes))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationRecord {
    pub phenotype: String,
    #[serde(rename = "pValue")]
    pub p_value: f64,
    pub dataset: String,
}

pub type AssociationTable = Vec<AssociationRecord>;

/// Result of the association query: either the rows themselves or a
/// continuation token to fetch them with.
#[derive(Debug, Clone, PartialEq)]
pub enum AssociationPage {
    Token(String),
    Table(AssociationTable),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestAssociation {
    pub p_value: f64,
    pub dataset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub rsid: String,
    pub varid: String,
    pub gene: String,
    pub pvalue: String,
    pub pmid: String,
}

impl OutputRecord {
    pub const HEADER: [&'static str; 5] = ["rsid", "varid", "gene", "pvalue", "pmid"];

    pub fn new(
        rsid: &Rsid,
        variant: &VariantId,
        gene: &NearestGene,
        best: &BestAssociation,
        pmid: String,
    ) -> Self {
        Self {
            rsid: rsid.as_str().to_string(),
            varid: variant.varid.clone(),
            gene: gene.to_string(),
            pvalue: format_pvalue(best.p_value),
            pmid,
        }
    }
}

/// Plain decimal down to 1e-4, scientific notation below that with an
/// exponent of at least two digits (`5e-08`).
pub fn format_pvalue(value: f64) -> String {
    if value != 0.0 && value.is_finite() && value.abs() < 1e-4 {
        let text = format!("{value:e}");
        match text.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => text,
        }
    } else {
        format!("{value}")
    }
}
