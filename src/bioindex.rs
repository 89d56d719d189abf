use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, ORIGIN, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::catalog::DatasetCatalog;
use crate::config::FetcherConfig;
use crate::domain::{
    AssociationPage, AssociationRecord, AssociationTable, NearestGene, Rsid, VariantId,
};
use crate::error::FetchError;

const VARID_LOOKUP: &str = "varIdLookup";
const VARIANT_QUERY: &str = "query/variant";
const ASSOCIATION_QUERY: &str = "query/variant-dataset-associations";
const CONTINUATION: &str = "cont";
const PORTAL_DATASETS: &str = "portal/datasets";

/// The five BioIndex lookups the pipeline depends on.
pub trait BioindexClient {
    fn dataset_catalog(&self) -> Result<DatasetCatalog, FetchError>;
    fn lookup_variant(&self, rsid: &Rsid) -> Result<VariantId, FetchError>;
    fn nearest_gene(&self, variant: &VariantId) -> Result<NearestGene, FetchError>;
    fn associations(&self, variant: &VariantId) -> Result<AssociationPage, FetchError>;
    fn continuation(&self, token: &str) -> Result<AssociationTable, FetchError>;
}

pub struct BioindexHttpClient {
    client: Client,
    base_url: String,
    inline_count_threshold: u64,
}

impl BioindexHttpClient {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("bioindex-fetcher/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| FetchError::BioindexHttp(err.to_string()))?,
        );
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(&config.origin)
                .map_err(|err| FetchError::ConfigParse(format!("origin: {err}")))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| FetchError::BioindexHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            inline_count_threshold: config.inline_count_threshold,
        })
    }

    pub fn datasets_url(base_url: &str) -> Result<Url, FetchError> {
        Url::parse_with_params(&format!("{base_url}/api/{PORTAL_DATASETS}"), &[("q", "a2f")])
            .map_err(|err| FetchError::BioindexHttp(err.to_string()))
    }

    pub fn varid_lookup_url(base_url: &str, rsid: &Rsid) -> String {
        format!("{base_url}/api/bio/{VARID_LOOKUP}/{}", rsid.as_str())
    }

    pub fn variant_url(base_url: &str, variant: &VariantId) -> String {
        format!("{base_url}/api/bio/{VARIANT_QUERY}?q={}", variant.encoded)
    }

    pub fn associations_url(base_url: &str, variant: &VariantId) -> String {
        format!("{base_url}/api/bio/{ASSOCIATION_QUERY}?q={}", variant.encoded)
    }

    pub fn continuation_url(base_url: &str, token: &str) -> Result<Url, FetchError> {
        Url::parse_with_params(&format!("{base_url}/api/bio/{CONTINUATION}"), &[("token", token)])
            .map_err(|err| FetchError::BioindexHttp(err.to_string()))
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, FetchError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "BioIndex request failed".to_string());
        Err(FetchError::BioindexStatus { status, message })
    }

    fn get_json(
        &self,
        endpoint: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<Value, FetchError> {
        let start = std::time::Instant::now();
        let response = request
            .send()
            .map_err(|err| FetchError::BioindexHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let raw: Value = response
            .json()
            .map_err(|err| FetchError::malformed(endpoint, err.to_string()))?;
        debug!(
            endpoint,
            latency_ms = start.elapsed().as_millis() as u64,
            "bioindex.response"
        );
        Ok(raw)
    }
}

impl BioindexClient for BioindexHttpClient {
    fn dataset_catalog(&self) -> Result<DatasetCatalog, FetchError> {
        let url = Self::datasets_url(&self.base_url)
            .map_err(|err| FetchError::DatasetCatalog(err.to_string()))?;
        let raw = self
            .get_json(PORTAL_DATASETS, self.client.get(url))
            .map_err(|err| FetchError::DatasetCatalog(err.to_string()))?;
        DatasetCatalog::from_json(&raw).map_err(|err| FetchError::DatasetCatalog(err.to_string()))
    }

    fn lookup_variant(&self, rsid: &Rsid) -> Result<VariantId, FetchError> {
        let url = Self::varid_lookup_url(&self.base_url, rsid);
        let raw = self.get_json(VARID_LOOKUP, self.client.get(&url))?;
        parse_varid(&raw)
    }

    fn nearest_gene(&self, variant: &VariantId) -> Result<NearestGene, FetchError> {
        let url = Self::variant_url(&self.base_url, variant);
        let raw = self.get_json(VARIANT_QUERY, self.client.get(&url))?;
        parse_nearest_gene(&raw)
    }

    fn associations(&self, variant: &VariantId) -> Result<AssociationPage, FetchError> {
        let url = Self::associations_url(&self.base_url, variant);
        let raw = self.get_json(ASSOCIATION_QUERY, self.client.get(&url))?;
        parse_association_page(&raw, self.inline_count_threshold)
    }

    fn continuation(&self, token: &str) -> Result<AssociationTable, FetchError> {
        let url = Self::continuation_url(&self.base_url, token)?;
        let raw = self.get_json(CONTINUATION, self.client.get(url))?;
        parse_association_table(&raw, CONTINUATION)
    }
}

pub fn parse_varid(raw: &Value) -> Result<VariantId, FetchError> {
    let varid = raw
        .get("data")
        .and_then(|data| data.get("varid"))
        .and_then(|value| value.as_str())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| FetchError::malformed(VARID_LOOKUP, "missing data.varid"))?;
    Ok(VariantId::new(varid))
}

pub fn parse_nearest_gene(raw: &Value) -> Result<NearestGene, FetchError> {
    let record = raw
        .get("data")
        .and_then(|data| data.as_array())
        .and_then(|rows| rows.first())
        .ok_or_else(|| FetchError::malformed(VARIANT_QUERY, "no variant record in data"))?;
    match record.get("nearest") {
        Some(Value::Null) | None => Err(FetchError::malformed(
            VARIANT_QUERY,
            "variant record has no nearest gene",
        )),
        Some(nearest) => Ok(NearestGene(nearest.clone())),
    }
}

/// Inline rows win when there is no token or when `count` exceeds the
/// threshold; otherwise the token is handed back for a follow-up fetch.
pub fn parse_association_page(
    raw: &Value,
    inline_count_threshold: u64,
) -> Result<AssociationPage, FetchError> {
    let token = match raw.get("continuation") {
        None | Some(Value::Null) => None,
        Some(Value::String(token)) => Some(token.clone()),
        Some(other) => {
            return Err(FetchError::malformed(
                ASSOCIATION_QUERY,
                format!("unexpected continuation value {other}"),
            ));
        }
    };
    let over_threshold = raw
        .get("count")
        .and_then(|count| count.as_f64())
        .is_some_and(|count| count > inline_count_threshold as f64);

    match token {
        Some(token) if !over_threshold => Ok(AssociationPage::Token(token)),
        _ => Ok(AssociationPage::Table(parse_association_table(
            raw,
            ASSOCIATION_QUERY,
        )?)),
    }
}

#[derive(Debug, Deserialize)]
struct AssociationRow {
    phenotype: Option<String>,
    #[serde(rename = "pValue")]
    p_value: Option<f64>,
    dataset: Option<String>,
}

/// Rows without a phenotype or dataset are dropped; a null p-value is
/// kept as NaN so it ranks last.
pub fn parse_association_table(
    raw: &Value,
    endpoint: &str,
) -> Result<AssociationTable, FetchError> {
    let data = raw
        .get("data")
        .filter(|data| data.is_array())
        .ok_or_else(|| FetchError::malformed(endpoint, "missing data array"))?;
    let rows: Vec<AssociationRow> = serde_json::from_value(data.clone())
        .map_err(|err| FetchError::malformed(endpoint, err.to_string()))?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            Some(AssociationRecord {
                phenotype: row.phenotype?,
                p_value: row.p_value.unwrap_or(f64::NAN),
                dataset: row.dataset?,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn row(phenotype: &str, p_value: f64, dataset: &str) -> Value {
        json!({"phenotype": phenotype, "pValue": p_value, "dataset": dataset, "beta": 0.1})
    }

    #[test]
    fn varid_lookup() {
        let raw = json!({"data": {"varid": "10:114758349:C:T", "rsid": "rs7903146"}});
        let variant = parse_varid(&raw).unwrap();
        assert_eq!(variant.encoded, "10%3A114758349%3AC%3AT");
    }

    #[test]
    fn varid_missing() {
        let err = parse_varid(&json!({"data": null})).unwrap_err();
        assert_matches!(err, FetchError::MalformedResponse { .. });
    }

    #[test]
    fn nearest_gene_kept_raw() {
        let raw = json!({"data": [{"nearest": ["TCF7L2"], "varId": "x"}]});
        assert_eq!(parse_nearest_gene(&raw).unwrap(), NearestGene(json!(["TCF7L2"])));
    }

    #[test]
    fn nearest_gene_empty_data() {
        let err = parse_nearest_gene(&json!({"data": []})).unwrap_err();
        assert_matches!(err, FetchError::MalformedResponse { .. });
    }

    #[test]
    fn no_token_returns_inline_rows() {
        let rows: Vec<Value> = (0..3).map(|i| row("T2D", 0.1 * (i + 1) as f64, "ds")).collect();
        let raw = json!({"data": rows, "continuation": null, "count": 3});
        let page = parse_association_page(&raw, 10).unwrap();
        assert_matches!(page, AssociationPage::Table(rows) if rows.len() == 3);
    }

    #[test]
    fn token_with_small_count_is_followed() {
        let raw = json!({"data": [], "continuation": "abc", "count": 10});
        let page = parse_association_page(&raw, 10).unwrap();
        assert_eq!(page, AssociationPage::Token("abc".to_string()));
    }

    #[test]
    fn token_with_large_count_uses_inline_rows() {
        let raw = json!({"data": [row("T2D", 0.2, "ds")], "continuation": "abc", "count": 11});
        let page = parse_association_page(&raw, 10).unwrap();
        assert_matches!(page, AssociationPage::Table(rows) if rows.len() == 1);
    }

    #[test]
    fn null_pvalue_kept_as_nan() {
        let raw = json!({"data": [{"phenotype": "T2D", "pValue": null, "dataset": "ds"}]});
        let rows = parse_association_table(&raw, CONTINUATION).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].p_value.is_nan());
    }

    #[test]
    fn rows_without_phenotype_or_dataset_dropped() {
        let raw = json!({"data": [
            {"phenotype": null, "pValue": 0.1, "dataset": "ds"},
            {"phenotype": "T2D", "pValue": 0.2},
            row("T2D", 0.3, "ds")
        ]});
        let rows = parse_association_table(&raw, CONTINUATION).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].p_value, 0.3);
    }

    #[test]
    fn data_not_an_array() {
        let err = parse_association_table(&json!({"data": {}}), CONTINUATION).unwrap_err();
        assert_matches!(err, FetchError::MalformedResponse { .. });
    }

    #[test]
    fn endpoint_urls() {
        let base = "https://bioindex.hugeamp.org";
        let rsid: Rsid = "rs7903146".parse().unwrap();
        let variant = VariantId::new("10:114758349:C:T");
        assert_eq!(
            BioindexHttpClient::varid_lookup_url(base, &rsid),
            "https://bioindex.hugeamp.org/api/bio/varIdLookup/rs7903146"
        );
        assert_eq!(
            BioindexHttpClient::variant_url(base, &variant),
            "https://bioindex.hugeamp.org/api/bio/query/variant?q=10%3A114758349%3AC%3AT"
        );
        assert_eq!(
            BioindexHttpClient::associations_url(base, &variant),
            "https://bioindex.hugeamp.org/api/bio/query/variant-dataset-associations?q=10%3A114758349%3AC%3AT"
        );
        assert_eq!(
            BioindexHttpClient::continuation_url(base, "ab+c/=").unwrap().as_str(),
            "https://bioindex.hugeamp.org/api/bio/cont?token=ab%2Bc%2F%3D"
        );
        assert_eq!(
            BioindexHttpClient::datasets_url(base).unwrap().as_str(),
            "https://bioindex.hugeamp.org/api/portal/datasets?q=a2f"
        );
    }
}
