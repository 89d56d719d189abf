use std::fs;

use assert_matches::assert_matches;
use serde_json::{Value, json};

use bioindex_fetcher::bioindex::{parse_association_page, parse_nearest_gene};
use bioindex_fetcher::domain::{AssociationPage, NearestGene};
use bioindex_fetcher::select::select_best;

fn load(name: &str) -> Value {
    let raw = fs::read_to_string(format!("tests/fixtures/{name}")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn nearest_gene_from_variant_query() {
    let gene = parse_nearest_gene(&load("variant.json")).unwrap();
    assert_eq!(gene, NearestGene(json!(["TCF7L2"])));
    assert_eq!(gene.to_string(), "TCF7L2");
}

#[test]
fn inline_associations_without_token() {
    let page = parse_association_page(&load("variant_dataset_associations.json"), 10).unwrap();
    let AssociationPage::Table(rows) = page else {
        panic!("expected inline table");
    };
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1].dataset, "GWAS_UKBB_eu");
    assert_eq!(rows[1].p_value, 1.2e-40);
}

#[test]
fn missing_continuation_means_inline() {
    let raw = json!({"data": [], "count": 0});
    let page = parse_association_page(&raw, 10).unwrap();
    assert_eq!(page, AssociationPage::Table(Vec::new()));
}

#[test]
fn threshold_is_configurable() {
    let raw = json!({"data": [], "continuation": "tok", "count": 5});
    assert_matches!(parse_association_page(&raw, 10).unwrap(), AssociationPage::Token(_));
    assert_matches!(parse_association_page(&raw, 4).unwrap(), AssociationPage::Table(_));
}

#[test]
fn null_pvalue_in_other_phenotype_does_not_fail_selection() {
    let raw = json!({
        "continuation": null,
        "count": 2,
        "data": [
            {"phenotype": "T2D", "pValue": 0.01, "dataset": "ds1"},
            {"phenotype": "BMI", "pValue": null, "dataset": "ds2"}
        ]
    });
    let AssociationPage::Table(rows) = parse_association_page(&raw, 10).unwrap() else {
        panic!("expected inline table");
    };
    let best = select_best(&rows, &"T2D".parse().unwrap()).unwrap();
    assert_eq!(best.p_value, 0.01);
    assert_eq!(best.dataset, "ds1");
}

#[test]
fn null_pvalue_ranks_after_real_values() {
    let raw = json!({
        "data": [
            {"phenotype": "T2D", "pValue": null, "dataset": "ds1"},
            {"phenotype": "T2D", "pValue": 0.2, "dataset": "ds2"}
        ]
    });
    let AssociationPage::Table(rows) = parse_association_page(&raw, 10).unwrap() else {
        panic!("expected inline table");
    };
    let best = select_best(&rows, &"T2D".parse().unwrap()).unwrap();
    assert_eq!(best.dataset, "ds2");
}
