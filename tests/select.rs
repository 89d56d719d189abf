use assert_matches::assert_matches;

use bioindex_fetcher::domain::{AssociationRecord, PhenotypeSet};
use bioindex_fetcher::error::FetchError;
use bioindex_fetcher::select::select_best;

fn row(phenotype: &str, p_value: f64, dataset: &str) -> AssociationRecord {
    AssociationRecord {
        phenotype: phenotype.to_string(),
        p_value,
        dataset: dataset.to_string(),
    }
}

fn table() -> Vec<AssociationRecord> {
    vec![
        row("phenoA", 0.3, "ds1"),
        row("phenoA", 0.05, "ds2"),
        row("phenoB", 0.01, "ds3"),
    ]
}

#[test]
fn other_phenotypes_excluded() {
    let phenotypes: PhenotypeSet = "phenoA".parse().unwrap();
    let best = select_best(&table(), &phenotypes).unwrap();
    assert_eq!(best.p_value, 0.05);
    assert_eq!(best.dataset, "ds2");
}

#[test]
fn several_target_phenotypes() {
    let phenotypes: PhenotypeSet = "phenoA,phenoB".parse().unwrap();
    let best = select_best(&table(), &phenotypes).unwrap();
    assert_eq!(best.dataset, "ds3");
}

#[test]
fn no_matching_phenotype() {
    let phenotypes: PhenotypeSet = "phenoC".parse().unwrap();
    let err = select_best(&table(), &phenotypes).unwrap_err();
    assert_matches!(err, FetchError::NoMatchingPhenotype(_));
    assert!(err.is_per_rsid());
}

#[test]
fn empty_table() {
    let phenotypes: PhenotypeSet = "phenoA".parse().unwrap();
    let err = select_best(&[], &phenotypes).unwrap_err();
    assert_matches!(err, FetchError::NoMatchingPhenotype(_));
}
