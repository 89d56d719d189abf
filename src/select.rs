use std::cmp::Ordering;

use crate::domain::{AssociationRecord, BestAssociation, PhenotypeSet};
use crate::error::FetchError;

/// Minimum p-value among rows whose phenotype is in `phenotypes`.
///
/// Ties keep the earliest row. NaN p-values rank after every real value.
pub fn select_best(
    rows: &[AssociationRecord],
    phenotypes: &PhenotypeSet,
) -> Result<BestAssociation, FetchError> {
    let mut best: Option<&AssociationRecord> = None;
    for row in rows.iter().filter(|row| phenotypes.contains(&row.phenotype)) {
        let replace = match best {
            None => true,
            Some(current) => compare_p(row.p_value, current.p_value) == Ordering::Less,
        };
        if replace {
            best = Some(row);
        }
    }

    best.map(|row| BestAssociation {
        p_value: row.p_value,
        dataset: row.dataset.clone(),
    })
    .ok_or_else(|| FetchError::NoMatchingPhenotype(phenotypes.to_string()))
}

fn compare_p(left: f64, right: f64) -> Ordering {
    match (left.is_nan(), right.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
    }
}
