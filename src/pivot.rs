//src/pivot.rs

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{AbundanceError, Result};
use crate::types::{AggregatedRow, Rank};

/// Dense sample x taxon table of one rank, in percent.
///
/// Every sample row holds a value for every taxon seen in any sample;
/// combinations that were never observed read as 0.0. Samples and taxa are
/// both in ascending order. There are no mutating methods.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotMatrix {
    rank: Rank,
    taxa: Vec<String>,
    rows: BTreeMap<String, BTreeMap<String, f64>>,
}

impl PivotMatrix {
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Column labels.
    pub fn taxa(&self) -> &[String] {
        &self.taxa
    }

    /// Row labels.
    pub fn samples(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.keys().map(String::as_str)
    }

    /// Number of samples (rows).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, sample_id: &str) -> Option<&BTreeMap<String, f64>> {
        self.rows.get(sample_id)
    }

    pub fn get(&self, sample_id: &str, taxon: &str) -> Option<f64> {
        self.rows.get(sample_id)?.get(taxon).copied()
    }

    pub fn row_total(&self, sample_id: &str) -> Option<f64> {
        self.rows.get(sample_id).map(|row| row.values().sum())
    }

    /// One value per sample, in sample order: the series a stacked bar
    /// chart draws for `taxon`.
    pub fn column(&self, taxon: &str) -> Option<Vec<f64>> {
        if !self.taxa.iter().any(|t| t == taxon) {
            return None;
        }
        Some(
            self.rows
                .values()
                .map(|row| row.get(taxon).copied().unwrap_or(0.0))
                .collect(),
        )
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, f64>)> + '_ {
        self.rows.iter().map(|(sample_id, row)| (sample_id.as_str(), row))
    }
}

/// Reshapes one rank's aggregated rows into a [`PivotMatrix`].
///
/// The column set is the union of taxa over all samples. Each sample row is
/// zero-filled across that set before its observed values go in. Should the
/// same (sample, taxon) pair appear more than once, the values are summed.
pub fn build_pivot(rows: &[AggregatedRow], rank: Rank) -> Result<PivotMatrix> {
    if rows.is_empty() {
        return Err(AbundanceError::EmptyAggregation { rank });
    }

    let taxa: BTreeSet<&str> = rows.iter().map(|r| r.taxon.as_str()).collect();
    let samples: BTreeSet<&str> = rows.iter().map(|r| r.sample_id.as_str()).collect();

    let blank: BTreeMap<String, f64> = taxa.iter().map(|t| (t.to_string(), 0.0)).collect();
    let mut matrix: BTreeMap<String, BTreeMap<String, f64>> = samples
        .iter()
        .map(|s| (s.to_string(), blank.clone()))
        .collect();

    for row in rows {
        if let Some(cell) = matrix
            .get_mut(row.sample_id.as_str())
            .and_then(|cols| cols.get_mut(row.taxon.as_str()))
        {
            *cell += row.abundance_pct;
        }
    }

    log::info!(
        "Built {} pivot: {} samples x {} taxa",
        rank,
        matrix.len(),
        taxa.len()
    );

    Ok(PivotMatrix {
        rank,
        taxa: taxa.into_iter().map(str::to_string).collect(),
        rows: matrix,
    })
}
