//src/merge.rs

use ahash::AHashSet;

use crate::error::{AbundanceError, Result};
use crate::types::{AbundanceRecord, ProjectedRecord};

/// Concatenates every sample's projected rows into one sequence, tagging each
/// row with its sample id.
///
/// Samples come out in ascending id order whatever order they were supplied
/// in; rows inside a sample keep their original order.
pub fn merge_samples(samples: &[(String, Vec<ProjectedRecord>)]) -> Result<Vec<AbundanceRecord>> {
    if samples.is_empty() {
        return Err(AbundanceError::EmptyInput);
    }

    let mut seen: AHashSet<&str> = AHashSet::with_capacity(samples.len());
    for (sample_id, _) in samples {
        if !seen.insert(sample_id.as_str()) {
            return Err(AbundanceError::DuplicateSample(sample_id.clone()));
        }
    }

    let mut ordered: Vec<&(String, Vec<ProjectedRecord>)> = samples.iter().collect();
    ordered.sort_by(|a, b| a.0.cmp(&b.0));

    let total: usize = samples.iter().map(|(_, rows)| rows.len()).sum();
    let mut merged = Vec::with_capacity(total);
    for (sample_id, rows) in ordered {
        merged.extend(rows.iter().map(|row| AbundanceRecord {
            sample_id: sample_id.clone(),
            species: row.species.clone(),
            genus: row.genus.clone(),
            abundance: row.abundance,
        }));
    }

    log::info!("Merged {} rows", merged.len());
    Ok(merged)
}
