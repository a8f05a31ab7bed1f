//src/projection.rs

use ahash::AHashMap;
use rayon::prelude::*;

use crate::error::{AbundanceError, Result};
use crate::types::{ProjectedRecord, RawTable};

pub const ABUNDANCE_FIELD: &str = "abundance";
pub const SPECIES_FIELD: &str = "species";
pub const GENUS_FIELD: &str = "genus";

/// Column positions of the three fields we keep.
struct FieldIndex {
    abundance: usize,
    species: usize,
    genus: usize,
}

impl FieldIndex {
    fn from_headers(sample_id: &str, headers: &[String]) -> Result<Self> {
        // First occurrence wins if a header is repeated
        let mut positions: AHashMap<&str, usize> = AHashMap::with_capacity(headers.len());
        for (i, name) in headers.iter().enumerate() {
            positions.entry(name.trim()).or_insert(i);
        }

        let lookup = |field: &'static str| {
            positions
                .get(field)
                .copied()
                .ok_or_else(|| AbundanceError::MissingField {
                    sample_id: sample_id.to_string(),
                    row: 0,
                    field,
                })
        };

        Ok(Self {
            abundance: lookup(ABUNDANCE_FIELD)?,
            species: lookup(SPECIES_FIELD)?,
            genus: lookup(GENUS_FIELD)?,
        })
    }
}

/// Pulls a non-empty cell, or reports which field of which row is missing.
fn required_cell<'a>(
    sample_id: &str,
    row_number: usize,
    row: &'a [String],
    col: usize,
    field: &'static str,
) -> Result<&'a str> {
    match row.get(col).map(|cell| cell.trim()) {
        Some(cell) if !cell.is_empty() => Ok(cell),
        _ => Err(AbundanceError::MissingField {
            sample_id: sample_id.to_string(),
            row: row_number,
            field,
        }),
    }
}

/// Keeps `abundance`, `species` and `genus` from every row of one sample's
/// table and drops every other column.
///
/// A column missing from the header, or an empty cell in one of the three
/// columns, is an error; nothing is defaulted. So is an abundance that is
/// NaN, infinite or negative.
pub fn project_sample(sample_id: &str, table: &RawTable) -> Result<Vec<ProjectedRecord>> {
    let index = FieldIndex::from_headers(sample_id, &table.headers)?;
    let mut records = Vec::with_capacity(table.rows.len());

    for (i, row) in table.rows.iter().enumerate() {
        let row_number = i + 1;
        let abundance_str = required_cell(sample_id, row_number, row, index.abundance, ABUNDANCE_FIELD)?;
        let species = required_cell(sample_id, row_number, row, index.species, SPECIES_FIELD)?;
        let genus = required_cell(sample_id, row_number, row, index.genus, GENUS_FIELD)?;

        let abundance: f64 = abundance_str.parse().map_err(|source| AbundanceError::InvalidAbundance {
            sample_id: sample_id.to_string(),
            row: row_number,
            value: abundance_str.to_string(),
            source,
        })?;
        if !abundance.is_finite() || abundance < 0.0 {
            return Err(AbundanceError::AbundanceOutOfRange {
                sample_id: sample_id.to_string(),
                row: row_number,
                value: abundance_str.to_string(),
            });
        }

        records.push(ProjectedRecord {
            abundance,
            species: species.to_string(),
            genus: genus.to_string(),
        });
    }

    log::debug!("Projected {} rows for sample {}", records.len(), sample_id);
    Ok(records)
}

/// Projects every sample, optionally on the rayon pool.
///
/// Output order matches input order either way; the first failing sample
/// in input order is the one reported.
pub fn project_samples(
    samples: &[(String, RawTable)],
    parallel: bool,
) -> Result<Vec<(String, Vec<ProjectedRecord>)>> {
    let project = |(sample_id, table): &(String, RawTable)| {
        project_sample(sample_id, table).map(|records| (sample_id.clone(), records))
    };

    if parallel {
        // Collect every outcome first so the reported error does not depend on thread timing
        let outcomes: Vec<Result<(String, Vec<ProjectedRecord>)>> =
            samples.par_iter().map(project).collect();
        outcomes.into_iter().collect()
    } else {
        samples.iter().map(project).collect()
    }
}
