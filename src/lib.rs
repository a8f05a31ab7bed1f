// src/lib.rs
pub mod types;
pub mod error;
pub mod projection;
pub mod merge;
pub mod aggregate;
pub mod pivot;
pub mod tsv;

use std::path::Path;

pub use crate::error::{AbundanceError, Result};
pub use crate::pivot::PivotMatrix;
pub use crate::types::{
    AbundanceRecord, AggregatedRow, AggregationConfig, OtherLabels, PipelineConfig,
    ProjectedRecord, Rank, RawTable,
};

use crate::aggregate::aggregate_rank;
use crate::merge::merge_samples;
use crate::pivot::build_pivot;
use crate::projection::project_samples;
use crate::tsv::{discover_samples, load_samples, write_merged_csv, write_pivot_tsv, write_processed_tables};

pub const PROCESSED_DIR: &str = "processed_files";
pub const MERGED_CSV: &str = "merged.csv";
pub const SPECIES_PIVOT_TSV: &str = "species_abundance.tsv";
pub const GENUS_PIVOT_TSV: &str = "genus_abundance.tsv";

/// Everything one run produces, from projected rows to the two pivots.
pub struct AbundanceResults {
    /// Per-sample projected rows, in the order samples were supplied
    pub projected: Vec<(String, Vec<ProjectedRecord>)>,

    /// All samples' rows in sample id order
    pub merged: Vec<AbundanceRecord>,

    pub species_rows: Vec<AggregatedRow>,
    pub genus_rows: Vec<AggregatedRow>,

    /// The two matrices handed to a chart renderer
    pub species_pivot: PivotMatrix,
    pub genus_pivot: PivotMatrix,
}

impl AbundanceResults {
    pub fn pivot(&self, rank: Rank) -> &PivotMatrix {
        match rank {
            Rank::Species => &self.species_pivot,
            Rank::Genus => &self.genus_pivot,
        }
    }

    pub fn rows(&self, rank: Rank) -> &[AggregatedRow] {
        match rank {
            Rank::Species => &self.species_rows,
            Rank::Genus => &self.genus_rows,
        }
    }
}

/// Runs project -> merge -> aggregate -> pivot over tables already in memory.
pub fn build_abundance_tables(
    samples: &[(String, RawTable)],
    config: &PipelineConfig,
) -> Result<AbundanceResults> {
    // 1. Project every sample down to abundance/species/genus
    let projected = project_samples(samples, config.parallel)?;

    // 2. Merge into one long table
    let merged = merge_samples(&projected)?;

    // 3. Aggregate per rank
    let species_rows = aggregate_rank(&merged, Rank::Species, &config.aggregation);
    let genus_rows = aggregate_rank(&merged, Rank::Genus, &config.aggregation);

    // 4. Pivot
    let species_pivot = build_pivot(&species_rows, Rank::Species)?;
    let genus_pivot = build_pivot(&genus_rows, Rank::Genus)?;

    Ok(AbundanceResults {
        projected,
        merged,
        species_rows,
        genus_rows,
        species_pivot,
        genus_pivot,
    })
}

/// Full on-disk run: discover `<input_dir>/<barcode>/*.tsv`, build the
/// tables, and write processed, merged and pivot files under `output_dir`.
pub fn process_emu_folder(
    input_dir: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<AbundanceResults> {
    let sources = discover_samples(input_dir)?;
    let samples = load_samples(&sources)?;
    let results = build_abundance_tables(&samples, config)?;
    write_abundance_tables(output_dir, &results)?;
    Ok(results)
}

/// Writes every artifact of `results` under `output_dir`.
pub fn write_abundance_tables(output_dir: &Path, results: &AbundanceResults) -> Result<()> {
    std::fs::create_dir_all(output_dir).map_err(|source| AbundanceError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    write_processed_tables(&output_dir.join(PROCESSED_DIR), &results.projected)?;
    write_merged_csv(&output_dir.join(MERGED_CSV), &results.merged)?;
    write_pivot_tsv(&output_dir.join(SPECIES_PIVOT_TSV), &results.species_pivot)?;
    write_pivot_tsv(&output_dir.join(GENUS_PIVOT_TSV), &results.genus_pivot)?;
    Ok(())
}
