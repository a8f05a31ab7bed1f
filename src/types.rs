//src/types.rs

use std::fmt;

/// Default cut-off, in percent, below which a taxon is folded into "Other".
pub const DEFAULT_THRESHOLD_PCT: f64 = 1.0;
pub const DEFAULT_OTHER_SPECIES: &str = "Other species <1%";
pub const DEFAULT_OTHER_GENERA: &str = "Other genera <1%";

/// Taxonomic level an aggregation is run at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rank {
    Species,
    Genus,
}

impl Rank {
    pub const ALL: [Rank; 2] = [Rank::Species, Rank::Genus];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Species => "species",
            Rank::Genus => "genus",
        }
    }

    /// The label of `record` at this rank.
    ///
    /// The species tier keys on the species label alone; the genus a species
    /// belongs to is never consulted there.
    pub fn label_of<'a>(&self, record: &'a AbundanceRecord) -> &'a str {
        match self {
            Rank::Species => &record.species,
            Rank::Genus => &record.genus,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sample's table exactly as the file layer handed it over.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// The three fields kept out of a raw row, before a sample id is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRecord {
    pub abundance: f64,
    pub species: String,
    pub genus: String,
}

/// A projected row tagged with the sample it came from.
/// `abundance` is a fraction in [0, 1]; a sample's rows are expected to sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct AbundanceRecord {
    pub sample_id: String,
    pub species: String,
    pub genus: String,
    pub abundance: f64,
}

/// One (sample, taxon) cell of a single rank, in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub sample_id: String,
    pub taxon: String,
    pub abundance_pct: f64,
}

/// Sentinel names for the bucket of minor taxa, one per rank.
#[derive(Debug, Clone, PartialEq)]
pub struct OtherLabels {
    pub species: String,
    pub genus: String,
}

impl Default for OtherLabels {
    fn default() -> Self {
        Self {
            species: DEFAULT_OTHER_SPECIES.to_string(),
            genus: DEFAULT_OTHER_GENERA.to_string(),
        }
    }
}

/// Knobs for the rank aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationConfig {
    /// Percent cut-off; a (sample, taxon) sum strictly below it is rebucketed.
    pub threshold: f64,
    pub other_labels: OtherLabels,
}

impl AggregationConfig {
    pub fn other_label(&self, rank: Rank) -> &str {
        match rank {
            Rank::Species => &self.other_labels.species,
            Rank::Genus => &self.other_labels.genus,
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD_PCT,
            other_labels: OtherLabels::default(),
        }
    }
}

/// Settings for a full run through [`crate::build_abundance_tables`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub aggregation: AggregationConfig,
    /// Project samples on the rayon pool instead of one after another.
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aggregation: AggregationConfig::default(),
            parallel: true,
        }
    }
}
