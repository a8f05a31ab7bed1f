//src/aggregate.rs

use std::collections::BTreeMap;

use crate::types::{AbundanceRecord, AggregatedRow, AggregationConfig, Rank};

/// (sample_id, taxon) -> summed percent. BTreeMap keeps output sorted by
/// sample then taxon.
type Groups<'a> = BTreeMap<(&'a str, &'a str), f64>;

fn group_sum<'a, I>(cells: I) -> Groups<'a>
where
    I: IntoIterator<Item = (&'a str, &'a str, f64)>,
{
    let mut groups = Groups::new();
    for (sample_id, taxon, pct) in cells {
        *groups.entry((sample_id, taxon)).or_insert(0.0) += pct;
    }
    groups
}

/// Renames every group strictly below `threshold` to `other` and sums again,
/// so all minor taxa of one sample end up in a single row.
fn fold_minor_taxa<'a>(groups: Groups<'a>, threshold: f64, other: &'a str) -> Groups<'a> {
    let mut rebucketed = 0usize;
    let regrouped = group_sum(groups.into_iter().map(|((sample_id, taxon), pct)| {
        if pct < threshold {
            rebucketed += 1;
            (sample_id, other, pct)
        } else {
            (sample_id, taxon, pct)
        }
    }));
    log::debug!("Folded {} groups below {}% into `{}`", rebucketed, threshold, other);
    regrouped
}

fn into_rows(groups: Groups<'_>) -> Vec<AggregatedRow> {
    groups
        .into_iter()
        .map(|((sample_id, taxon), abundance_pct)| AggregatedRow {
            sample_id: sample_id.to_string(),
            taxon: taxon.to_string(),
            abundance_pct,
        })
        .collect()
}

/// Sums merged records per (sample, taxon) at `rank`, in percent, and folds
/// taxa below the configured threshold into the rank's "Other" row.
///
/// The threshold is applied to the per-sample sum, never to single raw rows.
/// A taxon exactly at the threshold keeps its own label.
pub fn aggregate_rank(
    records: &[AbundanceRecord],
    rank: Rank,
    config: &AggregationConfig,
) -> Vec<AggregatedRow> {
    // Pass 1
    let groups = group_sum(
        records
            .iter()
            .map(|r| (r.sample_id.as_str(), rank.label_of(r), r.abundance * 100.0)),
    );
    let n_groups = groups.len();

    // Pass 2
    let folded = fold_minor_taxa(groups, config.threshold, config.other_label(rank));
    log::info!(
        "Aggregated {} records into {} {} rows ({} before folding)",
        records.len(),
        folded.len(),
        rank,
        n_groups
    );
    into_rows(folded)
}

/// Runs the same group/fold/regroup steps over rows that are already in
/// percent. Existing "Other" rows are treated as ordinary taxa, so feeding
/// the output of [`aggregate_rank`] back in returns it unchanged.
pub fn rebucket(rows: &[AggregatedRow], rank: Rank, config: &AggregationConfig) -> Vec<AggregatedRow> {
    let groups = group_sum(
        rows.iter()
            .map(|r| (r.sample_id.as_str(), r.taxon.as_str(), r.abundance_pct)),
    );
    into_rows(fold_minor_taxa(groups, config.threshold, config.other_label(rank)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn rec(sample_id: &str, abundance: f64, species: &str, genus: &str) -> AbundanceRecord {
        AbundanceRecord {
            sample_id: sample_id.into(),
            species: species.into(),
            genus: genus.into(),
            abundance,
        }
    }

    fn find<'a>(rows: &'a [AggregatedRow], sample_id: &str, taxon: &str) -> Option<&'a AggregatedRow> {
        rows.iter().find(|r| r.sample_id == sample_id && r.taxon == taxon)
    }

    fn scenario() -> Vec<AbundanceRecord> {
        vec![
            rec("A", 0.97, "sp1", "g1"),
            rec("A", 0.03, "sp2", "g1"),
            rec("B", 1.0, "sp1", "g1"),
        ]
    }

    #[test]
    fn test_genus_scenario() {
        let rows = aggregate_rank(&scenario(), Rank::Genus, &AggregationConfig::default());
        assert_eq!(rows.len(), 2);
        assert!((find(&rows, "A", "g1").expect("A/g1").abundance_pct - 100.0).abs() < EPS);
        assert!((find(&rows, "B", "g1").expect("B/g1").abundance_pct - 100.0).abs() < EPS);
    }

    #[test]
    fn test_species_scenario() {
        let rows = aggregate_rank(&scenario(), Rank::Species, &AggregationConfig::default());
        // sp2 is 3%, above the 1% cut-off, so it survives at species level
        assert!((find(&rows, "A", "sp1").expect("A/sp1").abundance_pct - 97.0).abs() < EPS);
        assert!((find(&rows, "A", "sp2").expect("A/sp2").abundance_pct - 3.0).abs() < EPS);
        assert!((find(&rows, "B", "sp1").expect("B/sp1").abundance_pct - 100.0).abs() < EPS);
    }

    #[test]
    fn test_species_scenario_with_higher_threshold() {
        let config = AggregationConfig {
            threshold: 5.0,
            ..AggregationConfig::default()
        };
        let rows = aggregate_rank(&scenario(), Rank::Species, &config);
        let other = find(&rows, "A", "Other species <1%").expect("A/Other");
        assert!((other.abundance_pct - 3.0).abs() < EPS);
        assert!(find(&rows, "A", "sp2").is_none(), "sp2 should have been folded");
        assert!(find(&rows, "B", "Other species <1%").is_none());
    }

    #[test]
    fn test_threshold_is_strict() {
        let config = AggregationConfig {
            threshold: 50.0,
            ..AggregationConfig::default()
        };
        let records = vec![
            rec("A", 0.5, "at", "g1"),
            rec("A", 0.25, "below", "g2"),
            rec("A", 0.25, "also_below", "g3"),
        ];
        let rows = aggregate_rank(&records, Rank::Species, &config);
        assert_eq!(rows.len(), 2);
        assert_eq!(find(&rows, "A", "at").expect("A/at").abundance_pct, 50.0);
        assert_eq!(
            find(&rows, "A", "Other species <1%").expect("A/Other").abundance_pct,
            50.0
        );
    }

    #[test]
    fn test_default_threshold_boundary() {
        let records = vec![
            rec("A", 0.01, "at_one", "g1"),
            rec("A", 0.0099, "just_below", "g2"),
            rec("A", 0.9801, "major", "g3"),
        ];
        let rows = aggregate_rank(&records, Rank::Species, &AggregationConfig::default());
        let kept = find(&rows, "A", "at_one").expect("1% species should keep its label");
        assert_eq!(kept.abundance_pct, 1.0);
        assert!(find(&rows, "A", "just_below").is_none(), "0.99% species should be folded");
        let other = find(&rows, "A", "Other species <1%").expect("A/Other");
        assert!((other.abundance_pct - 0.99).abs() < EPS);
        assert!(find(&rows, "A", "major").is_some());
    }

    #[test]
    fn test_threshold_applies_to_summed_group() {
        // Two rows of 0.6% each: individually below 1%, together 1.2%
        let records = vec![
            rec("A", 0.006, "sp1", "g1"),
            rec("A", 0.006, "sp1", "g1"),
            rec("A", 0.988, "sp2", "g2"),
        ];
        let rows = aggregate_rank(&records, Rank::Species, &AggregationConfig::default());
        let sp1 = find(&rows, "A", "sp1").expect("sp1 should be kept");
        assert!((sp1.abundance_pct - 1.2).abs() < EPS);
        assert!(find(&rows, "A", "Other species <1%").is_none());
    }

    #[test]
    fn test_all_minor_taxa_collapse_to_one_row() {
        let records: Vec<AbundanceRecord> = (0..200)
            .map(|i| rec("A", 0.005, &format!("sp{i}"), &format!("g{i}")))
            .collect();
        let rows = aggregate_rank(&records, Rank::Genus, &AggregationConfig::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].taxon, "Other genera <1%");
        assert!((rows[0].abundance_pct - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_other_rows_are_per_sample() {
        let records = vec![
            rec("A", 0.995, "sp1", "g1"),
            rec("A", 0.005, "sp2", "g2"),
            rec("B", 0.995, "sp1", "g1"),
            rec("B", 0.005, "sp3", "g3"),
        ];
        let rows = aggregate_rank(&records, Rank::Genus, &AggregationConfig::default());
        assert_eq!(rows.len(), 4);
        assert!(find(&rows, "A", "Other genera <1%").is_some());
        assert!(find(&rows, "B", "Other genera <1%").is_some());
    }

    #[test]
    fn test_no_duplicate_pairs_and_sorted() {
        let records = vec![
            rec("B", 0.004, "sp4", "g4"),
            rec("A", 0.5, "sp1", "g1"),
            rec("A", 0.003, "sp2", "g2"),
            rec("A", 0.002, "sp3", "g3"),
            rec("A", 0.495, "sp1", "g1"),
            rec("B", 0.996, "sp5", "g5"),
        ];
        let rows = aggregate_rank(&records, Rank::Species, &AggregationConfig::default());
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.sample_id.as_str(), r.taxon.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("A", "Other species <1%"),
                ("A", "sp1"),
                ("B", "Other species <1%"),
                ("B", "sp5"),
            ]
        );
    }

    #[test]
    fn test_custom_other_label() {
        let mut config = AggregationConfig::default();
        config.other_labels.genus = "minor genera".into();
        let rows = aggregate_rank(&[rec("A", 0.001, "sp1", "g1")], Rank::Genus, &config);
        assert_eq!(rows[0].taxon, "minor genera");
    }

    #[test]
    fn test_rebucket_is_idempotent() {
        let records = vec![
            rec("A", 0.9, "sp1", "g1"),
            rec("A", 0.004, "sp2", "g2"),
            rec("A", 0.003, "sp3", "g3"),
            rec("A", 0.093, "sp4", "g4"),
            rec("B", 0.992, "sp1", "g1"),
            rec("B", 0.008, "sp5", "g5"),
        ];
        let config = AggregationConfig::default();
        for rank in Rank::ALL {
            let once = aggregate_rank(&records, rank, &config);
            let twice = rebucket(&once, rank, &config);
            assert_eq!(once, twice, "rebucketing changed {rank} rows");
        }
    }

    #[test]
    fn test_empty_records_give_empty_rows() {
        assert!(aggregate_rank(&[], Rank::Species, &AggregationConfig::default()).is_empty());
    }
}
