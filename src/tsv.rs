//src/tsv.rs

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::error::{AbundanceError, Result};
use crate::pivot::PivotMatrix;
use crate::types::{AbundanceRecord, ProjectedRecord, RawTable};

/// Files whose name contains this are EMU's thresholded side outputs.
const SKIP_MARKER: &str = "threshold";

/// Header of the first column of the pivot tables.
pub const SAMPLE_COLUMN: &str = "barcode";

/// Sample column of the merged table, named as downstream plotting expects it.
pub const MERGED_SAMPLE_COLUMN: &str = "Barcode";

/// One barcode folder and the abundance table picked from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSource {
    pub sample_id: String,
    pub path: PathBuf,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> AbundanceError + '_ {
    move |source| AbundanceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn table_error(path: &Path) -> impl FnOnce(csv::Error) -> AbundanceError + '_ {
    move |source| AbundanceError::Table {
        path: path.to_path_buf(),
        source,
    }
}

fn is_abundance_table(file_name: &str) -> bool {
    (file_name.ends_with(".tsv") || file_name.ends_with(".tsv.gz")) && !file_name.contains(SKIP_MARKER)
}

/// Sorted entries of `dir`, paired with their lossy file names.
fn sorted_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        let path = entry.map_err(io_error(dir))?.path();
        if let Some(name) = path.file_name() {
            entries.push((name.to_string_lossy().into_owned(), path));
        }
    }
    entries.sort();
    Ok(entries)
}

/// Walks `<input_dir>/<barcode>/` folders and picks one abundance table per
/// barcode. The folder name becomes the sample id.
///
/// When a folder holds several tables the last one by file name is used.
pub fn discover_samples(input_dir: &Path) -> Result<Vec<SampleSource>> {
    let mut sources = Vec::new();

    for (barcode, dir) in sorted_entries(input_dir)? {
        if !dir.is_dir() {
            continue;
        }

        let tables: Vec<PathBuf> = sorted_entries(&dir)?
            .into_iter()
            .filter(|(name, path)| path.is_file() && is_abundance_table(name))
            .map(|(_, path)| path)
            .collect();

        match tables.last() {
            None => log::warn!("No abundance table in {}, skipping", dir.display()),
            Some(path) => {
                if tables.len() > 1 {
                    log::warn!(
                        "{} abundance tables in {}, using {}",
                        tables.len(),
                        dir.display(),
                        path.display()
                    );
                }
                sources.push(SampleSource {
                    sample_id: barcode,
                    path: path.clone(),
                });
            }
        }
    }

    log::info!("Discovered {} samples under {}", sources.len(), input_dir.display());
    Ok(sources)
}

/// Reads a tab-separated table, gunzipping it first if the name ends in `.gz`.
/// Rows may be shorter or longer than the header; the projector decides
/// what a short row means.
pub fn read_raw_table<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(io_error(path))?;

    let is_gz = path.extension().map(|ext| ext == "gz").unwrap_or(false);
    let reader: Box<dyn Read> = if is_gz {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(table_error(path))?
        .iter()
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(table_error(path))?;
        rows.push(record.iter().map(String::from).collect());
    }

    Ok(RawTable { headers, rows })
}

/// Loads every discovered table, keeping discovery order.
pub fn load_samples(sources: &[SampleSource]) -> Result<Vec<(String, RawTable)>> {
    sources
        .iter()
        .map(|source| -> Result<(String, RawTable)> {
            let table = read_raw_table(&source.path)?;
            log::debug!(
                "Read {} rows for {} from {}",
                table.rows.len(),
                source.sample_id,
                source.path.display()
            );
            Ok((source.sample_id.clone(), table))
        })
        .collect()
}

fn tab_writer(path: &Path) -> Result<csv::Writer<File>> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(table_error(path))
}

/// Writes `<dir>/<sample>_processed.tsv` for every sample, creating `dir`
/// if needed. Returns the written paths.
pub fn write_processed_tables(
    dir: &Path,
    samples: &[(String, Vec<ProjectedRecord>)],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(io_error(dir))?;

    let mut written = Vec::with_capacity(samples.len());
    for (sample_id, records) in samples {
        let path = dir.join(format!("{sample_id}_processed.tsv"));
        let mut wtr = tab_writer(&path)?;
        wtr.write_record(["abundance", "species", "genus"])
            .map_err(table_error(&path))?;
        for r in records {
            wtr.write_record([r.abundance.to_string().as_str(), r.species.as_str(), r.genus.as_str()])
                .map_err(table_error(&path))?;
        }
        wtr.flush().map_err(io_error(&path))?;
        written.push(path);
    }
    Ok(written)
}

/// Writes the merged long table as comma-separated values.
pub fn write_merged_csv(path: &Path, records: &[AbundanceRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(table_error(path))?;
    wtr.write_record(["abundance", "species", "genus", MERGED_SAMPLE_COLUMN])
        .map_err(table_error(path))?;
    for r in records {
        wtr.write_record([
            r.abundance.to_string().as_str(),
            r.species.as_str(),
            r.genus.as_str(),
            r.sample_id.as_str(),
        ])
        .map_err(table_error(path))?;
    }
    wtr.flush().map_err(io_error(path))?;
    log::info!("Merged table saved as {}", path.display());
    Ok(())
}

/// Writes a pivot as a wide tab-separated table: one row per sample, one
/// column per taxon.
pub fn write_pivot_tsv(path: &Path, pivot: &PivotMatrix) -> Result<()> {
    let mut wtr = tab_writer(path)?;

    let mut header = Vec::with_capacity(pivot.taxa().len() + 1);
    header.push(SAMPLE_COLUMN);
    header.extend(pivot.taxa().iter().map(String::as_str));
    wtr.write_record(&header).map_err(table_error(path))?;

    for (sample_id, row) in pivot.iter_rows() {
        let mut fields = Vec::with_capacity(row.len() + 1);
        fields.push(sample_id.to_string());
        fields.extend(pivot.taxa().iter().map(|taxon| {
            row.get(taxon).copied().unwrap_or(0.0).to_string()
        }));
        wtr.write_record(&fields).map_err(table_error(path))?;
    }
    wtr.flush().map_err(io_error(path))?;
    log::info!("{} pivot saved as {}", pivot.rank(), path.display());
    Ok(())
}
