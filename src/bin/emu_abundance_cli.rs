use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use emu_abundance_rs::tsv::{discover_samples, load_samples};
use emu_abundance_rs::types::{DEFAULT_OTHER_GENERA, DEFAULT_OTHER_SPECIES, DEFAULT_THRESHOLD_PCT};
use emu_abundance_rs::{
    build_abundance_tables, write_abundance_tables, AggregationConfig, OtherLabels, PipelineConfig,
    Rank,
};

#[derive(Parser)]
#[command(
    name = "emu-abundance-rs",
    version,
    about = "Process EMU output files, merge them, and pivot abundance by species and genus"
)]
struct Cli {
    /// Folder containing one output folder per barcode (each holding the EMU .tsv files)
    input_folder: PathBuf,

    /// Folder where all results will be placed
    output_folder: PathBuf,

    /// Percent below which a taxon is folded into the "Other" column
    #[arg(long, default_value_t = DEFAULT_THRESHOLD_PCT)]
    threshold: f64,

    #[arg(long, default_value = DEFAULT_OTHER_SPECIES)]
    species_other_label: String,

    #[arg(long, default_value = DEFAULT_OTHER_GENERA)]
    genus_other_label: String,

    /// Project samples one at a time instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn spinner(color: &str, msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(&format!("{{spinner:.{color}}} {{msg}}"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(msg);
    spinner
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = PipelineConfig {
        aggregation: AggregationConfig {
            threshold: cli.threshold,
            other_labels: OtherLabels {
                species: cli.species_other_label,
                genus: cli.genus_other_label,
            },
        },
        parallel: !cli.sequential,
    };

    // 1. Find one abundance table per barcode folder
    let sp = spinner("blue", "Gathering EMU tables...");
    let sources = discover_samples(&cli.input_folder)?;
    let samples = load_samples(&sources)?;
    sp.finish_with_message(format!("Found {} barcode(s).", samples.len()));

    // 2. Merge, aggregate and pivot
    let sp = spinner("green", "Aggregating abundance...");
    let results = build_abundance_tables(&samples, &config)?;
    sp.finish_with_message(format!(
        "Aggregated {} rows into {} species and {} genus columns.",
        results.merged.len(),
        results.pivot(Rank::Species).taxa().len(),
        results.pivot(Rank::Genus).taxa().len()
    ));

    // 3. Write tables
    let sp = spinner("yellow", "Writing output files...");
    write_abundance_tables(&cli.output_folder, &results)?;
    sp.finish_with_message(format!("Output files written to {}.", cli.output_folder.display()));

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
