use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tarex::combine::DEFAULT_PAGE_PATTERN;
use tarex::harness::{HarnessOptions, run_harness};
use tarex::pipeline::{
    CleanOptions, CombineOptions, ExtractOptions, ValidateOptions, clean_combined, combine_pages,
    extract_sources, validate_configs,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tarex", about = "Config-driven customs tariff schedule extractor")]
struct Cli {
    #[arg(long, default_value = "configs/sources")]
    config_dir: PathBuf,

    #[arg(long, default_value = "data/out")]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Extract {
        #[arg(long)]
        source: Option<String>,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    Combine {
        #[arg(long, default_value = "data/pages")]
        pages_dir: PathBuf,
        #[arg(long, default_value = DEFAULT_PAGE_PATTERN)]
        pattern: String,
        #[arg(long, default_value = "data/out/combined.json")]
        output: PathBuf,
    },
    Clean {
        #[arg(long, default_value = "data/out/combined.json")]
        input: PathBuf,
        #[arg(long, default_value = "data/out/cleaned.json")]
        output_json: PathBuf,
        #[arg(long, default_value = "data/out/cleaned.csv")]
        output_csv: PathBuf,
    },
    Validate {
        #[arg(long)]
        source_file: Option<PathBuf>,
    },
    Harness,
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { source, dry_run } => {
            let reports = extract_sources(&ExtractOptions {
                config_dir: cli.config_dir,
                out_dir: cli.out_dir,
                source,
                dry_run,
            })?;

            for report in reports {
                info!(
                    source = %report.source_key,
                    documents = report.documents_fetched,
                    lines = report.lines_seen,
                    skipped = report.lines_skipped,
                    records = report.records_emitted,
                    "source extract summary"
                );
            }
        }
        Commands::Combine {
            pages_dir,
            pattern,
            output,
        } => {
            let report = combine_pages(&CombineOptions {
                pages_dir,
                pattern,
                output,
            })?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Clean {
            input,
            output_json,
            output_csv,
        } => {
            let report = clean_combined(&CleanOptions {
                input,
                output_json,
                output_csv,
            })?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Validate { source_file } => {
            let messages = validate_configs(&ValidateOptions {
                config_dir: Some(cli.config_dir),
                source_file,
            })?;
            for line in messages {
                println!("{line}");
            }
        }
        Commands::Harness => {
            let report = run_harness(&HarnessOptions {
                config_dir: cli.config_dir,
                out_dir: cli.out_dir,
            })?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}
