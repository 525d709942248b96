use crate::classify::LineClassifier;
use crate::clean::{EntryCleaner, load_combined};
use crate::combine::combine_page_files;
use crate::config::{load_source_file, load_sources_from_dir};
use crate::fetch::{decode_document, fetch_source_document};
use crate::model::{CleanReport, CombineReport, ExtractReport};
use crate::output::{write_csv, write_json, write_json_value};
use crate::parser::parse_lines;
use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub config_dir: PathBuf,
    pub out_dir: PathBuf,
    pub source: Option<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct CombineOptions {
    pub pages_dir: PathBuf,
    pub pattern: String,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub input: PathBuf,
    pub output_json: PathBuf,
    pub output_csv: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub config_dir: Option<PathBuf>,
    pub source_file: Option<PathBuf>,
}

pub fn extract_sources(options: &ExtractOptions) -> Result<Vec<ExtractReport>> {
    let mut sources = load_sources_from_dir(&options.config_dir)?;
    if let Some(filter) = &options.source {
        sources.retain(|s| s.config.source.key == *filter);
    }
    if sources.is_empty() {
        bail!("no matching source configurations found");
    }

    let mut reports = Vec::new();

    for source in sources {
        if !source.config.source.enabled {
            info!(source = %source.config.source.key, "source disabled; skipping");
            continue;
        }

        info!(source = %source.config.source.key, "extract start");
        let doc = fetch_source_document(&source)
            .with_context(|| format!("fetch failed for source {}", source.config.source.key))?;
        let text = decode_document(&source.config, &doc);

        let classifier = LineClassifier::from_rules(&source.config.classify).with_context(|| {
            format!(
                "invalid classify rules for source {}",
                source.config.source.key
            )
        })?;
        let outcome = parse_lines(&classifier, text.lines());

        let report = ExtractReport {
            source_key: source.config.source.key.clone(),
            documents_fetched: 1,
            lines_seen: outcome.lines_seen,
            lines_skipped: outcome.lines_skipped,
            records_emitted: outcome.records.len(),
        };

        if options.dry_run {
            info!(source = %source.config.source.key, "dry run enabled; records not persisted");
        } else {
            let stem = source.config.sanitized_source_dir_name();
            let source_dir = options.out_dir.join("sources").join(&stem);
            let json_path = source_dir.join(format!("{stem}.json"));
            let csv_path = source_dir.join(format!("{stem}.csv"));
            write_json(&json_path, &outcome.records)?;
            write_csv(&csv_path, &outcome.records)?;
            info!(
                source = %source.config.source.key,
                records = outcome.records.len(),
                json = %json_path.display(),
                csv = %csv_path.display(),
                "records written"
            );
        }

        reports.push(report);
    }

    Ok(reports)
}

pub fn combine_pages(options: &CombineOptions) -> Result<CombineReport> {
    let (document, report) = combine_page_files(&options.pages_dir, &options.pattern)?;
    write_json_value(&options.output, &document)?;
    info!(
        pages = document.pages.len(),
        output = %options.output.display(),
        "combined payload written"
    );
    Ok(report)
}

pub fn clean_combined(options: &CleanOptions) -> Result<CleanReport> {
    let document = load_combined(&options.input)?;
    let cleaner = EntryCleaner::new();
    let (entries, report) = cleaner.clean_pages(&document.pages);

    write_json(&options.output_json, &entries)?;
    write_csv(&options.output_csv, &entries)?;
    info!(
        entries = entries.len(),
        json = %options.output_json.display(),
        csv = %options.output_csv.display(),
        "cleaned entries written"
    );

    Ok(report)
}

pub fn validate_configs(options: &ValidateOptions) -> Result<Vec<String>> {
    let mut messages = Vec::new();

    if let Some(file) = &options.source_file {
        let source = load_source_file(file)?;
        messages.push(format!(
            "OK: {} ({})",
            source.config.source.key,
            file.display()
        ));
        return Ok(messages);
    }

    if let Some(dir) = &options.config_dir {
        let sources = load_sources_from_dir(dir)?;
        for source in sources {
            messages.push(format!(
                "OK: {} ({})",
                source.config.source.key,
                source.path.display()
            ));
        }
        return Ok(messages);
    }

    bail!("either --config-dir or --source-file must be provided");
}
