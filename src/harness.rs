use crate::model::TariffRecord;
use crate::output::read_csv;
use crate::pipeline::{ExtractOptions, extract_sources};
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub config_dir: PathBuf,
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub sources: usize,
    pub first_run_records: usize,
    pub second_run_records: usize,
    pub deterministic: bool,
    pub csv_round_trip_ok: bool,
    pub output_files: usize,
}

// Parsing is strictly line-ordered with no clocks or randomness in the
// output, so two runs over the same configs must be byte-identical.
pub fn run_harness(options: &HarnessOptions) -> Result<HarnessReport> {
    let first_dir = options.out_dir.join("harness-a");
    let second_dir = options.out_dir.join("harness-b");
    for dir in [&first_dir, &second_dir] {
        if dir.exists() {
            std::fs::remove_dir_all(dir)
                .with_context(|| format!("failed to clear harness dir {}", dir.display()))?;
        }
    }

    let first = extract_sources(&ExtractOptions {
        config_dir: options.config_dir.clone(),
        out_dir: first_dir.clone(),
        source: None,
        dry_run: false,
    })?;

    let second = extract_sources(&ExtractOptions {
        config_dir: options.config_dir.clone(),
        out_dir: second_dir.clone(),
        source: None,
        dry_run: false,
    })?;

    let deterministic = dir_digests(&first_dir)? == dir_digests(&second_dir)?;
    let csv_round_trip_ok = verify_csv_round_trip(&first_dir)?;

    let mut output_files = 0usize;
    for entry in WalkDir::new(&first_dir) {
        if entry?.file_type().is_file() {
            output_files += 1;
        }
    }

    Ok(HarnessReport {
        sources: first.len(),
        first_run_records: first.iter().map(|r| r.records_emitted).sum(),
        second_run_records: second.iter().map(|r| r.records_emitted).sum(),
        deterministic,
        csv_round_trip_ok,
        output_files,
    })
}

fn dir_digests(dir: &Path) -> Result<BTreeMap<PathBuf, String>> {
    let mut digests = BTreeMap::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_path_buf();
        digests.insert(relative, hex::encode(Sha256::digest(bytes)));
    }
    Ok(digests)
}

fn verify_csv_round_trip(dir: &Path) -> Result<bool> {
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file()
            || entry.path().extension().and_then(|s| s.to_str()) != Some("csv")
        {
            continue;
        }

        let json_path = entry.path().with_extension("json");
        let json_text = std::fs::read_to_string(&json_path)
            .with_context(|| format!("failed to read {}", json_path.display()))?;
        let from_json: Vec<TariffRecord> = serde_json::from_str(&json_text)
            .with_context(|| format!("failed to parse {}", json_path.display()))?;
        let from_csv: Vec<TariffRecord> = read_csv(entry.path())?;

        if from_json != from_csv {
            return Ok(false);
        }
    }
    Ok(true)
}
