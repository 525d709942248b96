use crate::model::{CombineReport, CombinedDocument, PagePayload};
use anyhow::{Context, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_PAGE_PATTERN: &str = "page_*_result.json";

// Vision-extraction workers write one result file per page, unordered and
// sometimes twice for the same page. The merge must survive all of that.
pub fn combine_page_files(
    pages_dir: &Path,
    pattern: &str,
) -> Result<(CombinedDocument, CombineReport)> {
    let full_pattern = pages_dir.join(pattern).to_string_lossy().to_string();
    let mut files: Vec<PathBuf> = glob::glob(&full_pattern)
        .with_context(|| format!("invalid page file pattern {full_pattern}"))?
        .filter_map(|entry| entry.ok())
        .collect();
    files.sort_by_key(|path| (page_number_from_name(path), path.clone()));

    if files.is_empty() {
        warn!(pattern = %full_pattern, "no page files matched");
    }

    let mut report = CombineReport {
        files_matched: files.len(),
        ..CombineReport::default()
    };
    let mut seen_fingerprints = HashSet::new();
    let mut pages = Vec::new();

    for file in files {
        let bytes = match std::fs::read(&file) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(file = %file.display(), error = %err, "failed to read page file; keeping placeholder");
                report.pages_malformed += 1;
                pages.push(PagePayload {
                    page_number: page_number_from_name(&file),
                    entries: Vec::new(),
                    raw_content: None,
                    parse_error: Some(err.to_string()),
                });
                continue;
            }
        };

        let fingerprint = hex::encode(Sha256::digest(&bytes));
        if !seen_fingerprints.insert(fingerprint) {
            debug!(file = %file.display(), "duplicate page payload; dropped");
            report.duplicates_dropped += 1;
            continue;
        }

        match serde_json::from_slice::<PagePayload>(&bytes) {
            Ok(mut payload) => {
                if payload.page_number.is_none() {
                    payload.page_number = page_number_from_name(&file);
                }
                report.pages_merged += 1;
                pages.push(payload);
            }
            Err(err) => {
                warn!(
                    file = %file.display(),
                    error = %err,
                    "page payload is not valid json; keeping raw content"
                );
                report.pages_malformed += 1;
                pages.push(PagePayload {
                    page_number: page_number_from_name(&file),
                    entries: Vec::new(),
                    raw_content: Some(String::from_utf8_lossy(&bytes).to_string()),
                    parse_error: Some(err.to_string()),
                });
            }
        }
    }

    pages.sort_by_key(|page| page.page_number.unwrap_or(0));

    info!(
        files = report.files_matched,
        merged = report.pages_merged,
        malformed = report.pages_malformed,
        duplicates = report.duplicates_dropped,
        "page payloads combined"
    );

    Ok((
        CombinedDocument {
            merged_at: Utc::now(),
            pages,
        },
        report,
    ))
}

fn page_number_from_name(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    name.split('_').nth(1)?.parse().ok()
}
