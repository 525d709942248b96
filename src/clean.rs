use crate::model::{CleanReport, CleanStats, CleanedEntry, PagePayload};
use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

pub struct EntryCleaner {
    code_junk: Regex,
    bare_number: Regex,
    spaced_percent: Regex,
    percent_value: Regex,
}

impl EntryCleaner {
    pub fn new() -> Self {
        Self {
            code_junk: Regex::new(r"[^\d.]").expect("code junk regex must be valid"),
            bare_number: Regex::new(r"^\d+(\.\d+)?$").expect("bare number regex must be valid"),
            spaced_percent: Regex::new(r"(\d+)\s+%").expect("spaced percent regex must be valid"),
            percent_value: Regex::new(r"^\d+(\.\d+)?%$").expect("percent value regex must be valid"),
        }
    }

    pub fn clean_pages(&self, pages: &[PagePayload]) -> (Vec<CleanedEntry>, CleanReport) {
        let mut report = CleanReport::default();
        let mut entries = Vec::new();

        for page in pages {
            if page.entries.is_empty() {
                if page.raw_content.is_some() {
                    warn!(
                        page = page.page_number,
                        "page has raw content but no structured entries"
                    );
                }
                continue;
            }

            for value in &page.entries {
                report.entries_in += 1;
                let Some(entry) = self.clean_entry(value, page.page_number, &mut report) else {
                    continue;
                };
                entries.push(entry);
            }
        }

        let entries = dedup_entries(entries, &mut report);

        report.entries_out = entries.len();
        report.stats = compute_stats(&entries);

        (entries, report)
    }

    fn clean_entry(
        &self,
        value: &Value,
        page_number: Option<u32>,
        report: &mut CleanReport,
    ) -> Option<CleanedEntry> {
        let Some(object) = value.as_object() else {
            debug!("entry payload is not an object; dropped");
            return None;
        };

        let mut entry = CleanedEntry {
            page_number,
            ..CleanedEntry::default()
        };

        for (key, raw) in object {
            let Some(field) = canonical_field(key) else {
                continue;
            };
            let Some(text) = value_to_string(raw) else {
                continue;
            };
            match field {
                Field::Code => entry.code = self.clean_code(&text),
                Field::DescriptionEn => entry.description_en = Some(text),
                Field::DescriptionAr => entry.description_ar = Some(text),
                Field::DutyRate => entry.duty_rate = self.normalize_rate(&text),
                Field::PreferenceA => entry.preference_a = Some(text),
                Field::PreferenceB => entry.preference_b = Some(text),
                Field::PreferenceC => entry.preference_c = Some(text),
            }
        }

        // Column misalignment in the vision output sometimes lands the duty
        // rate in an indicator column; move it back before validating.
        for indicator in [
            &mut entry.preference_a,
            &mut entry.preference_b,
            &mut entry.preference_c,
        ] {
            if let Some(v) = indicator.as_deref()
                && self.percent_value.is_match(v.trim())
                && entry.duty_rate.is_none()
            {
                entry.duty_rate = self.normalize_rate(v);
                *indicator = None;
                report.misplaced_rates_fixed += 1;
            }
        }

        entry.preference_a = self.check_indicator(entry.preference_a.take());
        entry.preference_b = self.check_indicator(entry.preference_b.take());
        entry.preference_c = self.check_indicator(entry.preference_c.take());

        if entry.code.is_none() {
            report.entries_without_code += 1;
            debug!(page = page_number, "entry without a code; dropped");
            return None;
        }

        Some(entry)
    }

    fn clean_code(&self, code: &str) -> Option<String> {
        let cleaned = self.code_junk.replace_all(code, "").to_string();
        if cleaned.is_empty() {
            return None;
        }
        Some(cleaned)
    }

    fn normalize_rate(&self, rate: &str) -> Option<String> {
        let rate = rate.trim();
        if rate.is_empty() {
            return None;
        }

        let lower = rate.to_lowercase();
        if ["free", "duty free", "zero", "0", "nil"].contains(&lower.as_str()) {
            return Some("0%".to_string());
        }

        if self.bare_number.is_match(rate) {
            return Some(format!("{rate}%"));
        }

        Some(self.spaced_percent.replace_all(rate, "$1%").to_string())
    }

    fn check_indicator(&self, value: Option<String>) -> Option<String> {
        let value = value?;
        let trimmed = value.trim();
        if trimmed.is_empty() || ["-", "null", "None"].contains(&trimmed) {
            return None;
        }
        // A leftover percentage here is a misplaced duty rate, not an
        // agreement indicator.
        if self.percent_value.is_match(trimmed) {
            return None;
        }
        if trimmed.len() > 3 {
            return None;
        }
        Some(trimmed.to_uppercase())
    }
}

impl Default for EntryCleaner {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_combined(path: &std::path::Path) -> Result<crate::model::CombinedDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read combined payload {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse combined payload {}", path.display()))
}

enum Field {
    Code,
    DescriptionEn,
    DescriptionAr,
    DutyRate,
    PreferenceA,
    PreferenceB,
    PreferenceC,
}

fn canonical_field(key: &str) -> Option<Field> {
    match key.trim().to_lowercase().as_str() {
        "h.s. code" | "h.s code" | "hs code" | "hs_code" | "hscode" | "tariff code" | "code" => {
            Some(Field::Code)
        }
        "description"
        | "description in english"
        | "english description"
        | "description_en" => Some(Field::DescriptionEn),
        "arabic description" | "description in arabic" | "description_ar" => {
            Some(Field::DescriptionAr)
        }
        "duty rate" | "duty" | "rate" | "duty_rate" => Some(Field::DutyRate),
        "sfta" | "sfta indicator" | "efta" | "preference_a" => Some(Field::PreferenceA),
        "sg" | "sg indicator" | "preference_b" => Some(Field::PreferenceB),
        "ura" | "ura indicator" | "usa" | "preference_c" => Some(Field::PreferenceC),
        _ => None,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(v) => v.to_string(),
        other => other.to_string(),
    };

    if text.is_empty() || text == "null" || text == "None" {
        return None;
    }
    Some(text)
}

fn dedup_entries(entries: Vec<CleanedEntry>, report: &mut CleanReport) -> Vec<CleanedEntry> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for entry in entries {
        let key = format!(
            "{}|{}",
            entry.code.as_deref().unwrap_or(""),
            entry.description_en.as_deref().unwrap_or("")
        );
        if !seen.insert(key) {
            report.duplicates_removed += 1;
            continue;
        }
        unique.push(entry);
    }

    unique
}

fn compute_stats(entries: &[CleanedEntry]) -> CleanStats {
    let unique_codes = entries
        .iter()
        .filter_map(|e| e.code.as_deref())
        .collect::<HashSet<_>>()
        .len();
    let pages_processed = entries
        .iter()
        .filter_map(|e| e.page_number)
        .collect::<HashSet<_>>()
        .len();

    CleanStats {
        total_entries: entries.len(),
        entries_with_duty_rate: entries.iter().filter(|e| e.duty_rate.is_some()).count(),
        unique_codes,
        pages_processed,
    }
}
