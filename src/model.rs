use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateColumn {
    Duty,
    PreferenceA,
    PreferenceB,
    PreferenceC,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    ChapterHeader {
        chapter: String,
    },
    HeadingMarker {
        heading: String,
    },
    RateRow {
        column: RateColumn,
        value: String,
    },
    CodeRow {
        code: String,
        code_formatted: String,
        remainder: String,
        trailing_rate: Option<String>,
    },
    DescriptionText {
        text: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateSet {
    pub duty: Option<String>,
    pub preference_a: Option<String>,
    pub preference_b: Option<String>,
    pub preference_c: Option<String>,
}

impl RateSet {
    pub fn set(&mut self, column: RateColumn, value: String) {
        match column {
            RateColumn::Duty => self.duty = Some(value),
            RateColumn::PreferenceA => self.preference_a = Some(value),
            RateColumn::PreferenceB => self.preference_b = Some(value),
            RateColumn::PreferenceC => self.preference_c = Some(value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TariffRecord {
    pub chapter: Option<String>,
    pub heading: Option<String>,
    pub code: String,
    pub code_formatted: String,
    #[serde(default)]
    pub description_en: String,
    #[serde(default)]
    pub description_ar: String,
    pub duty_rate: Option<String>,
    pub preference_a: Option<String>,
    pub preference_b: Option<String>,
    pub preference_c: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub records: Vec<TariffRecord>,
    pub lines_seen: usize,
    pub lines_skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractReport {
    pub source_key: String,
    pub documents_fetched: usize,
    pub lines_seen: usize,
    pub lines_skipped: usize,
    pub records_emitted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagePayload {
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub entries: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedDocument {
    pub merged_at: DateTime<Utc>,
    pub pages: Vec<PagePayload>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CombineReport {
    pub files_matched: usize,
    pub pages_merged: usize,
    pub pages_malformed: usize,
    pub duplicates_dropped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanedEntry {
    pub code: Option<String>,
    pub description_en: Option<String>,
    pub description_ar: Option<String>,
    pub duty_rate: Option<String>,
    pub preference_a: Option<String>,
    pub preference_b: Option<String>,
    pub preference_c: Option<String>,
    pub page_number: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanStats {
    pub total_entries: usize,
    pub entries_with_duty_rate: usize,
    pub unique_codes: usize,
    pub pages_processed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    pub entries_in: usize,
    pub entries_out: usize,
    pub entries_without_code: usize,
    pub duplicates_removed: usize,
    pub misplaced_rates_fixed: usize,
    pub stats: CleanStats,
}
