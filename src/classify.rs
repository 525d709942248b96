use crate::config::ClassifyRules;
use crate::model::{LineKind, RateColumn};
use anyhow::{Context, Result};
use regex::Regex;

pub struct LineClassifier {
    chapter: Regex,
    heading: Regex,
    code: Regex,
    percent: Regex,
    trailing_percent: Regex,
    numeric_noise: Regex,
    columns: Vec<(RateColumn, Vec<String>)>,
    discard_labels: Vec<String>,
    code_group_separator: String,
    unlabeled_rate_to_duty: bool,
}

impl LineClassifier {
    pub fn from_rules(rules: &ClassifyRules) -> Result<Self> {
        let keywords = rules
            .chapter_keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let chapter = Regex::new(&format!(r"(?i)(?:{keywords})\s+(\d+)"))
            .with_context(|| format!("invalid chapter keywords {:?}", rules.chapter_keywords))?;

        let columns = vec![
            (RateColumn::Duty, upper_all(&rules.duty_keywords)),
            (RateColumn::PreferenceA, upper_all(&rules.preference_a_keywords)),
            (RateColumn::PreferenceB, upper_all(&rules.preference_b_keywords)),
            (RateColumn::PreferenceC, upper_all(&rules.preference_c_keywords)),
        ];

        // Column keywords double as table-header labels when they show up
        // without a percentage next to them.
        let mut discard_labels = upper_all(&rules.header_labels);
        for (_, keywords) in &columns {
            discard_labels.extend(keywords.iter().cloned());
        }

        Ok(Self {
            chapter,
            heading: Regex::new(r"\b(\d{2}\.\d{2})\b").expect("heading regex must be valid"),
            code: Regex::new(r"^(\d{2})\s+(\d{2})\s+(\d{2})\s+(\d{2})\s+(\d{2})\s+(\d{2})")
                .expect("code regex must be valid"),
            percent: Regex::new(r"\d+(?:\.\d+)?%").expect("percent regex must be valid"),
            trailing_percent: Regex::new(r"(\d+(?:\.\d+)?%)\s*$")
                .expect("trailing percent regex must be valid"),
            numeric_noise: Regex::new(r"^[\d\s.%]+$").expect("numeric noise regex must be valid"),
            columns,
            discard_labels,
            code_group_separator: rules.code_group_separator.clone(),
            unlabeled_rate_to_duty: rules.unlabeled_rate_to_duty,
        })
    }

    // Precedence: chapter, heading, code, rate, description. The code check
    // runs before the rate check so a code row with a trailing percentage is
    // never mistaken for a rate-table line.
    pub fn classify(&self, line: &str) -> Option<LineKind> {
        if line.is_empty() {
            return None;
        }

        if let Some(caps) = self.chapter.captures(line) {
            return Some(LineKind::ChapterHeader {
                chapter: caps[1].to_string(),
            });
        }

        if let Some(caps) = self.heading.captures(line) {
            return Some(LineKind::HeadingMarker {
                heading: caps[1].to_string(),
            });
        }

        if let Some(kind) = self.match_code_row(line) {
            return Some(kind);
        }

        if self.percent.is_match(line) {
            return self.match_rate_row(line);
        }

        let upper = line.to_uppercase();
        if self.discard_labels.iter().any(|label| upper.contains(label)) {
            return None;
        }
        if self.numeric_noise.is_match(line) {
            return None;
        }

        Some(LineKind::DescriptionText {
            text: line.to_string(),
        })
    }

    fn match_code_row(&self, line: &str) -> Option<LineKind> {
        let caps = self.code.captures(line)?;
        let groups: Vec<&str> = (1..=6).map(|i| caps.get(i).map_or("", |m| m.as_str())).collect();
        let code = groups.concat();
        let code_formatted = groups.join(self.code_group_separator.as_str());

        let mut remainder = line[caps.get(0).map_or(0, |m| m.end())..].trim().to_string();
        let mut trailing_rate = None;
        if let Some(rate) = self.trailing_percent.captures(&remainder) {
            let start = rate.get(1).map_or(remainder.len(), |m| m.start());
            trailing_rate = Some(rate[1].to_string());
            remainder.truncate(start);
            remainder.truncate(remainder.trim_end().len());
        }

        Some(LineKind::CodeRow {
            code,
            code_formatted,
            remainder,
            trailing_rate,
        })
    }

    fn match_rate_row(&self, line: &str) -> Option<LineKind> {
        let value = self.percent.find(line)?.as_str().to_string();
        let upper = line.to_uppercase();

        for (column, keywords) in &self.columns {
            if keywords.iter().any(|k| upper.contains(k)) {
                return Some(LineKind::RateRow {
                    column: *column,
                    value,
                });
            }
        }

        if self.unlabeled_rate_to_duty {
            return Some(LineKind::RateRow {
                column: RateColumn::Duty,
                value,
            });
        }

        None
    }
}

fn upper_all(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_uppercase()).collect()
}
