use crate::classify::LineClassifier;
use crate::model::{LineKind, ParseOutcome, RateSet, TariffRecord};
use crate::normalize::{contains_arabic, normalize_line};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ParserContext {
    pub chapter: Option<String>,
    pub heading: Option<String>,
    pub rates: RateSet,
}

#[derive(Debug)]
struct OpenRecord {
    record: TariffRecord,
    pending: Vec<String>,
}

pub struct TariffParser<'a> {
    classifier: &'a LineClassifier,
    ctx: ParserContext,
    open: Option<OpenRecord>,
    records: Vec<TariffRecord>,
    lines_seen: usize,
    lines_skipped: usize,
}

impl<'a> TariffParser<'a> {
    pub fn new(classifier: &'a LineClassifier) -> Self {
        Self {
            classifier,
            ctx: ParserContext::default(),
            open: None,
            records: Vec::new(),
            lines_seen: 0,
            lines_skipped: 0,
        }
    }

    pub fn push_line(&mut self, raw: &str) {
        self.lines_seen += 1;
        let line = normalize_line(raw);
        if line.is_empty() {
            return;
        }

        let Some(kind) = self.classifier.classify(&line) else {
            self.lines_skipped += 1;
            debug!(line = %line, "line matched no pattern; skipped");
            return;
        };

        match kind {
            LineKind::ChapterHeader { chapter } => self.ctx.chapter = Some(chapter),
            LineKind::HeadingMarker { heading } => self.ctx.heading = Some(heading),
            LineKind::RateRow { column, value } => self.ctx.rates.set(column, value),
            LineKind::CodeRow {
                code,
                code_formatted,
                remainder,
                trailing_rate,
            } => {
                self.flush_open();

                // The open record snapshots the context at creation time;
                // later header/rate lines only touch the context.
                let mut record = TariffRecord {
                    chapter: self.ctx.chapter.clone(),
                    heading: self.ctx.heading.clone(),
                    code,
                    code_formatted,
                    description_en: String::new(),
                    description_ar: String::new(),
                    duty_rate: self.ctx.rates.duty.clone(),
                    preference_a: self.ctx.rates.preference_a.clone(),
                    preference_b: self.ctx.rates.preference_b.clone(),
                    preference_c: self.ctx.rates.preference_c.clone(),
                };
                if let Some(rate) = trailing_rate {
                    record.duty_rate = Some(rate);
                }

                let mut pending = Vec::new();
                if !remainder.is_empty() {
                    pending.push(remainder);
                }
                self.open = Some(OpenRecord { record, pending });
            }
            LineKind::DescriptionText { text } => {
                if let Some(open) = self.open.as_mut() {
                    open.pending.push(text);
                } else {
                    debug!(fragment = %text, "description fragment before first code row; dropped");
                }
            }
        }
    }

    fn flush_open(&mut self) {
        let Some(OpenRecord { mut record, pending }) = self.open.take() else {
            return;
        };

        let mut en = Vec::new();
        let mut ar = Vec::new();
        for fragment in pending {
            if contains_arabic(&fragment) {
                ar.push(fragment);
            } else {
                en.push(fragment);
            }
        }
        record.description_en = en.join(" ");
        record.description_ar = ar.join(" ");

        self.records.push(record);
    }

    pub fn finish(mut self) -> ParseOutcome {
        self.flush_open();
        ParseOutcome {
            records: self.records,
            lines_seen: self.lines_seen,
            lines_skipped: self.lines_skipped,
        }
    }
}

pub fn parse_lines<I, S>(classifier: &LineClassifier, lines: I) -> ParseOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = TariffParser::new(classifier);
    for line in lines {
        parser.push_line(line.as_ref());
    }
    parser.finish()
}
