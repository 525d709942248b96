use anyhow::Result;
use tarex::classify::LineClassifier;
use tarex::config::ClassifyRules;
use tarex::model::{LineKind, RateColumn, TariffRecord};
use tarex::normalize::{contains_arabic, normalize_line};
use tarex::output::{read_csv, write_csv};
use tarex::parser::parse_lines;
use tempfile::tempdir;

fn classifier() -> LineClassifier {
    LineClassifier::from_rules(&ClassifyRules::default()).expect("default rules must build")
}

#[test]
fn normalize_strips_bidi_marks_and_collapses_whitespace() {
    assert_eq!(normalize_line("  LIVE \u{200f}HORSES\u{202c}   5% "), "LIVE HORSES 5%");
    assert_eq!(normalize_line("\u{202b}خيول حية\u{202c}"), "خيول حية");
    assert_eq!(normalize_line("   "), "");
}

#[test]
fn normalize_is_idempotent() {
    let samples = [
        "  LIVE \u{200e}HORSES  ",
        "\u{202a}01 01 21 00 10 00\u{202c}  خيول\u{200f} حية",
        "",
        "already normal",
    ];
    for s in samples {
        let once = normalize_line(s);
        assert_eq!(normalize_line(&once), once);
    }
}

#[test]
fn classifies_chapter_headers_in_both_locales() {
    let c = classifier();
    assert_eq!(
        c.classify("Chapter 5"),
        Some(LineKind::ChapterHeader {
            chapter: "5".to_string()
        })
    );
    assert_eq!(
        c.classify("الفصل 77"),
        Some(LineKind::ChapterHeader {
            chapter: "77".to_string()
        })
    );
}

#[test]
fn classifies_heading_markers() {
    let c = classifier();
    assert_eq!(
        c.classify("01.01"),
        Some(LineKind::HeadingMarker {
            heading: "01.01".to_string()
        })
    );
}

#[test]
fn classifies_rate_rows_by_column_keyword() {
    let c = classifier();
    assert_eq!(
        c.classify("DUTY RATE 5%"),
        Some(LineKind::RateRow {
            column: RateColumn::Duty,
            value: "5%".to_string()
        })
    );
    assert_eq!(
        c.classify("EFTA 0%"),
        Some(LineKind::RateRow {
            column: RateColumn::PreferenceA,
            value: "0%".to_string()
        })
    );
    assert_eq!(
        c.classify("SG 2.5%"),
        Some(LineKind::RateRow {
            column: RateColumn::PreferenceB,
            value: "2.5%".to_string()
        })
    );
    assert_eq!(
        c.classify("USA 0%"),
        Some(LineKind::RateRow {
            column: RateColumn::PreferenceC,
            value: "0%".to_string()
        })
    );
}

#[test]
fn unlabeled_percentage_defaults_to_duty_column() {
    let c = classifier();
    assert_eq!(
        c.classify("100 KG 5%"),
        Some(LineKind::RateRow {
            column: RateColumn::Duty,
            value: "5%".to_string()
        })
    );

    let mut rules = ClassifyRules::default();
    rules.unlabeled_rate_to_duty = false;
    let strict = LineClassifier::from_rules(&rules).expect("rules must build");
    assert_eq!(strict.classify("100 KG 5%"), None);
}

#[test]
fn code_row_prefix_beats_rate_keywords() {
    let c = classifier();
    let kind = c.classify("01 01 21 00 10 00 LIVE HORSES 5%");
    assert_eq!(
        kind,
        Some(LineKind::CodeRow {
            code: "010121001000".to_string(),
            code_formatted: "01.01.21.00.10.00".to_string(),
            remainder: "LIVE HORSES".to_string(),
            trailing_rate: Some("5%".to_string()),
        })
    );
}

#[test]
fn discards_header_labels_and_numeric_noise() {
    let c = classifier();
    assert_eq!(c.classify("HEADING H.S CODE DESCRIPTION"), None);
    assert_eq!(c.classify("EFTA"), None);
    assert_eq!(c.classify("12 34 5 . %"), None);
    assert_eq!(c.classify(""), None);
    assert_eq!(
        c.classify("Live animals"),
        Some(LineKind::DescriptionText {
            text: "Live animals".to_string()
        })
    );
}

#[test]
fn sticky_chapter_covers_following_code_rows() {
    let c = classifier();
    let outcome = parse_lines(
        &c,
        ["Chapter 5", "01 01 21 00 10 00", "01 01 29 00 00 00"],
    );
    assert_eq!(outcome.records.len(), 2);
    for record in &outcome.records {
        assert_eq!(record.chapter.as_deref(), Some("5"));
    }
}

#[test]
fn rate_overwrite_leaves_other_columns_untouched() {
    let c = classifier();
    let outcome = parse_lines(
        &c,
        [
            "EFTA 0%",
            "DUTY RATE 5%",
            "01 01 21 00 10 00",
            "DUTY RATE 10%",
            "01 01 29 00 00 00",
        ],
    );
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[0].duty_rate.as_deref(), Some("5%"));
    assert_eq!(outcome.records[0].preference_a.as_deref(), Some("0%"));
    assert_eq!(outcome.records[1].duty_rate.as_deref(), Some("10%"));
    assert_eq!(outcome.records[1].preference_a.as_deref(), Some("0%"));
}

#[test]
fn emits_one_record_per_code_row() {
    let c = classifier();
    let outcome = parse_lines(
        &c,
        [
            "Chapter 1",
            "junk HEADING line",
            "01 01 21 00 10 00",
            "Pure-bred breeding animals",
            "01 01 29 00 00 00",
            "Other",
            "01 02 21 00 00 10",
        ],
    );
    assert_eq!(outcome.records.len(), 3);
}

#[test]
fn chapter_heading_and_trailing_rate_flow_into_record() {
    let c = classifier();
    let outcome = parse_lines(
        &c,
        ["Chapter 1", "01.01", "01 01 21 00 10 00  LIVE HORSES  5%"],
    );
    assert_eq!(outcome.records.len(), 1);

    let record = &outcome.records[0];
    assert_eq!(record.chapter.as_deref(), Some("1"));
    assert_eq!(record.heading.as_deref(), Some("01.01"));
    assert_eq!(record.code, "010121001000");
    assert_eq!(record.description_en, "LIVE HORSES");
    assert_eq!(record.description_ar, "");
    assert_eq!(record.duty_rate.as_deref(), Some("5%"));
}

#[test]
fn consecutive_code_rows_yield_empty_descriptions() {
    let c = classifier();
    let outcome = parse_lines(&c, ["01 01 21 00 10 00", "01 01 29 00 00 00"]);
    assert_eq!(outcome.records.len(), 2);
    for record in &outcome.records {
        assert_eq!(record.description_en, "");
        assert_eq!(record.description_ar, "");
    }
}

#[test]
fn trailing_description_attaches_to_last_record() {
    let c = classifier();
    let outcome = parse_lines(&c, ["01 01 21 00 10 00", "Other", "أخرى"]);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].description_en, "Other");
    assert_eq!(outcome.records[0].description_ar, "أخرى");
}

#[test]
fn fragments_are_segregated_by_script_in_original_order() {
    let c = classifier();
    let outcome = parse_lines(
        &c,
        [
            "01 01 21 00 10 00",
            "خيول حية",
            "LIVE HORSES",
            "غير معدة للذبح",
            "not for slaughter",
        ],
    );
    assert_eq!(outcome.records.len(), 1);

    let record = &outcome.records[0];
    assert_eq!(record.description_en, "LIVE HORSES not for slaughter");
    assert_eq!(record.description_ar, "خيول حية غير معدة للذبح");
    assert!(!contains_arabic(&record.description_en));
    assert!(contains_arabic(&record.description_ar));
}

#[test]
fn csv_output_round_trips() -> Result<()> {
    let c = classifier();
    let outcome = parse_lines(
        &c,
        [
            "Chapter 1",
            "01.01",
            "EFTA 0%",
            "01 01 21 00 10 00 LIVE HORSES 5%",
            "خيول حية",
            "01 01 29 00 00 00",
        ],
    );
    assert_eq!(outcome.records.len(), 2);

    let dir = tempdir()?;
    let path = dir.path().join("records.csv");
    write_csv(&path, &outcome.records)?;
    let reread: Vec<TariffRecord> = read_csv(&path)?;

    assert_eq!(reread, outcome.records);
    Ok(())
}
