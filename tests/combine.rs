use anyhow::Result;
use serde_json::json;
use std::fs;
use tarex::clean::EntryCleaner;
use tarex::combine::{DEFAULT_PAGE_PATTERN, combine_page_files};
use tarex::model::PagePayload;
use tempfile::tempdir;

#[test]
fn combine_orders_pages_and_tolerates_bad_payloads() -> Result<()> {
    let dir = tempdir()?;
    let valid_page = r#"{"page_number": 1, "entries": []}"#;

    fs::write(dir.path().join("page_1_result.json"), valid_page)?;
    fs::write(dir.path().join("page_2_result.json"), "{not json")?;
    // same bytes as page 1: a worker delivered the page twice
    fs::write(dir.path().join("page_3_result.json"), valid_page)?;
    fs::write(
        dir.path().join("page_10_result.json"),
        r#"{"page_number": 10, "entries": [{"H.S. Code": "01 01 21 00 10 00"}]}"#,
    )?;
    fs::write(dir.path().join("unrelated.txt"), "ignored")?;

    let (document, report) = combine_page_files(dir.path(), DEFAULT_PAGE_PATTERN)?;

    assert_eq!(report.files_matched, 4);
    assert_eq!(report.pages_merged, 2);
    assert_eq!(report.pages_malformed, 1);
    assert_eq!(report.duplicates_dropped, 1);

    let numbers: Vec<Option<u32>> = document.pages.iter().map(|p| p.page_number).collect();
    assert_eq!(numbers, vec![Some(1), Some(2), Some(10)]);

    let malformed = &document.pages[1];
    assert!(malformed.entries.is_empty());
    assert_eq!(malformed.raw_content.as_deref(), Some("{not json"));
    assert!(malformed.parse_error.is_some());

    Ok(())
}

#[test]
fn combine_fills_missing_page_number_from_file_name() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("page_7_result.json"), r#"{"entries": []}"#)?;

    let (document, report) = combine_page_files(dir.path(), DEFAULT_PAGE_PATTERN)?;

    assert_eq!(report.pages_merged, 1);
    assert_eq!(document.pages[0].page_number, Some(7));
    Ok(())
}

#[test]
fn clean_standardizes_fields_and_removes_duplicates() {
    let pages = vec![
        PagePayload {
            page_number: Some(1),
            entries: vec![
                json!({
                    "H.S. Code": "01.01.21.00.10.00",
                    "Description in English": "LIVE HORSES",
                    "Description in Arabic": "خيول حية",
                    "Duty Rate": "5",
                    "SFTA": "A",
                    "SG": "-",
                    "URA": "ABCD"
                }),
                json!({"Description in English": "no code here"}),
            ],
            raw_content: None,
            parse_error: None,
        },
        PagePayload {
            page_number: Some(2),
            entries: vec![
                json!({"hs code": "01.01.21.00.10.00", "description": "LIVE HORSES"}),
                json!({"code": "0102", "Duty Rate": null, "SG": "5%"}),
                json!({"code": "0103", "rate": "Free"}),
            ],
            raw_content: None,
            parse_error: None,
        },
        PagePayload {
            page_number: Some(3),
            entries: Vec::new(),
            raw_content: Some("garbled scan".to_string()),
            parse_error: Some("expected value".to_string()),
        },
    ];

    let cleaner = EntryCleaner::new();
    let (entries, report) = cleaner.clean_pages(&pages);

    assert_eq!(report.entries_in, 5);
    assert_eq!(report.entries_out, 3);
    assert_eq!(report.entries_without_code, 1);
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(report.misplaced_rates_fixed, 1);

    let first = &entries[0];
    assert_eq!(first.code.as_deref(), Some("01.01.21.00.10.00"));
    assert_eq!(first.description_en.as_deref(), Some("LIVE HORSES"));
    assert_eq!(first.description_ar.as_deref(), Some("خيول حية"));
    assert_eq!(first.duty_rate.as_deref(), Some("5%"));
    assert_eq!(first.preference_a.as_deref(), Some("A"));
    assert_eq!(first.preference_b, None);
    assert_eq!(first.preference_c, None);
    assert_eq!(first.page_number, Some(1));

    // the percentage in the SG column was a misplaced duty rate
    let misplaced = &entries[1];
    assert_eq!(misplaced.code.as_deref(), Some("0102"));
    assert_eq!(misplaced.duty_rate.as_deref(), Some("5%"));
    assert_eq!(misplaced.preference_b, None);

    let free = &entries[2];
    assert_eq!(free.duty_rate.as_deref(), Some("0%"));

    assert_eq!(report.stats.total_entries, 3);
    assert_eq!(report.stats.entries_with_duty_rate, 3);
    assert_eq!(report.stats.unique_codes, 3);
    assert_eq!(report.stats.pages_processed, 2);
}

#[test]
fn clean_normalizes_rate_spellings() {
    let cleaner = EntryCleaner::new();
    let pages = vec![PagePayload {
        page_number: None,
        entries: vec![
            json!({"code": "01", "duty rate": "duty free"}),
            json!({"code": "02", "duty rate": "12.5"}),
            json!({"code": "03", "duty rate": "5 %"}),
        ],
        raw_content: None,
        parse_error: None,
    }];

    let (entries, _) = cleaner.clean_pages(&pages);
    let rates: Vec<_> = entries.iter().map(|e| e.duty_rate.as_deref()).collect();
    assert_eq!(rates, vec![Some("0%"), Some("12.5%"), Some("5%")]);
}
