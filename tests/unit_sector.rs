// Unit tests for sector classification.
//
// Covers the keyword table (ordering, whole-word vs stem matching), the
// same-name propagation pass, and the full two-pass classification over an
// in-memory sheet.

use callscore::sector::{
    assign_by_keyword, classify_table, propagate_known, SectorClassifier, DEFAULT_NAME_COLUMN,
    DEFAULT_SECTOR_COLUMN,
};
use callscore::sheet::{Cell, Table};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ============================================================
// Keyword matching
// ============================================================

#[test]
fn whole_word_keeps_biotechnology_out_of_technology() {
    let c = SectorClassifier::default();
    assert_eq!(c.classify("Global Biotechnology Inc"), Some("Healthcare"));
    assert_eq!(c.classify("Global Technology Inc"), Some("Technology"));
}

#[test]
fn electr_is_a_stem() {
    let c = SectorClassifier::default();
    assert_eq!(c.classify("Acme Electronics"), Some("Industrials"));
    assert_eq!(c.classify("Acme Electrical Works"), Some("Industrials"));
    assert_eq!(c.classify("Acme Electric"), Some("Industrials"));
}

#[test]
fn first_rule_in_table_order_wins() {
    let c = SectorClassifier::default();
    assert_eq!(
        c.matching_rule("Asset Capital Partners"),
        Some(("CAPITAL", "Financials"))
    );
    assert_eq!(c.matching_rule("Delta Air Systems"), Some(("AIR", "Industrials")));
}

#[test]
fn matching_ignores_case() {
    let c = SectorClassifier::default();
    assert_eq!(c.classify("northern energy"), Some("Energy"));
    assert_eq!(c.classify("Fairview Holdings"), None);
}

#[test]
fn non_ascii_keywords_match_whole_words() {
    let c = SectorClassifier::from_pairs([("Café", "Consumer"), ("ÉNERG*", "Energy")]).unwrap();
    assert_eq!(c.classify("Grand Café Holdings"), Some("Consumer"));
    assert_eq!(c.classify("Cafés Unis"), None);
    assert_eq!(c.classify("Société Énergétique"), Some("Energy"));
    assert_eq!(c.classify("Désénergie"), None);
}

#[test]
fn custom_rules_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keywords.json");
    std::fs::write(
        &path,
        r#"[["bank", "Financials"], ["mine*", "Basic Materials"]]"#,
    )
    .unwrap();

    let c = SectorClassifier::load(&path).unwrap();
    assert_eq!(c.len(), 2);
    assert_eq!(c.classify("First Bank"), Some("Financials"));
    assert_eq!(c.classify("Mineral Resources"), Some("Basic Materials"));
    assert_eq!(c.classify("Bankside Software"), None);
}

#[test]
fn malformed_rules_are_rejected() {
    assert!(SectorClassifier::from_pairs([("", "Energy")]).is_err());
    assert!(SectorClassifier::from_pairs([("*", "Energy")]).is_err());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keywords.json");
    std::fs::write(&path, r#"{"bank": "Financials"}"#).unwrap();
    assert!(SectorClassifier::load(&path).is_err());
}

// ============================================================
// Propagation and keyword passes
// ============================================================

#[test]
fn propagation_fills_same_name_rows() {
    let n = names(&["Acme", "Beta", "Acme", "Acme"]);
    let mut sectors = vec![None, None, Some("Energy".to_string()), None];

    let filled = propagate_known(&n, &mut sectors);
    assert_eq!(filled, 2);
    assert_eq!(sectors[0].as_deref(), Some("Energy"));
    assert_eq!(sectors[1], None);
    assert_eq!(sectors[3].as_deref(), Some("Energy"));
}

#[test]
fn propagation_first_known_sector_wins() {
    let n = names(&["Acme", "Acme", "Acme"]);
    let mut sectors = vec![
        Some("Energy".to_string()),
        Some("Utilities".to_string()),
        None,
    ];
    propagate_known(&n, &mut sectors);
    assert_eq!(sectors[2].as_deref(), Some("Energy"));
    assert_eq!(sectors[1].as_deref(), Some("Utilities"));
}

#[test]
fn propagation_skips_blank_names() {
    let n = names(&["", "", "  "]);
    let mut sectors = vec![Some("Energy".to_string()), None, None];
    assert_eq!(propagate_known(&n, &mut sectors), 0);
    assert_eq!(sectors[1], None);
}

#[test]
fn keyword_pass_never_overwrites() {
    let c = SectorClassifier::default();
    let n = names(&["Acme Software", "Acme Software"]);
    let mut sectors = vec![Some("Consumer".to_string()), None];

    assert_eq!(assign_by_keyword(&c, &n, &mut sectors), 1);
    assert_eq!(sectors[0].as_deref(), Some("Consumer"));
    assert_eq!(sectors[1].as_deref(), Some("Technology"));
}

// ============================================================
// Full table classification
// ============================================================

#[test]
fn classify_table_runs_both_passes() {
    let mut table = Table::new(
        vec![
            DEFAULT_NAME_COLUMN.to_string(),
            DEFAULT_SECTOR_COLUMN.to_string(),
        ],
        vec![
            vec!["Zeta Holdings".into(), "Utilities".into()],
            vec!["Zeta Holdings".into(), Cell::Empty],
            vec!["Nova Pharma".into(), " ".into()],
            vec!["Orbit Gold Mining".into(), Cell::Empty],
            vec!["Plain Name".into(), Cell::Empty],
            vec!["Acme Technologies".into(), "Technology Hardware".into()],
        ],
    );

    let report = classify_table(
        &mut table,
        &SectorClassifier::default(),
        DEFAULT_NAME_COLUMN,
        DEFAULT_SECTOR_COLUMN,
    )
    .unwrap();

    assert_eq!(report.rows, 6);
    assert_eq!(report.already_classified, 2);
    assert_eq!(report.filled_by_propagation, 1);
    assert_eq!(report.filled_by_keyword, 2);
    assert_eq!(report.unclassified, 1);

    let sectors: Vec<String> = table
        .column(DEFAULT_SECTOR_COLUMN)
        .unwrap()
        .into_iter()
        .map(|c| c.to_string())
        .collect();
    assert_eq!(
        sectors,
        vec![
            "Utilities",
            "Utilities",
            "Healthcare",
            "Industrials",
            "",
            "Technology Hardware",
        ]
    );
}

#[test]
fn classify_table_creates_missing_sector_column() {
    let mut table = Table::new(
        vec!["company_name".to_string()],
        vec![vec!["Acme Software".into()], vec!["Plain Name".into()]],
    );

    let report =
        classify_table(&mut table, &SectorClassifier::default(), "company_name", "sector").unwrap();

    assert_eq!(report.filled_by_keyword, 1);
    assert_eq!(table.headers, vec!["company_name", "sector"]);
    assert_eq!(table.rows[0][1], Cell::from("Technology"));
    assert_eq!(table.rows[1][1], Cell::Empty);
}

#[test]
fn classify_table_requires_name_column() {
    let mut table = Table::new(vec!["name".to_string()], vec![vec!["Acme".into()]]);
    let result = classify_table(
        &mut table,
        &SectorClassifier::default(),
        "company_name",
        "sector",
    );
    assert!(result.is_err());
}
