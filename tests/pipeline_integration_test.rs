// ==========================================
// Import pipeline integration tests
// ==========================================
// File → schema resolution → validation → classification →
// aggregation, end to end on real CSV files.
// ==========================================


use billing_import_engine::domain::money::Money;
use billing_import_engine::domain::types::{AmountPolicy, CanonicalField, GroupKey};
use billing_import_engine::importer::error::ImportError;
use billing_import_engine::{ImportPipeline, UniversalFileParser};
use test_helpers::{standard_profile, write_csv};

fn bucket(category: &str, with_adjustment: bool) -> GroupKey {
    GroupKey::Bucket {
        category: category.to_string(),
        with_adjustment,
    }
}

#[test]
fn test_mixed_batch_splits_into_buckets() {
    let file = write_csv(
        "Case Number,Category,Amount,Adjustment",
        &[
            "C-1,X,100.00,",
            "C-2,X,50.00,-10.00",
            "C-3,y,200.00,",
            "C-4,Other,75.00,",
        ],
    );
    let sheet = UniversalFileParser.parse(file.path()).unwrap();
    let profile = standard_profile();
    let rule_set = profile.rule_sets[0].clone();

    let outcome = ImportPipeline::run(&sheet, &profile, &rule_set).unwrap();
    assert!(outcome.is_accepted());
    assert_eq!(outcome.summary.total_rows, 4);
    assert_eq!(outcome.summary.valid_rows, 4);
    assert!(outcome.summary.file_name.ends_with(".csv"));

    let keys: Vec<GroupKey> = outcome.groups.iter().map(|g| g.key.clone()).collect();
    assert_eq!(
        keys,
        vec![
            bucket("X", false),
            bucket("X", true),
            bucket("Y", false),
            GroupKey::CatchAll,
        ]
    );

    let x_plain = &outcome.groups[0];
    assert_eq!(x_plain.total, Money::from_cents(10_000));
    // The adjustment selects the bucket variant; the total is still
    // the plain sum of member amounts.
    let x_adjusted = &outcome.groups[1];
    assert_eq!(x_adjusted.total, Money::from_cents(5_000));
    assert!(x_adjusted.tax_profile.has_withholding());
    assert!(!x_plain.tax_profile.has_withholding());
}

#[test]
fn test_category_matching_is_case_and_whitespace_insensitive() {
    let file = write_csv(
        "Case Number,Category,Amount",
        &["C-1,  x ,100.00", "C-2,X,50.00"],
    );
    let sheet = UniversalFileParser.parse(file.path()).unwrap();
    let profile = standard_profile();
    let rule_set = profile.rule_sets[0].clone();

    let outcome = ImportPipeline::run(&sheet, &profile, &rule_set).unwrap();
    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.groups[0].total, Money::from_cents(15_000));
}

#[test]
fn test_alias_and_substring_header_resolution() {
    // "Fee" is an exact alias for Amount; "Case No." resolves by
    // case-insensitive substring against the "Case No" alias.
    let file = write_csv("Case No.,Type,Fee", &["C-1,X,100.00"]);
    let sheet = UniversalFileParser.parse(file.path()).unwrap();
    let profile = standard_profile();
    let rule_set = profile.rule_sets[0].clone();

    let outcome = ImportPipeline::run(&sheet, &profile, &rule_set).unwrap();
    assert!(outcome.is_accepted());
    assert_eq!(
        outcome.mapping.header_for(CanonicalField::Amount),
        Some("Fee")
    );
    assert_eq!(
        outcome.mapping.header_for(CanonicalField::CaseNumber),
        Some("Case No.")
    );
}

#[test]
fn test_missing_required_column_fails_before_validation() {
    let file = write_csv("Case Number,Category", &["C-1,X"]);
    let sheet = UniversalFileParser.parse(file.path()).unwrap();
    let profile = standard_profile();
    let rule_set = profile.rule_sets[0].clone();

    let err = ImportPipeline::run(&sheet, &profile, &rule_set).unwrap_err();
    match err {
        ImportError::SchemaResolution { missing } => {
            assert_eq!(missing, vec![CanonicalField::Amount]);
        }
        other => panic!("expected schema resolution error, got {other}"),
    }
}

#[test]
fn test_any_invalid_row_rejects_whole_batch() {
    let file = write_csv(
        "Case Number,Category,Amount",
        &["C-1,X,100.00", "C-2,X,not-a-number", "C-3,Y,-5.00"],
    );
    let sheet = UniversalFileParser.parse(file.path()).unwrap();
    let profile = standard_profile();
    let rule_set = profile.rule_sets[0].clone();

    let outcome = ImportPipeline::run(&sheet, &profile, &rule_set).unwrap();
    assert!(!outcome.is_accepted());
    assert!(outcome.groups.is_empty());
    assert_eq!(outcome.summary.error_rows, 2);

    // Header is row 1, so the first data row is row 2.
    let rows: Vec<usize> = outcome.report.errors.iter().map(|e| e.row_number).collect();
    assert_eq!(rows, vec![3, 4]);
}

#[test]
fn test_error_report_truncates_after_five() {
    let rows: Vec<String> = (0..8).map(|i| format!("C-{i},X,bad")).collect();
    let row_refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    let file = write_csv("Case Number,Category,Amount", &row_refs);
    let sheet = UniversalFileParser.parse(file.path()).unwrap();
    let profile = standard_profile();
    let rule_set = profile.rule_sets[0].clone();

    let outcome = ImportPipeline::run(&sheet, &profile, &rule_set).unwrap();
    assert_eq!(outcome.report.errors.len(), 8);
    assert_eq!(outcome.report.shown_errors.len(), 5);
    assert_eq!(outcome.report.truncated_count, 3);
}

#[test]
fn test_duplicate_case_numbers_within_batch_rejected() {
    let file = write_csv(
        "Case Number,Category,Amount",
        &["C-1,X,100.00", "C-1,Y,50.00"],
    );
    let sheet = UniversalFileParser.parse(file.path()).unwrap();
    let profile = standard_profile();
    let rule_set = profile.rule_sets[0].clone();

    let outcome = ImportPipeline::run(&sheet, &profile, &rule_set).unwrap();
    assert!(!outcome.is_accepted());
    assert_eq!(outcome.report.errors.len(), 1);
    assert_eq!(outcome.report.errors[0].row_number, 3);
}

#[test]
fn test_zero_total_group_skipped_siblings_proceed() {
    // NonZero policy admits credit lines; a group that cancels to
    // exactly zero is excluded while its siblings still bill.
    let mut profile = standard_profile();
    profile.amount_policy = AmountPolicy::NonZero;
    let rule_set = profile.rule_sets[0].clone();

    let file = write_csv(
        "Case Number,Category,Amount",
        &["C-1,X,100.00", "C-2,X,-100.00", "C-3,Y,40.00"],
    );
    let sheet = UniversalFileParser.parse(file.path()).unwrap();

    let outcome = ImportPipeline::run(&sheet, &profile, &rule_set).unwrap();
    assert!(outcome.is_accepted());
    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.groups[0].key, bucket("Y", false));
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].key, bucket("X", false));
    assert_eq!(outcome.skipped[0].total, Money::ZERO);
}

#[test]
fn test_unmatched_category_excluded_with_warning() {
    // Strict rule set without a catch-all: unknown categories are
    // warned about and excluded, never silently dropped.
    let mut profile = standard_profile();
    profile.rule_sets[0].rules.pop();
    let rule_set = profile.rule_sets[0].clone();

    let file = write_csv(
        "Case Number,Category,Amount",
        &["C-1,X,100.00", "C-2,Mystery,50.00"],
    );
    let sheet = UniversalFileParser.parse(file.path()).unwrap();

    let outcome = ImportPipeline::run(&sheet, &profile, &rule_set).unwrap();
    assert!(outcome.is_accepted());
    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].row_number, 3);
    assert_eq!(outcome.summary.excluded_rows, 1);
}

#[test]
fn test_group_totals_independent_of_row_order() {
    let profile = standard_profile();
    let rule_set = profile.rule_sets[0].clone();

    let forward = write_csv(
        "Case Number,Category,Amount",
        &["C-1,X,10.01", "C-2,X,20.02", "C-3,X,30.03"],
    );
    let reversed = write_csv(
        "Case Number,Category,Amount",
        &["C-3,X,30.03", "C-2,X,20.02", "C-1,X,10.01"],
    );

    let a = ImportPipeline::run(
        &UniversalFileParser.parse(forward.path()).unwrap(),
        &profile,
        &rule_set,
    )
    .unwrap();
    let b = ImportPipeline::run(
        &UniversalFileParser.parse(reversed.path()).unwrap(),
        &profile,
        &rule_set,
    )
    .unwrap();

    assert_eq!(a.groups.len(), b.groups.len());
    assert_eq!(a.groups[0].total, b.groups[0].total);
    assert_eq!(a.groups[0].total, Money::from_cents(6_006));
}
