//! Integration tests for despesas-core
//!
//! These tests exercise the fetch → filter → group → series workflow through
//! the public API, with an in-memory record source.

use despesas_core::{
    distinct_subthemes, distinct_themes, group_by_subtheme, group_by_theme,
    group_by_theme_and_subtheme, only_paid, Error, ExpenseRecord, ExpenseTable, FillPolicy,
    PaymentStatus, SeriesBuilder, StaticSource,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn rec(theme: &str, subtheme: &str, status: PaymentStatus, amount: Decimal) -> ExpenseRecord {
    ExpenseRecord::new(theme, subtheme, status, amount)
}

/// Mixed-status table with several themes and repeated subthemes
fn campinas_2019() -> Vec<ExpenseRecord> {
    vec![
        rec("Saúde", "Atenção Básica", PaymentStatus::Paid, dec!(1200.10)),
        rec("Saúde", "Hospitalar", PaymentStatus::Paid, dec!(830.00)),
        rec("Saúde", "Atenção Básica", PaymentStatus::Committed, dec!(5000)),
        rec("Saúde", "Atenção Básica", PaymentStatus::Paid, dec!(99.90)),
        rec("Educação", "Ensino Fundamental", PaymentStatus::Paid, dec!(4000.25)),
        rec("Educação", "Educação Infantil", PaymentStatus::Settled, dec!(310)),
        rec("Educação", "Educação Infantil", PaymentStatus::Paid, dec!(1500.75)),
        rec("Urbanismo", "Infra-Estrutura Urbana", PaymentStatus::Committed, dec!(77)),
        rec(
            "Administração",
            "Administração Geral",
            PaymentStatus::Other("Anulado".into()),
            dec!(12),
        ),
        rec("Administração", "Administração Geral", PaymentStatus::Paid, dec!(640.40)),
    ]
}

fn table() -> ExpenseTable {
    ExpenseTable::new("campinas", 2019, campinas_2019())
}

fn health_scenario(hospitals: Decimal, clinics: Decimal) -> Vec<ExpenseRecord> {
    vec![
        rec("Health", "Hospitals", PaymentStatus::Paid, hospitals),
        rec("Health", "Clinics", PaymentStatus::Paid, clinics),
        rec("Health", "Hospitals", PaymentStatus::Committed, dec!(999)),
    ]
}

// =============================================================================
// Aggregation Properties
// =============================================================================

#[test]
fn test_theme_totals_partition_paid_total() {
    let t = table();
    let paid_total: Decimal = t
        .iter()
        .filter(|r| r.status == PaymentStatus::Paid)
        .map(|r| r.amount)
        .sum();

    let summary = group_by_theme(&only_paid(&t)).unwrap();
    let theme_sum: Decimal = summary.iter().map(|(_, total)| total.total).sum();

    assert_eq!(theme_sum, paid_total);
    assert_eq!(summary.total().unwrap(), dec!(8271.40));
}

#[test]
fn test_theme_total_equals_sum_of_subthemes() {
    let paid = only_paid(&table());
    let summary = group_by_theme(&paid).unwrap();

    for theme in distinct_themes(&paid) {
        let subtotal: Decimal = group_by_subtheme(&paid, &theme).unwrap().values().sum();
        assert_eq!(summary.get(&theme).unwrap().total, subtotal, "theme {}", theme);
    }
}

#[test]
fn test_theme_subthemes_match_enumeration() {
    let paid = only_paid(&table());
    let summary = group_by_theme(&paid).unwrap();

    for (theme, total) in summary.iter() {
        assert_eq!(total.subthemes, distinct_subthemes(&paid, theme).unwrap());
    }
}

#[test]
fn test_only_paid_is_idempotent() {
    let once = only_paid(&table());
    let twice = only_paid(&once);
    assert_eq!(once, twice);
    assert_eq!(once.len(), 6);
}

#[test]
fn test_grouping_is_order_independent() {
    let original = campinas_2019();
    let expected = group_by_theme_and_subtheme(&table()).unwrap();

    let mut reversed = original.clone();
    reversed.reverse();
    let reversed = ExpenseTable::new("campinas", 2019, reversed);
    assert_eq!(group_by_theme_and_subtheme(&reversed).unwrap(), expected);

    for shift in 1..original.len() {
        let mut rotated = original.clone();
        rotated.rotate_left(shift);
        let rotated = ExpenseTable::new("campinas", 2019, rotated);
        assert_eq!(group_by_theme_and_subtheme(&rotated).unwrap(), expected);
        assert_eq!(
            group_by_theme(&rotated).unwrap(),
            group_by_theme(&table()).unwrap()
        );
    }
}

#[test]
fn test_themes_without_paid_lines_disappear() {
    let paid = only_paid(&table());
    assert!(!distinct_themes(&paid).contains("Urbanismo"));
    assert!(distinct_themes(&table()).contains("Urbanismo"));
    assert!(matches!(
        group_by_subtheme(&paid, "Urbanismo"),
        Err(Error::UnknownTheme { .. })
    ));
}

#[test]
fn test_health_scenario() {
    let t = ExpenseTable::new("city", 2019, health_scenario(dec!(100.50), dec!(50.25)));
    let paid = only_paid(&t);
    assert_eq!(paid.len(), 2);
    assert_eq!(group_by_theme(&paid).unwrap().get("Health").unwrap().total, dec!(150.75));
}

#[test]
fn test_amounts_beyond_decimal_range_are_an_error() {
    let csv = "ds_funcao_governo;ds_subfuncao_governo;tp_despesa;vl_despesa\n\
               X;A;Valor Pago;79228162514264337593543950335\n\
               X;A;Valor Pago;1\n";
    let records = despesas_core::source::parse_expense_csv(csv.as_bytes()).unwrap();
    let paid = only_paid(&ExpenseTable::new("campinas", 2019, records));

    assert!(matches!(group_by_theme(&paid), Err(Error::Overflow(_))));
    assert!(matches!(
        group_by_theme_and_subtheme(&paid),
        Err(Error::Overflow(_))
    ));
}

// =============================================================================
// Historical Series
// =============================================================================

#[tokio::test]
async fn test_themed_historical_two_years() {
    let source = StaticSource::new()
        .with_year("city", 2019, health_scenario(dec!(100.50), dec!(50.25)))
        .with_year("city", 2020, health_scenario(dec!(120.00), dec!(80.00)));

    let series = SeriesBuilder::new(&source)
        .themed_historical("city", &[2019, 2020], &["Health"])
        .await
        .unwrap();

    assert_eq!(series.years(), vec![2019, 2020]);
    assert_eq!(series.columns(), vec!["vl_despesa_Health"]);
    assert_eq!(
        series.column("vl_despesa_Health"),
        vec![Some(dec!(150.75)), Some(dec!(200.00))]
    );
}

#[tokio::test]
async fn test_themed_historical_keeps_year_order_and_duplicates() {
    let source = StaticSource::new()
        .with_year("city", 2019, health_scenario(dec!(1), dec!(1)))
        .with_year("city", 2020, health_scenario(dec!(2), dec!(2)));

    let series = SeriesBuilder::new(&source)
        .themed_historical("city", &[2020, 2019, 2020], &["Health"])
        .await
        .unwrap();

    assert_eq!(series.years(), vec![2020, 2019, 2020]);
    assert_eq!(
        series.column("vl_despesa_Health"),
        vec![Some(dec!(4)), Some(dec!(2)), Some(dec!(4))]
    );
}

#[tokio::test]
async fn test_themed_historical_missing_theme_fails_whole_series() {
    let source = StaticSource::new()
        .with_year("city", 2019, health_scenario(dec!(1), dec!(1)))
        .with_year(
            "city",
            2020,
            vec![rec("Education", "Schools", PaymentStatus::Paid, dec!(3))],
        );

    let err = SeriesBuilder::new(&source)
        .themed_historical("city", &[2019, 2020], &["Health"])
        .await
        .unwrap_err();

    assert_eq!(err.year(), Some(2020));
    assert!(matches!(err.root(), Error::UnknownTheme { theme } if theme == "Health"));
    assert!(err.to_string().contains("city/2020"));
}

#[tokio::test]
async fn test_themed_historical_theme_only_committed_is_unknown() {
    let source = StaticSource::new().with_year(
        "city",
        2019,
        vec![rec("Health", "Hospitals", PaymentStatus::Committed, dec!(10))],
    );

    let err = SeriesBuilder::new(&source)
        .themed_historical("city", &[2019], &["Health"])
        .await
        .unwrap_err();
    assert!(matches!(err.root(), Error::UnknownTheme { .. }));
}

#[tokio::test]
async fn test_fetch_failure_is_surfaced_with_year() {
    let source = StaticSource::new().with_year("city", 2019, health_scenario(dec!(1), dec!(1)));

    let err = SeriesBuilder::new(&source)
        .themed_historical("city", &[2019, 2021], &["Health"])
        .await
        .unwrap_err();

    assert_eq!(err.year(), Some(2021));
    assert!(matches!(err.root(), Error::NotFound { year: 2021, .. }));
}

#[tokio::test]
async fn test_subthemed_historical() {
    let source = StaticSource::new()
        .with_year("campinas", 2019, campinas_2019())
        .with_year(
            "campinas",
            2020,
            vec![
                rec("Saúde", "Atenção Básica", PaymentStatus::Paid, dec!(10)),
                rec("Educação", "Educação Infantil", PaymentStatus::Paid, dec!(20)),
            ],
        );

    let series = SeriesBuilder::new(&source)
        .subthemed_historical(
            "campinas",
            &[2019, 2020],
            &[
                ("Saúde", "Atenção Básica"),
                ("Educação", "Educação Infantil"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(
        series.columns(),
        vec![
            "vl_despesa_Saúde_Atenção Básica",
            "vl_despesa_Educação_Educação Infantil"
        ]
    );
    assert_eq!(
        series.column("vl_despesa_Saúde_Atenção Básica"),
        vec![Some(dec!(1300.00)), Some(dec!(10))]
    );
    assert_eq!(
        series.column("vl_despesa_Educação_Educação Infantil"),
        vec![Some(dec!(1500.75)), Some(dec!(20))]
    );
}

#[tokio::test]
async fn test_subthemed_historical_unknown_subtheme() {
    let source = StaticSource::new().with_year("campinas", 2019, campinas_2019());

    let err = SeriesBuilder::new(&source)
        .subthemed_historical("campinas", &[2019], &[("Saúde", "Vigilância Sanitária")])
        .await
        .unwrap_err();

    assert!(matches!(
        err.root(),
        Error::UnknownSubtheme { theme, subtheme }
            if theme == "Saúde" && subtheme == "Vigilância Sanitária"
    ));
}

#[tokio::test]
async fn test_all_subthemes_historical_columns_vary_by_year() {
    let source = StaticSource::new()
        .with_year(
            "city",
            2019,
            vec![
                rec("X", "A", PaymentStatus::Paid, dec!(1)),
                rec("X", "B", PaymentStatus::Paid, dec!(2)),
            ],
        )
        .with_year(
            "city",
            2020,
            vec![
                rec("X", "A", PaymentStatus::Paid, dec!(3)),
                rec("X", "C", PaymentStatus::Paid, dec!(4)),
                rec("X", "B", PaymentStatus::Committed, dec!(9)),
            ],
        );

    let series = SeriesBuilder::new(&source)
        .all_subthemes_historical("city", &[2019, 2020], &["X"])
        .await
        .unwrap();

    assert_eq!(
        series.columns(),
        vec!["vl_despesa_X_A", "vl_despesa_X_B", "vl_despesa_X_C"]
    );
    assert_eq!(series.column("vl_despesa_X_B"), vec![Some(dec!(2)), None]);
    assert_eq!(series.column("vl_despesa_X_C"), vec![None, Some(dec!(4))]);

    let dense = series.to_dense(FillPolicy::Zero).unwrap();
    assert_eq!(dense.rows[0].values, vec![Some(dec!(1)), Some(dec!(2)), Some(dec!(0))]);
    assert_eq!(dense.rows[1].values, vec![Some(dec!(3)), Some(dec!(0)), Some(dec!(4))]);

    assert!(matches!(
        series.to_dense(FillPolicy::Error),
        Err(Error::MissingCell { year: 2019, .. })
    ));
}

#[tokio::test]
async fn test_all_subthemes_historical_unknown_theme() {
    let source = StaticSource::new().with_year("campinas", 2019, campinas_2019());

    let err = SeriesBuilder::new(&source)
        .all_subthemes_historical("campinas", &[2019], &["Saúde", "Cultura"])
        .await
        .unwrap_err();

    assert!(matches!(err.root(), Error::UnknownTheme { theme } if theme == "Cultura"));
}

#[tokio::test]
async fn test_empty_year_list_gives_empty_series() {
    let source = StaticSource::new();
    let series = despesas_core::themed_historical(&source, "campinas", &[], &["Saúde"])
        .await
        .unwrap();
    assert!(series.is_empty());
    assert!(series.columns().is_empty());
}

#[tokio::test]
async fn test_free_functions_match_builder() {
    let source = StaticSource::new().with_year("campinas", 2019, campinas_2019());

    let from_fn = despesas_core::all_subthemes_historical(&source, "campinas", &[2019], &["Saúde"])
        .await
        .unwrap();
    let from_builder = SeriesBuilder::new(&source)
        .all_subthemes_historical("campinas", &[2019], &["Saúde"])
        .await
        .unwrap();
    assert_eq!(from_fn, from_builder);

    let pairs = [("Saúde".to_string(), "Hospitalar".to_string())];
    let series = despesas_core::subthemed_historical(&source, "campinas", &[2019], &pairs)
        .await
        .unwrap();
    assert_eq!(
        series.column("vl_despesa_Saúde_Hospitalar"),
        vec![Some(dec!(830.00))]
    );
}
