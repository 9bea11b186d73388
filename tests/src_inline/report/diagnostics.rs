use super::*;
use crate::model::indicator::{CONTEXT_INDICATORS, CORE_INDICATORS};

fn build(rows: &[[Option<f64>; 6]]) -> (IndicatorMatrix, IndicatorMatrix) {
    let countries = (0..rows.len())
        .map(|i| format!("C{i:02}"))
        .collect::<Vec<_>>();
    let mut core = IndicatorMatrix::new(countries.clone(), CORE_INDICATORS.to_vec());
    let mut context = IndicatorMatrix::new(countries, CONTEXT_INDICATORS.to_vec());
    for (r, row) in rows.iter().enumerate() {
        core.values[r] = row[..3].to_vec();
        context.values[r] = row[3..].to_vec();
    }
    (core, context)
}

#[test]
fn test_missing_and_zero_shares() {
    let (core, context) = build(&[
        [Some(1.0), Some(0.0), None, Some(5.0), None, None],
        [Some(2.0), Some(0.0), Some(1.0), None, None, None],
        [None, Some(3.0), Some(2.0), Some(6.0), None, None],
        [Some(4.0), None, Some(3.0), Some(7.0), None, None],
    ]);
    let groups = [
        IncomeGroup::Low,
        IncomeGroup::Low,
        IncomeGroup::LowerMiddle,
        IncomeGroup::LowerMiddle,
    ];
    let d = compute_diagnostics(&core, &context, &groups);
    assert_eq!(d.columns.len(), 6);

    let food = &d.columns[0];
    assert_eq!(food.key, "insufficient_food");
    assert!(food.core);
    assert_eq!(food.n_observed, 3);
    assert_eq!(food.missing_share, 0.25);
    assert_eq!(food.missing_countries, vec!["C02"]);
    assert_eq!(food.missing_share_by_income_group.get("low"), Some(&0.0));
    assert_eq!(food.missing_share_by_income_group.get("lower_middle"), Some(&0.5));

    let inflation = &d.columns[1];
    assert_eq!(inflation.zero_share, 0.5);

    let debt = &d.columns[4];
    assert!(!debt.core);
    assert_eq!(debt.missing_share, 1.0);
    assert!(debt.collinear_with.is_empty());
    assert!(debt.outliers_iqr.is_empty());

    let gaps = d
        .rows_with_gaps
        .iter()
        .map(|r| (r.iso_code.as_str(), r.missing_share))
        .collect::<Vec<_>>();
    assert_eq!(gaps, vec![("C00", 0.33), ("C02", 0.33), ("C03", 0.33)]);
}

#[test]
fn test_outlier_rules() {
    let mut values = vec![10.0; 11];
    values.push(1000.0);
    values[0] = 9.0;
    values[1] = 11.0;
    let rows = values
        .iter()
        .map(|&v| [Some(v), Some(1.0), Some(1.0), None, None, None])
        .collect::<Vec<_>>();
    let (core, context) = build(&rows);
    let groups = vec![IncomeGroup::Low; rows.len()];
    let d = compute_diagnostics(&core, &context, &groups);
    assert_eq!(d.columns[0].outliers_3sigma, vec!["C11"]);
    assert_eq!(d.columns[0].outliers_iqr, vec!["C00", "C01", "C11"]);

    assert_eq!(iqr_bounds(&[1.0, 2.0, 3.0, 4.0, 5.0]), Some((-1.0, 7.0)));
    assert!(sigma_bounds(&[1.0]).is_none());
}

#[test]
fn test_collinearity_is_symmetric() {
    let (core, context) = build(&[
        [Some(1.0), Some(2.0), Some(5.0), Some(10.0), None, None],
        [Some(2.0), Some(4.1), Some(1.0), Some(8.0), None, None],
        [Some(3.0), Some(5.9), Some(4.0), Some(6.0), None, None],
        [Some(4.0), Some(8.0), Some(2.0), Some(4.0), None, None],
    ]);
    let groups = vec![IncomeGroup::Low; 4];
    let d = compute_diagnostics(&core, &context, &groups);

    let food = d.columns[0]
        .collinear_with
        .iter()
        .map(|c| c.key)
        .collect::<Vec<_>>();
    assert_eq!(food, vec!["inflation", "reserves_per_capita"]);
    assert_eq!(d.columns[3].collinear_with[0].key, "insufficient_food");
    assert_eq!(d.columns[3].collinear_with[0].pearson, -1.0);
    assert!(d.columns[2].collinear_with.iter().all(|c| c.key != "insufficient_food"));

    let pairs = d.collinear_pairs();
    assert!(pairs.contains(&("inflation".to_string(), "insufficient_food".to_string())));
    assert!(pairs.contains(&("insufficient_food".to_string(), "reserves_per_capita".to_string())));
}
