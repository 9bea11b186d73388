use super::*;
use crate::model::indicator::CORE_INDICATORS;

fn matrix(rows: &[[Option<f64>; 3]]) -> IndicatorMatrix {
    let countries = (0..rows.len()).map(|i| format!("C{i:02}")).collect();
    let mut m = IndicatorMatrix::new(countries, CORE_INDICATORS.to_vec());
    for (r, row) in rows.iter().enumerate() {
        m.values[r] = row.to_vec();
    }
    m
}

#[test]
fn test_nan_euclidean_scales_by_common_features() {
    let a = [Some(1.0), None, Some(3.0)];
    let b = [Some(2.0), Some(5.0), Some(5.0)];
    // sqrt(3 / 2 * (1 + 4))
    let d = nan_euclidean(&a, &b).unwrap();
    assert!((d - (7.5f64).sqrt()).abs() < 1e-12);
    assert!(nan_euclidean(&[None, Some(1.0)], &[Some(1.0), None]).is_none());
}

#[test]
fn test_knn_fills_every_scorable_cell() {
    let m = matrix(&[
        [Some(10.0), Some(5.0), None],
        [None, Some(6.0), Some(8.0)],
        [Some(30.0), None, Some(9.0)],
        [Some(12.0), Some(4.0), Some(7.0)],
        [None, None, None],
    ]);
    let out = knn_impute(&m, 10).unwrap();
    assert_eq!(out.unscorable, vec![4]);
    for row in 0..4 {
        for col in 0..3 {
            assert!(out.matrix.values[row][col].is_some(), "row {row} col {col}");
        }
    }
    // flagged rows are left missing, never zero-filled
    assert!(out.matrix.row_all_missing(4));
    assert_eq!(out.imputed_cells(), 3);
    assert!(out.imputed[0][2] && out.imputed[1][0] && out.imputed[2][1]);
    assert!(!out.imputed[3][0]);
    assert!(!out.is_scorable(4));
    // input untouched
    assert_eq!(m.values[0][2], None);
}

#[test]
fn test_knn_imputed_inflation_within_neighbor_range() {
    let mut rows = Vec::new();
    for i in 0..12 {
        let x = i as f64;
        rows.push([Some(x * 2.0), Some(3.0 + x * 1.5), Some(5.0 + x)]);
    }
    rows.push([Some(9.0), None, Some(9.5)]);
    let m = matrix(&rows);
    let target = rows.len() - 1;

    let donors = nearest_donors(&m, target, 1, 10);
    assert_eq!(donors.len(), 10);
    let neighbor_values = donors
        .iter()
        .map(|&(r, _)| m.values[r][1].unwrap())
        .collect::<Vec<_>>();
    let lo = neighbor_values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = neighbor_values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!(lo < hi);

    let out = knn_impute(&m, 10).unwrap();
    let imputed = out.matrix.values[target][1].unwrap();
    assert!(imputed > lo && imputed < hi, "{imputed} not in ({lo}, {hi})");
    assert!((imputed - mean(&neighbor_values)).abs() < 1e-12);
}

#[test]
fn test_donor_ties_break_by_row_order() {
    let m = matrix(&[
        [Some(1.0), Some(10.0), Some(1.0)],
        [Some(1.0), Some(20.0), Some(1.0)],
        [Some(1.0), Some(30.0), Some(1.0)],
        [Some(1.0), None, Some(1.0)],
    ]);
    let donors = nearest_donors(&m, 3, 1, 2);
    assert_eq!(donors.iter().map(|d| d.0).collect::<Vec<_>>(), vec![0, 1]);
    let out = knn_impute(&m, 2).unwrap();
    assert_eq!(out.matrix.values[3][1], Some(15.0));
}

#[test]
fn test_column_mean_when_no_neighbor_shares_a_feature() {
    let m = matrix(&[
        [Some(2.0), None, None],
        [None, Some(4.0), Some(1.0)],
        [None, Some(8.0), Some(3.0)],
    ]);
    let out = knn_impute(&m, 10).unwrap();
    // row 0 shares no feature with the rows observing columns 1 and 2
    assert_eq!(out.matrix.values[0][1], Some(6.0));
    assert_eq!(out.matrix.values[0][2], Some(2.0));
    assert_eq!(out.column_fallbacks, 4);
}

#[test]
fn test_errors() {
    let m = matrix(&[[Some(1.0), None, Some(2.0)], [Some(3.0), None, Some(4.0)]]);
    assert!(matches!(
        run_stage4(&m, &[IncomeGroup::Low, IncomeGroup::Low], &IndexProfile::default_v1()),
        Err(ImputeError::EmptyColumn("inflation"))
    ));
    let m = matrix(&[[Some(1.0), Some(1.0), Some(2.0)]]);
    assert!(matches!(knn_impute(&m, 0), Err(ImputeError::ZeroNeighbors)));
}

#[test]
fn test_median_imputers() {
    let m = matrix(&[
        [Some(1.0), Some(1.0), Some(1.0)],
        [Some(2.0), Some(3.0), Some(1.0)],
        [Some(9.0), Some(10.0), Some(1.0)],
        [Some(4.0), None, Some(1.0)],
        [Some(5.0), None, Some(1.0)],
    ]);
    let out = median_impute(&m, None);
    assert_eq!(out.matrix.values[3][1], Some(3.0));
    assert_eq!(out.column_fallbacks, 0);

    let groups = [
        IncomeGroup::Low,
        IncomeGroup::Low,
        IncomeGroup::LowerMiddle,
        IncomeGroup::Low,
        IncomeGroup::UpperMiddle,
    ];
    let out = median_impute(&m, Some(&groups));
    assert_eq!(out.matrix.values[3][1], Some(2.0));
    // no upper-middle observation: column median
    assert_eq!(out.matrix.values[4][1], Some(3.0));
    assert_eq!(out.column_fallbacks, 1);

    let mut profile = IndexProfile::default_v1();
    profile.imputer = ImputerKind::IncomeMedian;
    let via_stage = run_stage4(&m, &groups, &profile).unwrap();
    assert_eq!(via_stage.matrix, out.matrix);
}
