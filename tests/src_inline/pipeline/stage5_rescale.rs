use super::*;
use crate::model::indicator::{CORE_INDICATORS, IndicatorId};

fn imputed(rows: &[[Option<f64>; 3]], columns: Vec<IndicatorId>) -> Stage4Output {
    let countries = (0..rows.len()).map(|i| format!("C{i:02}")).collect();
    let mut m = IndicatorMatrix::new(countries, columns);
    let mut unscorable = Vec::new();
    for (r, row) in rows.iter().enumerate() {
        m.values[r] = row.to_vec();
        if row.iter().all(|v| v.is_none()) {
            unscorable.push(r);
        }
    }
    Stage4Output {
        imputed: vec![vec![false; 3]; rows.len()],
        matrix: m,
        unscorable,
        column_fallbacks: 0,
    }
}

#[test]
fn test_probit_reference_points() {
    assert_eq!(probit(0.5), 0.0);
    assert!((probit(0.975) - 1.959963984540054).abs() < 1e-8);
    assert!((probit(0.025) + 1.959963984540054).abs() < 1e-8);
    assert!((probit(1e-7) + 5.199337582192817).abs() < 1e-6);
    assert_eq!(probit(0.0), f64::NEG_INFINITY);
    assert_eq!(probit(1.0), f64::INFINITY);
}

#[test]
fn test_interp_clamps_and_takes_rightmost_duplicate() {
    let xp = [0.0, 1.0, 1.0, 2.0];
    let fp = [0.0, 0.25, 0.5, 1.0];
    assert_eq!(interp(-1.0, &xp, &fp), 0.0);
    assert_eq!(interp(3.0, &xp, &fp), 1.0);
    assert_eq!(interp(0.5, &xp, &fp), 0.125);
    assert_eq!(interp(1.0, &xp, &fp), 0.5);
    assert_eq!(interp(1.5, &xp, &fp), 0.75);
}

#[test]
fn test_quantile_uniform_ranks() {
    let values = [30.0, 10.0, 20.0, 40.0, 50.0];
    let u = quantile_transform(&values, 200, OutputDistribution::Uniform);
    let expected = [0.5, 0.0, 0.25, 0.75, 1.0];
    for (a, b) in u.iter().zip(expected.iter()) {
        assert!((a - b).abs() < 1e-12, "{a} vs {b}");
    }
}

#[test]
fn test_quantile_ties_share_the_middle_rank() {
    let values = [1.0, 2.0, 2.0, 3.0, 4.0];
    let u = quantile_transform(&values, 200, OutputDistribution::Uniform);
    assert_eq!(u[1], u[2]);
    assert!((u[1] - 0.375).abs() < 1e-12);
}

#[test]
fn test_quantile_normal_is_monotonic_and_clipped() {
    let values = [3.2, 0.5, 7.7, 7.7, 1.1, 12.0, 4.4, 0.0, 9.9, 2.5];
    let z = quantile_transform(&values, 200, OutputDistribution::Normal);
    for i in 0..values.len() {
        for j in 0..values.len() {
            if values[i] < values[j] {
                assert!(z[i] < z[j], "{} -> {} vs {} -> {}", values[i], z[i], values[j], z[j]);
            }
            if values[i] == values[j] {
                assert_eq!(z[i], z[j]);
            }
        }
    }
    let clip = probit(1.0 - (BOUNDS_THRESHOLD - f64::EPSILON));
    assert!((z[5] - clip).abs() < 1e-12);
    assert!((z[7] + clip).abs() < 1e-8);
    assert!(clip > 5.19 && clip < 5.21);
}

#[test]
fn test_quantile_median_maps_to_zero() {
    let values = [1.0, 2.0, 3.0, 4.0, 5.0];
    let z = quantile_transform(&values, 200, OutputDistribution::Normal);
    assert_eq!(z[2], 0.0);
    assert!((z[1] + z[3]).abs() < 1e-12);
}

#[test]
fn test_quantile_constant_column_is_centred() {
    let z = quantile_transform(&[4.0, 4.0, 4.0], 200, OutputDistribution::Normal);
    assert_eq!(z, vec![0.0, 0.0, 0.0]);
    let single = quantile_transform(&[4.0], 200, OutputDistribution::Normal);
    assert_eq!(single, vec![0.0]);
}

#[test]
fn test_fewer_quantiles_than_rows() {
    let values = (0..50).map(|i| (i * i) as f64).collect::<Vec<_>>();
    let u = quantile_transform(&values, 10, OutputDistribution::Uniform);
    assert_eq!(u[0], 0.0);
    assert_eq!(u[49], 1.0);
    for w in u.windows(2) {
        assert!(w[0] <= w[1]);
    }
}

#[test]
fn test_alternative_scalers() {
    let values = [1.0, 2.0, 3.0, 4.0, 5.0];
    let s = standard_scale(&values);
    assert!((s[0] + (2.0f64).sqrt()).abs() < 1e-12);
    assert_eq!(s[2], 0.0);
    assert_eq!(standard_scale(&[2.0, 2.0]), vec![0.0, 0.0]);

    assert_eq!(minmax_scale(&values), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    assert_eq!(minmax_scale(&[3.0, 3.0]), vec![0.0, 0.0]);

    // median 3, IQR 2
    assert_eq!(robust_scale(&values), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    assert_eq!(
        robust_scale(&[1.0, 1.0, 1.0, 1.0, 4.0]),
        vec![0.0, 0.0, 0.0, 0.0, 3.0]
    );
}

#[test]
fn test_run_stage5_skips_unscorable_rows() {
    let input = imputed(
        &[
            [Some(1.0), Some(10.0), Some(5.0)],
            [None, None, None],
            [Some(2.0), Some(30.0), Some(4.0)],
            [Some(3.0), Some(20.0), Some(6.0)],
        ],
        CORE_INDICATORS.to_vec(),
    );
    let out = run_stage5(&input, &IndexProfile::default_v1()).unwrap();
    assert!(out.matrix.row_all_missing(1));
    // middle of three values sits at the centre of the normal scale
    assert_eq!(out.matrix.get(2, 0), Some(0.0));
    assert_eq!(out.matrix.get(3, 1), Some(0.0));
    assert!(out.matrix.get(2, 1).unwrap() > 0.0);
    assert!(out.matrix.get(0, 1).unwrap() < 0.0);
}

#[test]
fn test_run_stage5_negates_more_is_better_columns() {
    let input = imputed(
        &[
            [Some(1.0), Some(100.0), Some(5.0)],
            [Some(2.0), Some(300.0), Some(4.0)],
            [Some(3.0), Some(200.0), Some(6.0)],
        ],
        vec![
            IndicatorId::InsufficientFood,
            IndicatorId::Reserves,
            IndicatorId::Wasting,
        ],
    );
    let mut profile = IndexProfile::default_v1();
    profile.scaler = ScalerKind::Minmax;
    let out = run_stage5(&input, &profile).unwrap();
    // more reserves is better, so the largest reserve ranks least tough
    assert_eq!(out.matrix.get(1, 1), Some(-1.0));
    assert_eq!(out.matrix.get(0, 1), Some(-0.0));
    assert_eq!(out.matrix.get(2, 0), Some(1.0));
}

#[test]
fn test_run_stage5_rejects_leftover_gaps() {
    let input = imputed(
        &[
            [Some(1.0), None, Some(5.0)],
            [Some(2.0), Some(3.0), Some(4.0)],
        ],
        CORE_INDICATORS.to_vec(),
    );
    let err = run_stage5(&input, &IndexProfile::default_v1()).unwrap_err();
    assert!(matches!(
        err,
        RescaleError::MissingValue { ref country, indicator: "inflation" } if country == "C00"
    ));
}
