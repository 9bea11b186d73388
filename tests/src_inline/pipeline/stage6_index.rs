use super::*;
use crate::model::indicator::IndicatorId;

fn rescaled(rows: &[Vec<Option<f64>>], columns: Vec<IndicatorId>) -> IndicatorMatrix {
    let countries = (0..rows.len()).map(|i| format!("C{i:02}")).collect();
    let mut m = IndicatorMatrix::new(countries, columns);
    for (r, row) in rows.iter().enumerate() {
        m.values[r] = row.clone();
    }
    m
}

fn core(rows: &[[Option<f64>; 3]]) -> IndicatorMatrix {
    let rows = rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>();
    rescaled(&rows, CORE_INDICATORS.to_vec())
}

#[test]
fn test_score_is_mean_and_ranks_descend() {
    let m = core(&[
        [Some(0.3), Some(1.2), Some(-0.6)],
        [Some(2.0), Some(1.0), Some(0.0)],
        [Some(-1.0), Some(-0.5), Some(-0.3)],
    ]);
    let scores = compute_index(&m).unwrap();

    assert_eq!(scores[0].iso_code, "C01");
    assert_eq!(scores[0].rank, Some(1));
    assert!((scores[0].score.unwrap() - 1.0).abs() < 1e-12);
    assert_eq!(scores[1].iso_code, "C00");
    assert!((scores[1].score.unwrap() - 0.3).abs() < 1e-12);
    assert_eq!(scores[2].rank, Some(3));
    assert!((scores[2].score.unwrap() + 0.6).abs() < 1e-12);

    for w in scores.windows(2) {
        assert!(w[0].score.unwrap() > w[1].score.unwrap());
        assert!(w[0].rank.unwrap() < w[1].rank.unwrap());
    }
}

#[test]
fn test_ties_keep_row_order() {
    let m = core(&[
        [Some(0.0), Some(0.0), Some(0.0)],
        [Some(1.0), Some(1.0), Some(1.0)],
        [Some(0.0), Some(0.0), Some(0.0)],
    ]);
    let scores = compute_index(&m).unwrap();
    let order = scores.iter().map(|s| s.row).collect::<Vec<_>>();
    assert_eq!(order, vec![1, 0, 2]);
    assert_eq!(scores[2].rank, Some(3));
}

#[test]
fn test_unscorable_rows_listed_last_without_rank() {
    let m = core(&[
        [None, None, None],
        [Some(0.5), Some(0.5), Some(0.5)],
        [Some(-0.5), Some(0.1), Some(0.2)],
    ]);
    let out = run_stage6(&m).unwrap();
    assert_eq!(out.scores.len(), 3);
    assert_eq!(out.scores[2].row, 0);
    assert_eq!(out.scores[2].score, None);
    assert_eq!(out.scores[2].rank, None);
    assert_eq!(out.scored().count(), 2);
    assert_eq!(out.score_values().len(), 2);
    assert_eq!(out.scores[1].rank, Some(2));
}

#[test]
fn test_order_independent_aggregation() {
    let rows = [
        [Some(0.12), Some(-1.7), Some(0.9)],
        [Some(1.3), Some(0.4), Some(-0.2)],
        [Some(-0.8), Some(2.2), Some(0.05)],
        [Some(0.6), Some(0.6), Some(0.6)],
    ];
    let base = compute_index(&core(&rows)).unwrap();

    for perm in [[0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]] {
        let permuted = rows
            .iter()
            .map(|r| perm.iter().map(|&c| r[c]).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let columns = perm.iter().map(|&c| CORE_INDICATORS[c]).collect();
        let other = compute_index(&rescaled(&permuted, columns)).unwrap();
        for (a, b) in base.iter().zip(other.iter()) {
            assert_eq!(a.row, b.row);
            assert_eq!(a.rank, b.rank);
            assert!((a.score.unwrap() - b.score.unwrap()).abs() < 1e-12);
        }
    }
}

#[test]
fn test_shape_mismatch() {
    let m = rescaled(
        &[vec![Some(1.0), Some(2.0)]],
        vec![IndicatorId::InsufficientFood, IndicatorId::Inflation],
    );
    assert!(matches!(
        compute_index(&m),
        Err(IndexError::ShapeMismatch {
            expected: 3,
            actual: 2
        })
    ));
}
