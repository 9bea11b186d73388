use std::collections::BTreeMap;

use crate::model::country::IncomeGroup;
use crate::model::matrix::IndicatorMatrix;
use crate::model::profile::{ImputerKind, IndexProfile};
use crate::report::{mean, median_f64};

#[derive(Debug, thiserror::Error)]
pub enum ImputeError {
    #[error("indicator column '{0}' has no observed values; nothing to impute from")]
    EmptyColumn(&'static str),
    #[error("imputer needs k >= 1 neighbors")]
    ZeroNeighbors,
}

#[derive(Debug, Clone)]
pub struct Stage4Output {
    pub matrix: IndicatorMatrix,
    /// `imputed[row][col]` is true where the value was filled in.
    pub imputed: Vec<Vec<bool>>,
    /// Rows with every core indicator missing; they stay missing and are not scored.
    pub unscorable: Vec<usize>,
    /// Cells filled from a whole-column statistic: no neighbor shared a feature,
    /// or the income group had no observations.
    pub column_fallbacks: usize,
}

impl Stage4Output {
    pub fn imputed_cells(&self) -> usize {
        self.imputed
            .iter()
            .map(|r| r.iter().filter(|&&b| b).count())
            .sum()
    }

    pub fn is_scorable(&self, row: usize) -> bool {
        !self.unscorable.contains(&row)
    }
}

pub fn run_stage4(
    core: &IndicatorMatrix,
    income_groups: &[IncomeGroup],
    profile: &IndexProfile,
) -> Result<Stage4Output, ImputeError> {
    for col in 0..core.n_cols() {
        if core.observed(col).is_empty() {
            return Err(ImputeError::EmptyColumn(core.columns[col].key()));
        }
    }

    let out = match profile.imputer {
        ImputerKind::Knn => knn_impute(core, profile.neighbors)?,
        ImputerKind::Median => median_impute(core, None),
        ImputerKind::IncomeMedian => median_impute(core, Some(income_groups)),
    };

    for &row in &out.unscorable {
        crate::warn!(
            "cannot score {}: all core indicators missing",
            core.countries[row]
        );
    }
    crate::info!(
        "imputation ({:?}): {} cells filled, {} countries unscorable",
        profile.imputer,
        out.imputed_cells(),
        out.unscorable.len()
    );
    Ok(out)
}

/// NaN-aware Euclidean distance over the features present in both rows,
/// scaled up by the share of features that were compared.
pub fn nan_euclidean(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let n = a.len();
    let mut sum = 0.0;
    let mut common = 0usize;
    for (x, y) in a.iter().zip(b.iter()) {
        if let (Some(x), Some(y)) = (x, y) {
            let d = x - y;
            sum += d * d;
            common += 1;
        }
    }
    if common == 0 {
        return None;
    }
    Some((n as f64 / common as f64 * sum).sqrt())
}

/// Donor rows for `(row, col)` ordered by (distance, row index), truncated to `k`.
pub fn nearest_donors(
    matrix: &IndicatorMatrix,
    row: usize,
    col: usize,
    k: usize,
) -> Vec<(usize, f64)> {
    let target = &matrix.values[row];
    let mut candidates = Vec::new();
    for (other, values) in matrix.values.iter().enumerate() {
        if other == row || values[col].is_none() {
            continue;
        }
        if let Some(d) = nan_euclidean(target, values) {
            candidates.push((other, d));
        }
    }
    candidates.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    candidates.truncate(k);
    candidates
}

pub fn knn_impute(matrix: &IndicatorMatrix, k: usize) -> Result<Stage4Output, ImputeError> {
    if k == 0 {
        return Err(ImputeError::ZeroNeighbors);
    }
    let n_rows = matrix.n_rows();
    let n_cols = matrix.n_cols();
    let mut out = matrix.clone();
    let mut imputed = vec![vec![false; n_cols]; n_rows];
    let mut unscorable = Vec::new();
    let mut column_fallbacks = 0usize;

    let column_means: Vec<f64> = (0..n_cols).map(|c| mean(&matrix.observed(c))).collect();

    for row in 0..n_rows {
        if matrix.row_all_missing(row) {
            unscorable.push(row);
            continue;
        }
        for col in 0..n_cols {
            if matrix.values[row][col].is_some() {
                continue;
            }
            let donors = nearest_donors(matrix, row, col, k);
            let value = if donors.is_empty() {
                crate::warn!(
                    "no neighbor shares a feature with {} for {}; using column mean",
                    matrix.countries[row],
                    matrix.columns[col].key()
                );
                column_fallbacks += 1;
                column_means[col]
            } else {
                let values = donors
                    .iter()
                    .filter_map(|&(d, _)| matrix.values[d][col])
                    .collect::<Vec<_>>();
                mean(&values)
            };
            out.values[row][col] = Some(value);
            imputed[row][col] = true;
        }
    }

    Ok(Stage4Output {
        matrix: out,
        imputed,
        unscorable,
        column_fallbacks,
    })
}

/// Column median, or the median within each income group when `groups` is given
/// (falling back to the column median for groups with no observations).
pub fn median_impute(matrix: &IndicatorMatrix, groups: Option<&[IncomeGroup]>) -> Stage4Output {
    let n_rows = matrix.n_rows();
    let n_cols = matrix.n_cols();
    let mut out = matrix.clone();
    let mut imputed = vec![vec![false; n_cols]; n_rows];
    let mut unscorable = Vec::new();
    let mut column_fallbacks = 0usize;

    let column_medians: Vec<f64> = (0..n_cols)
        .map(|c| median_f64(&matrix.observed(c)))
        .collect();

    let mut group_medians: BTreeMap<(IncomeGroup, usize), f64> = BTreeMap::new();
    if let Some(groups) = groups {
        for col in 0..n_cols {
            let mut by_group: BTreeMap<IncomeGroup, Vec<f64>> = BTreeMap::new();
            for row in 0..n_rows {
                if let (Some(v), Some(&g)) = (matrix.values[row][col], groups.get(row)) {
                    by_group.entry(g).or_default().push(v);
                }
            }
            for (g, values) in by_group {
                group_medians.insert((g, col), median_f64(&values));
            }
        }
    }

    for row in 0..n_rows {
        if matrix.row_all_missing(row) {
            unscorable.push(row);
            continue;
        }
        for col in 0..n_cols {
            if matrix.values[row][col].is_some() {
                continue;
            }
            let group_value = groups
                .and_then(|g| g.get(row))
                .and_then(|g| group_medians.get(&(*g, col)).copied());
            let value = match (groups, group_value) {
                (Some(_), Some(v)) => v,
                (Some(_), None) => {
                    column_fallbacks += 1;
                    column_medians[col]
                }
                (None, _) => column_medians[col],
            };
            out.values[row][col] = Some(value);
            imputed[row][col] = true;
        }
    }

    Stage4Output {
        matrix: out,
        imputed,
        unscorable,
        column_fallbacks,
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_impute.rs"]
mod tests;
