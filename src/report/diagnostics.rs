use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::country::IncomeGroup;
use crate::model::indicator::IndicatorId;
use crate::model::matrix::IndicatorMatrix;
use crate::pipeline::stage3_normalize::round2;
use crate::report::{mean, pearson, quantile_linear, std_sample};

pub const COLLINEARITY_BOUND: f64 = 0.7;
pub const IQR_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, Serialize)]
pub struct CorrelatedColumn {
    pub key: &'static str,
    pub pearson: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnDiagnostics {
    pub key: &'static str,
    pub core: bool,
    pub n_observed: usize,
    pub missing_share: f64,
    pub missing_share_by_income_group: BTreeMap<&'static str, f64>,
    pub missing_countries: Vec<String>,
    pub zero_share: f64,
    pub outliers_3sigma: Vec<String>,
    pub outliers_iqr: Vec<String>,
    pub collinear_with: Vec<CorrelatedColumn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowMissing {
    pub iso_code: String,
    pub missing_share: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub columns: Vec<ColumnDiagnostics>,
    /// Core-indicator gaps per country, only for countries with at least one gap.
    pub rows_with_gaps: Vec<RowMissing>,
}

impl Diagnostics {
    /// Unordered collinear pairs, each reported once.
    pub fn collinear_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for col in &self.columns {
            for other in &col.collinear_with {
                if col.key < other.key {
                    pairs.push((col.key.to_string(), other.key.to_string()));
                }
            }
        }
        pairs
    }
}

/// Data-quality summary over the raw (pre-imputation) matrices. Both matrices
/// must share the same rows; `groups[row]` is the income group of that row.
pub fn compute_diagnostics(
    core: &IndicatorMatrix,
    context: &IndicatorMatrix,
    groups: &[IncomeGroup],
) -> Diagnostics {
    let mut columns: Vec<(IndicatorId, bool, Vec<Option<f64>>)> = Vec::new();
    for c in 0..core.n_cols() {
        columns.push((core.columns[c], true, core.column(c)));
    }
    for c in 0..context.n_cols() {
        columns.push((context.columns[c], false, context.column(c)));
    }

    let mut out = Vec::with_capacity(columns.len());
    for (i, (id, is_core, values)) in columns.iter().enumerate() {
        let observed: Vec<f64> = values.iter().filter_map(|v| *v).collect();
        let n = values.len();

        let missing_countries = values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_none())
            .map(|(r, _)| core.countries[r].clone())
            .collect::<Vec<_>>();

        let collinear_with = columns
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .filter_map(|(_, (other, _, other_values))| {
                let r = pearson(values, other_values)?;
                (r >= COLLINEARITY_BOUND || r <= -COLLINEARITY_BOUND).then(|| CorrelatedColumn {
                    key: other.key(),
                    pearson: round2(r),
                })
            })
            .collect();

        out.push(ColumnDiagnostics {
            key: id.key(),
            core: *is_core,
            n_observed: observed.len(),
            missing_share: share(missing_countries.len(), n),
            missing_share_by_income_group: missing_by_group(values, groups),
            missing_countries,
            zero_share: share(observed.iter().filter(|&&v| v == 0.0).count(), n),
            outliers_3sigma: flag_rows(values, &core.countries, sigma_bounds(&observed)),
            outliers_iqr: flag_rows(values, &core.countries, iqr_bounds(&observed)),
            collinear_with,
        });
    }

    let rows_with_gaps = (0..core.n_rows())
        .filter_map(|row| {
            let missing = core.row_missing_count(row);
            (missing > 0).then(|| RowMissing {
                iso_code: core.countries[row].clone(),
                missing_share: share(missing, core.n_cols()),
            })
        })
        .collect();

    Diagnostics {
        columns: out,
        rows_with_gaps,
    }
}

fn missing_by_group(values: &[Option<f64>], groups: &[IncomeGroup]) -> BTreeMap<&'static str, f64> {
    let mut totals: BTreeMap<IncomeGroup, (usize, usize)> = BTreeMap::new();
    for (v, g) in values.iter().zip(groups.iter()) {
        let entry = totals.entry(*g).or_default();
        entry.0 += 1;
        if v.is_none() {
            entry.1 += 1;
        }
    }
    totals
        .into_iter()
        .map(|(g, (total, missing))| (g.name(), share(missing, total)))
        .collect()
}

/// `mean ± 3 * sample std`.
pub fn sigma_bounds(observed: &[f64]) -> Option<(f64, f64)> {
    if observed.len() < 2 {
        return None;
    }
    let m = mean(observed);
    let s = std_sample(observed);
    Some((m - 3.0 * s, m + 3.0 * s))
}

/// `[q25 - 1.5 * IQR, q75 + 1.5 * IQR]` with linear percentiles.
pub fn iqr_bounds(observed: &[f64]) -> Option<(f64, f64)> {
    if observed.is_empty() {
        return None;
    }
    let q25 = quantile_linear(observed, 0.25);
    let q75 = quantile_linear(observed, 0.75);
    let iqr = q75 - q25;
    Some((q25 - IQR_MULTIPLIER * iqr, q75 + IQR_MULTIPLIER * iqr))
}

fn flag_rows(values: &[Option<f64>], countries: &[String], bounds: Option<(f64, f64)>) -> Vec<String> {
    let Some((lo, hi)) = bounds else {
        return Vec::new();
    };
    values
        .iter()
        .zip(countries.iter())
        .filter_map(|(v, iso)| {
            let v = (*v)?;
            (v < lo || v > hi).then(|| iso.clone())
        })
        .collect()
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(count as f64 / total as f64)
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/diagnostics.rs"]
mod tests;
