use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::profile::IndexProfile;
use crate::report::diagnostics::Diagnostics;

pub mod diagnostics;
pub mod json;
pub mod text;

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSummary {
    pub key: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub more_is_worse: bool,
    pub scored: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectedCountry {
    pub iso_code: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct EligibilitySummary {
    pub n_classified: usize,
    pub n_eligible: usize,
    pub by_income_group: BTreeMap<&'static str, usize>,
    pub rejected: Vec<RejectedCountry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImputationSummary {
    pub imputed_cells: usize,
    pub imputed_by_indicator: BTreeMap<&'static str, usize>,
    pub column_fallbacks: usize,
    pub wasting_from_fallback: Vec<String>,
    pub missing_population: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub n_scored: usize,
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryData {
    pub tool: String,
    pub tool_version: String,
    pub input_files: Vec<String>,
    pub skipped_rows: usize,
    pub profile: IndexProfile,
    pub indicators: Vec<IndicatorSummary>,
    pub eligibility: EligibilitySummary,
    pub imputation: ImputationSummary,
    pub unscorable: Vec<String>,
    pub index: IndexStats,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct RankedLine {
    pub rank: usize,
    pub iso_code: String,
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct ReportContext {
    pub n_classified: usize,
    pub n_eligible: usize,
    pub n_scored: usize,
    pub top: Vec<RankedLine>,
    pub unscorable: Vec<String>,
    pub imputer: String,
    pub scaler: String,
    pub neighbors: usize,
    pub imputed_cells: usize,
    pub column_fallbacks: usize,
    pub missing_population: Vec<String>,
    pub wasting_from_fallback: Vec<String>,
    pub skipped_rows: usize,
    pub score_median: f64,
    pub score_p10: f64,
    pub score_p90: f64,
    pub collinear_pairs: Vec<(String, String)>,
    pub outlier_notes: Vec<String>,
}

pub fn format_f64_6(v: f64) -> String {
    format!("{:.6}", v)
}

pub fn format_opt(v: Option<f64>) -> String {
    v.map(format_f64_6).unwrap_or_default()
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    out
}

/// Order statistic at `ceil((n - 1) * p)`; no interpolation.
pub fn quantile_indexed(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted(values);
    let n = sorted.len();
    let idx = ((n - 1) as f64 * p).ceil() as usize;
    sorted[idx.min(n - 1)]
}

/// Linearly interpolated percentile over already sorted values.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn quantile_linear(values: &[f64], p: f64) -> f64 {
    quantile_sorted(&sorted(values), p)
}

pub fn median(values: &[f64]) -> f64 {
    quantile_indexed(values, 0.5)
}

/// Median averaging the two middle values for even lengths.
pub fn median_f64(values: &[f64]) -> f64 {
    quantile_linear(values, 0.5)
}

pub fn p10(values: &[f64]) -> f64 {
    quantile_indexed(values, 0.10)
}

pub fn p90(values: &[f64]) -> f64 {
    quantile_indexed(values, 0.90)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_sample(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Population standard deviation (n denominator).
pub fn std_pop(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let ss = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>();
    (ss / values.len() as f64).sqrt()
}

/// Pearson correlation over pairwise complete observations.
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs = a
        .iter()
        .zip(b.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect::<Vec<_>>();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in &pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
        syy += (y - my) * (y - my);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx.sqrt() * syy.sqrt()))
}
