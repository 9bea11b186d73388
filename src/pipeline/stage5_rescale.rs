use crate::model::matrix::IndicatorMatrix;
use crate::model::profile::{IndexProfile, OutputDistribution, ScalerKind};
use crate::pipeline::stage4_impute::Stage4Output;
use crate::report::{mean, median_f64, quantile_linear, quantile_sorted, std_pop};

/// Tolerance used to pin the extreme values onto the bounds of the uniform scale.
pub const BOUNDS_THRESHOLD: f64 = 1e-7;

#[derive(Debug, thiserror::Error)]
pub enum RescaleError {
    #[error("scorable country {country} still has no {indicator} value after imputation")]
    MissingValue {
        country: String,
        indicator: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct Stage5Output {
    /// Rescaled core matrix; unscorable rows stay missing.
    pub matrix: IndicatorMatrix,
}

pub fn run_stage5(imputed: &Stage4Output, profile: &IndexProfile) -> Result<Stage5Output, RescaleError> {
    let source = &imputed.matrix;
    let rows: Vec<usize> = (0..source.n_rows())
        .filter(|&r| imputed.is_scorable(r))
        .collect();

    let mut out = IndicatorMatrix::new(source.countries.clone(), source.columns.clone());
    for col in 0..source.n_cols() {
        let id = source.columns[col];
        let mut values = Vec::with_capacity(rows.len());
        for &row in &rows {
            let v = source.values[row][col].ok_or_else(|| RescaleError::MissingValue {
                country: source.countries[row].clone(),
                indicator: id.key(),
            })?;
            values.push(v);
        }

        let mut scaled = rescale_column(&values, profile);
        if !id.more_is_worse() {
            for v in &mut scaled {
                *v = -*v;
            }
        }
        for (&row, v) in rows.iter().zip(scaled) {
            out.values[row][col] = Some(v);
        }
    }

    crate::info!(
        "rescaled {} columns over {} countries ({:?})",
        out.n_cols(),
        rows.len(),
        profile.scaler
    );
    Ok(Stage5Output { matrix: out })
}

pub fn rescale_column(values: &[f64], profile: &IndexProfile) -> Vec<f64> {
    match profile.scaler {
        ScalerKind::Quantile => {
            quantile_transform(values, profile.n_quantiles, profile.output_distribution)
        }
        ScalerKind::Standard => standard_scale(values),
        ScalerKind::Minmax => minmax_scale(values),
        ScalerKind::Robust => robust_scale(values),
    }
}

/// Maps each value onto its empirical quantile, then onto the requested
/// distribution. Ties land at the middle of their rank range.
///
/// A constant column maps to the centre of the distribution (0 or 0.5),
/// unlike sklearn's `QuantileTransformer`, which sends it to the lower bound.
pub fn quantile_transform(
    values: &[f64],
    n_quantiles: usize,
    output: OutputDistribution,
) -> Vec<f64> {
    let n = values.len();
    let n_q = n_quantiles.min(n);
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let constant = n_q < 2 || sorted.first() == sorted.last();
    if constant {
        let centre = match output {
            OutputDistribution::Normal => 0.0,
            OutputDistribution::Uniform => 0.5,
        };
        return vec![centre; n];
    }

    let references: Vec<f64> = (0..n_q)
        .map(|i| i as f64 / (n_q - 1) as f64)
        .collect();
    let mut quantiles: Vec<f64> = references
        .iter()
        .map(|&r| quantile_sorted(&sorted, r))
        .collect();
    for i in 1..quantiles.len() {
        if quantiles[i] < quantiles[i - 1] {
            quantiles[i] = quantiles[i - 1];
        }
    }

    let neg_quantiles: Vec<f64> = quantiles.iter().rev().map(|q| -q).collect();
    let neg_references: Vec<f64> = references.iter().rev().map(|r| -r).collect();
    let lower = quantiles[0];
    let upper = quantiles[n_q - 1];

    values
        .iter()
        .map(|&x| {
            let forward = interp(x, &quantiles, &references);
            let backward = interp(-x, &neg_quantiles, &neg_references);
            let mut u = 0.5 * (forward - backward);
            let (at_upper, at_lower) = match output {
                OutputDistribution::Normal => {
                    (x + BOUNDS_THRESHOLD > upper, x - BOUNDS_THRESHOLD < lower)
                }
                OutputDistribution::Uniform => (x == upper, x == lower),
            };
            if at_upper {
                u = 1.0;
            }
            if at_lower {
                u = 0.0;
            }
            match output {
                OutputDistribution::Uniform => u,
                OutputDistribution::Normal => {
                    let clip_min = probit(BOUNDS_THRESHOLD - f64::EPSILON);
                    let clip_max = probit(1.0 - (BOUNDS_THRESHOLD - f64::EPSILON));
                    probit(u).clamp(clip_min, clip_max)
                }
            }
        })
        .collect()
}

/// Piecewise-linear interpolation over non-decreasing `xp`. Repeated `xp`
/// entries resolve to the rightmost one; values outside the range clamp.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let last = xp.len() - 1;
    if x < xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }
    let j = xp.partition_point(|&v| v <= x) - 1;
    let (x0, x1) = (xp[j], xp[j + 1]);
    let (y0, y1) = (fp[j], fp[j + 1]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Inverse of the standard normal CDF (Acklam's rational approximation,
/// relative error below 1.2e-9).
pub fn probit(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -probit(1.0 - p)
    }
}

/// Zero mean, unit population variance. A zero-variance column maps to 0.
pub fn standard_scale(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    let s = std_pop(values);
    if s == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - m) / s).collect()
}

pub fn minmax_scale(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Centre on the median, scale by the interquartile range (1 when the IQR is zero).
pub fn robust_scale(values: &[f64]) -> Vec<f64> {
    let centre = median_f64(values);
    let iqr = quantile_linear(values, 0.75) - quantile_linear(values, 0.25);
    let scale = if iqr == 0.0 { 1.0 } else { iqr };
    values.iter().map(|v| (v - centre) / scale).collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_rescale.rs"]
mod tests;
