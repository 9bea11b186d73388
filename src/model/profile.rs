use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("cannot read profile {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid profile {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ImputerKind {
    Knn,
    Median,
    IncomeMedian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScalerKind {
    Quantile,
    Standard,
    Minmax,
    Robust,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputDistribution {
    Normal,
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum InflationSeries {
    Headline,
    Food,
}

impl InflationSeries {
    /// Series label used in the inflation table's indicator column.
    pub fn series_label(self) -> &'static str {
        match self {
            InflationSeries::Headline => "Inflation Rate",
            InflationSeries::Food => "Food Inflation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexProfile {
    pub neighbors: usize,
    pub imputer: ImputerKind,
    pub scaler: ScalerKind,
    pub n_quantiles: usize,
    pub output_distribution: OutputDistribution,
    pub upper_middle_min_indicators: usize,
    pub excluded_countries: Vec<String>,
    pub inflation_series: InflationSeries,
    pub debt_service_year: Option<i32>,
}

impl Default for IndexProfile {
    fn default() -> Self {
        Self::default_v1()
    }
}

impl IndexProfile {
    pub fn default_v1() -> Self {
        Self {
            neighbors: 10,
            imputer: ImputerKind::Knn,
            scaler: ScalerKind::Quantile,
            n_quantiles: 200,
            output_distribution: OutputDistribution::Normal,
            upper_middle_min_indicators: 3,
            excluded_countries: ["KIR", "FSM", "PRK", "WSM"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            inflation_series: InflationSeries::Headline,
            debt_service_year: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ProfileError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn is_excluded(&self, iso_code: &str) -> bool {
        self.excluded_countries
            .iter()
            .any(|c| c.eq_ignore_ascii_case(iso_code))
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/profile.rs"]
mod tests;
