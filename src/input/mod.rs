use std::path::{Path, PathBuf};

pub mod countries;
pub mod table;

use countries::{CountryTable, load_countries};
use table::{SeriesTable, read_series};

use crate::model::country::CountryRecord;

const TABLE_EXTENSIONS: &[&str] = &["csv", "tsv", "csv.gz", "tsv.gz", "txt"];

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error on {path}: {source}")]
    Csv { path: String, source: csv::Error },
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Component tables for deriving the debt-service-to-expenditure ratio.
#[derive(Debug, Clone)]
pub struct DebtServiceInputs {
    pub service: SeriesTable,
    pub expenditure: SeriesTable,
    pub exchange_rate: SeriesTable,
}

#[derive(Debug, Clone)]
pub struct InputBundle {
    pub countries: Vec<CountryRecord>,
    pub population: SeriesTable,
    pub insufficient_food: SeriesTable,
    pub inflation: SeriesTable,
    pub wasting: SeriesTable,
    pub wasting_fallback: Option<SeriesTable>,
    pub reserves: Option<SeriesTable>,
    pub debt_service_ratio: Option<SeriesTable>,
    pub debt_service: Option<DebtServiceInputs>,
    pub food_security: Option<SeriesTable>,
    pub files: Vec<PathBuf>,
    pub skipped_rows: usize,
}

pub fn load_input(input_dir: &Path) -> Result<InputBundle, InputError> {
    if !input_dir.is_dir() {
        return Err(InputError::MissingInput(format!(
            "input directory {} does not exist",
            input_dir.display()
        )));
    }

    let mut files = Vec::new();

    let countries_path = require_table(input_dir, "countries")?;
    let CountryTable {
        countries,
        skipped_rows: country_skips,
    } = load_countries(&countries_path)?;
    files.push(countries_path);

    let population = load_required(input_dir, "population", &mut files)?;
    let insufficient_food = load_required(input_dir, "insufficient_food", &mut files)?;
    let inflation = load_required(input_dir, "inflation", &mut files)?;
    let wasting = load_required(input_dir, "wasting", &mut files)?;

    let wasting_fallback = load_optional(input_dir, "wasting_fallback", &mut files)?;
    let reserves = load_optional(input_dir, "reserves", &mut files)?;
    let debt_service_ratio = load_optional(input_dir, "debt_service_ratio", &mut files)?;
    let food_security = load_optional(input_dir, "food_security_index", &mut files)?;

    let debt_service = if debt_service_ratio.is_none() {
        let service = load_optional(input_dir, "debt_service", &mut files)?;
        let expenditure = load_optional(input_dir, "gov_expenditure", &mut files)?;
        let exchange_rate = load_optional(input_dir, "exchange_rate", &mut files)?;
        match (service, expenditure, exchange_rate) {
            (Some(service), Some(expenditure), Some(exchange_rate)) => Some(DebtServiceInputs {
                service,
                expenditure,
                exchange_rate,
            }),
            (None, None, None) => None,
            _ => {
                crate::warn!(
                    "debt service components incomplete (need debt_service, gov_expenditure and exchange_rate); debt service ratio will be missing"
                );
                None
            }
        }
    } else {
        None
    };

    let mut skipped_rows = country_skips;
    for t in [&population, &insufficient_food, &inflation, &wasting] {
        skipped_rows += t.skipped_rows;
    }
    for t in [
        &wasting_fallback,
        &reserves,
        &debt_service_ratio,
        &food_security,
    ]
    .into_iter()
    .flatten()
    {
        skipped_rows += t.skipped_rows;
    }
    if let Some(ds) = &debt_service {
        skipped_rows +=
            ds.service.skipped_rows + ds.expenditure.skipped_rows + ds.exchange_rate.skipped_rows;
    }

    crate::info!(
        "discovered {} input tables in {}",
        files.len(),
        input_dir.display()
    );

    Ok(InputBundle {
        countries,
        population,
        insufficient_food,
        inflation,
        wasting,
        wasting_fallback,
        reserves,
        debt_service_ratio,
        debt_service,
        food_security,
        files,
        skipped_rows,
    })
}

pub fn find_table(input_dir: &Path, stem: &str) -> Option<PathBuf> {
    for ext in TABLE_EXTENSIONS {
        let path = input_dir.join(format!("{stem}.{ext}"));
        if path.is_file() {
            return Some(path);
        }
    }
    None
}

fn require_table(input_dir: &Path, stem: &str) -> Result<PathBuf, InputError> {
    find_table(input_dir, stem).ok_or_else(|| {
        InputError::MissingInput(format!(
            "missing {stem}.csv (or .tsv/.csv.gz) in {}",
            input_dir.display()
        ))
    })
}

fn load_required(
    input_dir: &Path,
    stem: &str,
    files: &mut Vec<PathBuf>,
) -> Result<SeriesTable, InputError> {
    let path = require_table(input_dir, stem)?;
    let table = read_series(&path, stem)?;
    files.push(path);
    Ok(table)
}

fn load_optional(
    input_dir: &Path,
    stem: &str,
    files: &mut Vec<PathBuf>,
) -> Result<Option<SeriesTable>, InputError> {
    match find_table(input_dir, stem) {
        Some(path) => {
            let table = read_series(&path, stem)?;
            files.push(path);
            Ok(Some(table))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
