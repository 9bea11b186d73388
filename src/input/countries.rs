use std::collections::HashSet;
use std::path::Path;

use crate::input::InputError;
use crate::input::table::{csv_reader, find_column};
use crate::model::country::{CountryRecord, IncomeGroup};

const ID_ALIASES: &[&str] = &["iso_code", "iso3", "iso", "country_code", "code"];
const NAME_ALIASES: &[&str] = &["country_name", "name", "country", "economy"];
const INCOME_ALIASES: &[&str] = &["income_group", "income_level", "income", "incomegroup"];

#[derive(Debug, Clone)]
pub struct CountryTable {
    pub countries: Vec<CountryRecord>,
    pub skipped_rows: usize,
}

pub fn load_countries(path: &Path) -> Result<CountryTable, InputError> {
    let mut reader = csv_reader(path)?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| InputError::Csv {
            path: path.display().to_string(),
            source: e,
        })?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    let id_col = find_column(&headers, ID_ALIASES).ok_or_else(|| {
        InputError::InvalidInput(format!(
            "{}: no country id column (expected one of {})",
            path.display(),
            ID_ALIASES.join(", ")
        ))
    })?;
    let income_col = find_column(&headers, INCOME_ALIASES).ok_or_else(|| {
        InputError::InvalidInput(format!(
            "{}: no income group column (expected one of {})",
            path.display(),
            INCOME_ALIASES.join(", ")
        ))
    })?;
    let name_col = find_column(&headers, NAME_ALIASES).filter(|&c| c != id_col);

    let mut seen = HashSet::new();
    let mut countries = Vec::new();
    let mut skipped_rows = 0usize;

    for (idx, record) in reader.records().enumerate() {
        let line_no = idx + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                crate::warn!("countries: unreadable row; skipping (line {}): {}", line_no, e);
                skipped_rows += 1;
                continue;
            }
        };
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let iso = record.get(id_col).unwrap_or("").trim().to_ascii_uppercase();
        if iso.is_empty() {
            crate::warn!("countries: row has empty country id; skipping (line {})", line_no);
            skipped_rows += 1;
            continue;
        }
        let raw_income = record.get(income_col).unwrap_or("");
        let Some(income_group) = IncomeGroup::parse(raw_income) else {
            crate::warn!(
                "countries: unknown income group {:?}; skipping (line {}, country {})",
                raw_income,
                line_no,
                iso
            );
            skipped_rows += 1;
            continue;
        };
        if !seen.insert(iso.clone()) {
            crate::warn!(
                "duplicate country in classification table; keeping first (line {}, country {})",
                line_no,
                iso
            );
            skipped_rows += 1;
            continue;
        }
        let name = name_col
            .and_then(|c| record.get(c))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| iso.clone());

        let order = countries.len();
        countries.push(CountryRecord {
            iso_code: iso,
            name,
            income_group,
            order,
        });
    }

    if countries.is_empty() {
        return Err(InputError::Parse(format!(
            "{}: no usable country rows",
            path.display()
        )));
    }

    crate::info!(
        "loaded countries: {} classified ({} rows skipped)",
        countries.len(),
        skipped_rows
    );

    Ok(CountryTable {
        countries,
        skipped_rows,
    })
}
