use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::input::InputError;

const ID_ALIASES: &[&str] = &["iso_code", "iso3", "iso", "country_code", "economy"];
const PERIOD_ALIASES: &[&str] = &["date", "year", "period", "time"];
const VALUE_ALIASES: &[&str] = &["value", "obs_value", "population", "score"];
const SERIES_ALIASES: &[&str] = &["indicator", "series"];
const MISSING_MARKERS: &[&str] = &["", "na", "n/a", "nan", "..", "null", "-", "none"];

/// Calendar period of an observation. Year-only periods sort before any
/// dated period of the same year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl Period {
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        let s = s.split(['T', ' ']).next().unwrap_or(s);
        if s.is_empty() {
            return None;
        }
        let mut parts = s.split(['-', '/']);
        let year_part = parts.next()?;
        // Year columns exported from spreadsheets come through as "2021.0".
        let year_part = year_part.strip_suffix(".0").unwrap_or(year_part);
        if year_part.len() != 4 || !year_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year = year_part.parse::<i32>().ok()?;
        let month = match parts.next() {
            Some(m) => {
                let m = m.parse::<u8>().ok()?;
                if !(1..=12).contains(&m) {
                    return None;
                }
                m
            }
            None => 0,
        };
        let day = match parts.next() {
            Some(d) => {
                let d = d.parse::<u8>().ok()?;
                if !(1..=31).contains(&d) {
                    return None;
                }
                d
            }
            None => 0,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self { year, month, day })
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.month, self.day) {
            (0, _) => write!(f, "{:04}", self.year),
            (m, 0) => write!(f, "{:04}-{:02}", self.year, m),
            (m, d) => write!(f, "{:04}-{:02}-{:02}", self.year, m, d),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub period: Period,
    pub value: Option<f64>,
    pub series: Option<String>,
}

/// Observations keyed by upper-cased ISO3 code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesTable {
    pub name: String,
    pub rows: BTreeMap<String, Vec<Observation>>,
    pub skipped_rows: usize,
}

impl SeriesTable {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: BTreeMap::new(),
            skipped_rows: 0,
        }
    }

    pub fn push(&mut self, iso_code: &str, obs: Observation) {
        self.rows
            .entry(iso_code.to_ascii_uppercase())
            .or_default()
            .push(obs);
    }

    pub fn observations(&self, iso_code: &str) -> &[Observation] {
        self.rows.get(iso_code).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn has_data(&self, iso_code: &str) -> bool {
        self.observations(iso_code).iter().any(|o| o.value.is_some())
    }

    /// Latest non-missing observation; equal periods resolve to the row read last.
    pub fn latest(&self, iso_code: &str) -> Option<&Observation> {
        let mut best: Option<&Observation> = None;
        for obs in self.observations(iso_code) {
            if obs.value.is_none() {
                continue;
            }
            match best {
                Some(b) if b.period > obs.period => {}
                _ => best = Some(obs),
            }
        }
        best
    }

    /// Copy restricted to rows of one series. Tables without a series column
    /// are returned unchanged.
    pub fn filter_series(&self, series: &str) -> SeriesTable {
        let has_series = self
            .rows
            .values()
            .flatten()
            .any(|o| o.series.is_some());
        if !has_series {
            return self.clone();
        }
        let mut out = SeriesTable::new(&self.name);
        out.skipped_rows = self.skipped_rows;
        for (iso, obs) in &self.rows {
            for o in obs {
                let keep = o
                    .series
                    .as_deref()
                    .is_some_and(|s| s.trim().eq_ignore_ascii_case(series));
                if keep {
                    out.push(iso, o.clone());
                }
            }
        }
        out
    }

    pub fn n_countries(&self) -> usize {
        self.rows.len()
    }
}

pub fn open_maybe_gz(path: &Path) -> Result<Box<dyn BufRead>, InputError> {
    let file = File::open(path).map_err(|e| InputError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

pub fn delimiter_for(path: &Path) -> u8 {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    if name.ends_with(".tsv") || name.ends_with(".txt") {
        b'\t'
    } else {
        b','
    }
}

pub fn csv_reader(path: &Path) -> Result<csv::Reader<Box<dyn BufRead>>, InputError> {
    let reader = open_maybe_gz(path)?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader))
}

pub fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    for alias in aliases {
        if let Some(idx) = headers.iter().position(|h| h.eq_ignore_ascii_case(alias)) {
            return Some(idx);
        }
    }
    None
}

fn parse_value(raw: &str) -> Result<Option<f64>, ()> {
    let s = raw.trim();
    if MISSING_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m)) {
        return Ok(None);
    }
    let cleaned = s.replace(',', "");
    let cleaned = cleaned.strip_suffix('%').unwrap_or(&cleaned);
    match cleaned.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        Ok(_) => Ok(None),
        Err(_) => Err(()),
    }
}

enum Layout {
    Long {
        period: usize,
        value: usize,
        series: Option<usize>,
    },
    Wide {
        periods: Vec<(usize, Period)>,
        series: Option<usize>,
    },
}

/// Reads a (country, period, value) table in long layout, or a wide table with
/// one column per period. Malformed rows are skipped with a warning.
pub fn read_series(path: &Path, name: &str) -> Result<SeriesTable, InputError> {
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
    let series = find_column(&headers, SERIES_ALIASES);

    let layout = match (
        find_column(&headers, PERIOD_ALIASES),
        find_column(&headers, VALUE_ALIASES),
    ) {
        (Some(period), Some(value)) => Layout::Long {
            period,
            value,
            series,
        },
        (None, Some(_)) => {
            return Err(InputError::InvalidInput(format!(
                "{}: value column without a period column",
                path.display()
            )));
        }
        (_, None) => {
            let periods = headers
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != id_col && Some(*idx) != series)
                .filter_map(|(idx, h)| Period::parse(h).map(|p| (idx, p)))
                .collect::<Vec<_>>();
            if periods.is_empty() {
                return Err(InputError::InvalidInput(format!(
                    "{}: no value column and no period columns",
                    path.display()
                )));
            }
            Layout::Wide { periods, series }
        }
    };

    let mut table = SeriesTable::new(name);
    for (idx, record) in reader.records().enumerate() {
        let line_no = idx + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                crate::warn!("{}: unreadable row; skipping (line {}): {}", name, line_no, e);
                table.skipped_rows += 1;
                continue;
            }
        };
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let iso = record.get(id_col).unwrap_or("").trim();
        if iso.is_empty() {
            crate::warn!("{}: row has empty country id; skipping (line {})", name, line_no);
            table.skipped_rows += 1;
            continue;
        }

        match &layout {
            Layout::Long {
                period,
                value,
                series,
            } => {
                let raw_period = record.get(*period).unwrap_or("");
                let Some(p) = Period::parse(raw_period) else {
                    crate::warn!(
                        "{}: unparsable period {:?}; skipping (line {}, country {})",
                        name,
                        raw_period,
                        line_no,
                        iso
                    );
                    table.skipped_rows += 1;
                    continue;
                };
                let raw_value = record.get(*value).unwrap_or("");
                let Ok(v) = parse_value(raw_value) else {
                    crate::warn!(
                        "{}: non-numeric value {:?}; skipping (line {}, country {})",
                        name,
                        raw_value,
                        line_no,
                        iso
                    );
                    table.skipped_rows += 1;
                    continue;
                };
                let series = series.and_then(|s| record.get(s)).map(|s| s.to_string());
                table.push(
                    iso,
                    Observation {
                        period: p,
                        value: v,
                        series,
                    },
                );
            }
            Layout::Wide { periods, series } => {
                let series_value = series.and_then(|s| record.get(s)).map(|s| s.to_string());
                for &(col, p) in periods {
                    let raw_value = record.get(col).unwrap_or("");
                    match parse_value(raw_value) {
                        Ok(v) => table.push(
                            iso,
                            Observation {
                                period: p,
                                value: v,
                                series: series_value.clone(),
                            },
                        ),
                        Err(()) => {
                            crate::warn!(
                                "{}: non-numeric value {:?}; skipping cell (line {}, country {}, period {})",
                                name,
                                raw_value,
                                line_no,
                                iso,
                                p
                            );
                            table.skipped_rows += 1;
                        }
                    }
                }
            }
        }
    }

    crate::info!(
        "loaded {}: {} countries from {} ({} rows skipped)",
        name,
        table.n_countries(),
        path.display(),
        table.skipped_rows
    );
    Ok(table)
}
