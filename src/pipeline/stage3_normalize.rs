use crate::input::table::{Period, SeriesTable};
use crate::input::{DebtServiceInputs, InputBundle};
use crate::model::indicator::{CONTEXT_INDICATORS, CORE_INDICATORS, IndicatorId};
use crate::model::matrix::IndicatorMatrix;
use crate::model::profile::IndexProfile;
use crate::pipeline::stage2_eligibility::EligibilitySet;

#[derive(Debug, Clone)]
pub struct Stage3Output {
    pub core: IndicatorMatrix,
    pub context: IndicatorMatrix,
    /// Period of the latest observation behind each core cell.
    pub core_periods: Vec<Vec<Option<Period>>>,
    /// Countries whose absolute indicators could not be scaled for lack of population.
    pub missing_population: Vec<String>,
    pub wasting_from_fallback: Vec<String>,
}

pub fn run_stage3(
    bundle: &InputBundle,
    eligible: &EligibilitySet,
    profile: &IndexProfile,
) -> Stage3Output {
    let iso_codes = eligible.iso_codes();
    let mut core = IndicatorMatrix::new(iso_codes.clone(), CORE_INDICATORS.to_vec());
    let mut context = IndicatorMatrix::new(iso_codes.clone(), CONTEXT_INDICATORS.to_vec());
    let mut core_periods = vec![vec![None; CORE_INDICATORS.len()]; iso_codes.len()];
    let mut missing_population = Vec::new();
    let mut wasting_from_fallback = Vec::new();

    let inflation = bundle
        .inflation
        .filter_series(profile.inflation_series.series_label());

    for (row, iso) in iso_codes.iter().enumerate() {
        let iso = iso.as_str();
        let mut population_gap = false;

        for (col, id) in CORE_INDICATORS.iter().enumerate() {
            let cell = match id {
                IndicatorId::InsufficientFood => {
                    latest_value(&bundle.insufficient_food, iso).map(|(count, period)| {
                        let share = population_for(&bundle.population, iso, period.year)
                            .and_then(|pop| share_of_population(count, pop));
                        if share.is_none() {
                            population_gap = true;
                        }
                        (share, period)
                    })
                }
                IndicatorId::Inflation => {
                    latest_value(&inflation, iso).map(|(v, period)| (Some(v), period))
                }
                IndicatorId::Wasting => {
                    wasting_value(&bundle.wasting, bundle.wasting_fallback.as_ref(), iso).map(
                        |(v, period, from_fallback)| {
                            if from_fallback {
                                wasting_from_fallback.push(iso.to_string());
                            }
                            (Some(v), period)
                        },
                    )
                }
                _ => None,
            };
            if let Some((value, period)) = cell {
                core.values[row][col] = value;
                core_periods[row][col] = Some(period);
            }
        }

        for (col, id) in CONTEXT_INDICATORS.iter().enumerate() {
            let value = match id {
                IndicatorId::Reserves => bundle.reserves.as_ref().and_then(|t| {
                    let (total, period) = latest_value(t, iso)?;
                    let per_capita = population_for(&bundle.population, iso, period.year)
                        .and_then(|pop| per_capita(total, pop));
                    if per_capita.is_none() {
                        population_gap = true;
                    }
                    per_capita
                }),
                IndicatorId::DebtService => match (&bundle.debt_service_ratio, &bundle.debt_service)
                {
                    (Some(t), _) => latest_value(t, iso).map(|(v, _)| v),
                    (None, Some(parts)) => {
                        debt_service_ratio(parts, iso, profile.debt_service_year)
                    }
                    (None, None) => None,
                },
                IndicatorId::FoodSecurity => bundle
                    .food_security
                    .as_ref()
                    .and_then(|t| latest_value(t, iso))
                    .map(|(v, _)| v),
                _ => None,
            };
            context.values[row][col] = value;
        }

        if population_gap {
            crate::warn!(
                "no usable population figure for {}; per-capita values left missing",
                iso
            );
            missing_population.push(iso.to_string());
        }
    }

    crate::info!(
        "normalized indicators for {} countries: {} core cells missing, {} context cells missing",
        core.n_rows(),
        core.missing_cells(),
        context.missing_cells()
    );

    Stage3Output {
        core,
        context,
        core_periods,
        missing_population,
        wasting_from_fallback,
    }
}

pub fn latest_value(table: &SeriesTable, iso: &str) -> Option<(f64, Period)> {
    table
        .latest(iso)
        .and_then(|o| o.value.map(|v| (v, o.period)))
}

/// Population whose year is closest to `year`; ties resolve to the later year.
pub fn population_for(population: &SeriesTable, iso: &str, year: i32) -> Option<f64> {
    let mut best: Option<(i32, i32, f64)> = None;
    for obs in population.observations(iso) {
        let Some(v) = obs.value else {
            continue;
        };
        let distance = (obs.period.year - year).abs();
        let better = match best {
            None => true,
            Some((d, y, _)) => distance < d || (distance == d && obs.period.year > y),
        };
        if better {
            best = Some((distance, obs.period.year, v));
        }
    }
    best.map(|(_, _, v)| v)
}

pub fn share_of_population(count: f64, population: f64) -> Option<f64> {
    if population <= 0.0 {
        return None;
    }
    Some(round2(100.0 * count / population))
}

pub fn per_capita(total: f64, population: f64) -> Option<f64> {
    if population <= 0.0 {
        return None;
    }
    Some(total / population)
}

/// Primary source first; the fallback only fills countries the primary lacks.
pub fn wasting_value(
    primary: &SeriesTable,
    fallback: Option<&SeriesTable>,
    iso: &str,
) -> Option<(f64, Period, bool)> {
    if let Some((v, p)) = latest_value(primary, iso) {
        return Some((v, p, false));
    }
    fallback
        .and_then(|t| latest_value(t, iso))
        .map(|(v, p)| (v, p, true))
}

/// Debt service (all creditors) over general government expenditure in USD, in percent.
pub fn debt_service_ratio(parts: &DebtServiceInputs, iso: &str, year: Option<i32>) -> Option<f64> {
    let service_obs = parts.service.observations(iso);
    let ref_year = match year {
        Some(y) => y,
        None => service_obs
            .iter()
            .filter(|o| o.value.is_some())
            .map(|o| o.period.year)
            .max()?,
    };

    let mut service = 0.0;
    let mut any = false;
    for obs in service_obs.iter().filter(|o| o.period.year == ref_year) {
        if let Some(v) = obs.value {
            service += v;
            any = true;
        }
    }
    if !any {
        return None;
    }

    let spending = parts
        .expenditure
        .observations(iso)
        .iter()
        .filter(|o| o.value.is_some() && o.period.year <= ref_year)
        .max_by_key(|o| o.period)?;
    let spending_year = spending.period.year;
    let spending_lcu = spending.value? * 1e9;

    let xe = parts
        .exchange_rate
        .observations(iso)
        .iter()
        .filter(|o| o.period.year == spending_year)
        .filter_map(|o| o.value)
        .next_back()?;

    let spending_usd = spending_lcu * xe;
    if spending_usd <= 0.0 {
        return None;
    }
    Some(round2(100.0 * service / spending_usd))
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_normalize.rs"]
mod tests;
