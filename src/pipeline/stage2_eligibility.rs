use std::collections::BTreeMap;

use crate::input::InputBundle;
use crate::model::country::{CountryRecord, IncomeGroup};
use crate::model::profile::IndexProfile;
use crate::pipeline::stage3_normalize::{latest_value, population_for, share_of_population};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    HighIncome,
    InsufficientCoverage,
    Excluded,
}

impl Rejection {
    pub fn name(self) -> &'static str {
        match self {
            Rejection::HighIncome => "high_income",
            Rejection::InsufficientCoverage => "insufficient_coverage",
            Rejection::Excluded => "excluded",
        }
    }
}

/// Classification row plus the number of core indicators with usable data.
#[derive(Debug, Clone)]
pub struct CoverageRecord<'a> {
    pub country: &'a CountryRecord,
    pub core_available: usize,
}

/// Fixed set of countries entering the index, in classification order.
#[derive(Debug, Clone)]
pub struct EligibilitySet {
    pub countries: Vec<CountryRecord>,
    pub rejected: Vec<(String, Rejection)>,
    pub by_income_group: BTreeMap<IncomeGroup, usize>,
}

impl EligibilitySet {
    pub fn iso_codes(&self) -> Vec<String> {
        self.countries.iter().map(|c| c.iso_code.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

pub fn run_stage2(bundle: &InputBundle, profile: &IndexProfile) -> EligibilitySet {
    let coverage = core_coverage(bundle, profile);
    let out = select_eligible(&coverage, profile);
    crate::info!(
        "eligibility: {} of {} classified countries selected ({} rejected)",
        out.len(),
        bundle.countries.len(),
        out.rejected.len()
    );
    out
}

/// Counts, per classified country, how many core indicators stage 3 can fill
/// from the raw tables. Inflation only counts rows of the configured series,
/// insufficient food only counts when a population figure turns it into a
/// share, and both wasting sources count as one indicator.
pub fn core_coverage<'a>(
    bundle: &'a InputBundle,
    profile: &IndexProfile,
) -> Vec<CoverageRecord<'a>> {
    let inflation = bundle
        .inflation
        .filter_series(profile.inflation_series.series_label());
    bundle
        .countries
        .iter()
        .map(|country| {
            let iso = country.iso_code.as_str();
            let food = latest_value(&bundle.insufficient_food, iso)
                .and_then(|(count, period)| {
                    population_for(&bundle.population, iso, period.year)
                        .and_then(|pop| share_of_population(count, pop))
                })
                .is_some();
            let wasting = bundle.wasting.has_data(iso)
                || bundle
                    .wasting_fallback
                    .as_ref()
                    .is_some_and(|t| t.has_data(iso));
            let core_available = [food, inflation.has_data(iso), wasting]
                .iter()
                .filter(|&&b| b)
                .count();
            CoverageRecord {
                country,
                core_available,
            }
        })
        .collect()
}

pub fn select_eligible(coverage: &[CoverageRecord<'_>], profile: &IndexProfile) -> EligibilitySet {
    let mut countries = Vec::new();
    let mut rejected = Vec::new();
    let mut by_income_group = BTreeMap::new();

    for rec in coverage {
        let country = rec.country;
        let verdict = if profile.is_excluded(&country.iso_code) {
            Err(Rejection::Excluded)
        } else {
            match country.income_group {
                IncomeGroup::Low | IncomeGroup::LowerMiddle => Ok(()),
                IncomeGroup::UpperMiddle => {
                    if rec.core_available >= profile.upper_middle_min_indicators {
                        Ok(())
                    } else {
                        Err(Rejection::InsufficientCoverage)
                    }
                }
                IncomeGroup::High => Err(Rejection::HighIncome),
            }
        };
        match verdict {
            Ok(()) => {
                *by_income_group.entry(country.income_group).or_insert(0) += 1;
                countries.push(country.clone());
            }
            Err(reason) => rejected.push((country.iso_code.clone(), reason)),
        }
    }

    countries.sort_by_key(|c| c.order);

    EligibilitySet {
        countries,
        rejected,
        by_income_group,
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_eligibility.rs"]
mod tests;
