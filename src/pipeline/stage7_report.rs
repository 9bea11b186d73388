use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::model::country::CountryRecord;
use crate::model::indicator::{CONTEXT_INDICATORS, builtin_indicators};
use crate::model::profile::IndexProfile;
use crate::pipeline::stage2_eligibility::EligibilitySet;
use crate::pipeline::stage3_normalize::Stage3Output;
use crate::pipeline::stage4_impute::Stage4Output;
use crate::pipeline::stage5_rescale::Stage5Output;
use crate::pipeline::stage6_index::{CountryScore, Stage6Output};
use crate::report::diagnostics::{Diagnostics, compute_diagnostics};
use crate::report::json::render_summary_json;
use crate::report::text::render_report_text;
use crate::report::{
    EligibilitySummary, ImputationSummary, IndexStats, IndicatorSummary, RankedLine,
    RejectedCountry, ReportContext, SummaryData, format_opt, median, p10, p90,
};

pub const TOP_COUNTRIES: usize = 10;

#[derive(Debug, Clone)]
pub struct Stage7Input<'a> {
    pub tool_name: String,
    pub tool_version: String,
    pub profile: &'a IndexProfile,
    pub files: &'a [PathBuf],
    pub skipped_rows: usize,
    pub n_classified: usize,

    pub eligible: &'a EligibilitySet,
    pub normalized: &'a Stage3Output,
    pub imputed: &'a Stage4Output,
    pub rescaled: &'a Stage5Output,
    pub index: &'a Stage6Output,
}

pub fn write_reports(input: &Stage7Input<'_>, out_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(out_dir)?;

    write_index_tsv(input, &out_dir.join("index.tsv"))?;
    write_context_tsv(input, &out_dir.join("context.tsv"))?;

    let groups = input
        .eligible
        .countries
        .iter()
        .map(|c| c.income_group)
        .collect::<Vec<_>>();
    let diagnostics = compute_diagnostics(
        &input.normalized.core,
        &input.normalized.context,
        &groups,
    );

    let summary = build_summary(input, diagnostics);
    let json = render_summary_json(&summary).map_err(std::io::Error::other)?;
    write_text(&out_dir.join("summary.json"), &json)?;

    let report_ctx = build_report_context(input, &summary);
    let report = render_report_text(&report_ctx);
    write_text(&out_dir.join("report.txt"), &report)?;

    crate::info!("reports written to {}", out_dir.display());
    Ok(())
}

fn write_index_tsv(input: &Stage7Input<'_>, path: &Path) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let core = &input.normalized.core;

    let mut header = vec![
        "rank".to_string(),
        "iso_code".to_string(),
        "country_name".to_string(),
        "income_group".to_string(),
        "score".to_string(),
        "status".to_string(),
    ];
    for id in &core.columns {
        header.push(format!("{}_raw", id.key()));
        header.push(format!("{}_period", id.key()));
        header.push(format!("{}_imputed", id.key()));
        header.push(format!("{}_rescaled", id.key()));
    }
    writeln!(w, "{}", header.join("\t"))?;

    for entry in &input.index.scores {
        let country = country_at(input, entry);
        let mut fields = vec![
            entry.rank.map(|r| r.to_string()).unwrap_or_default(),
            entry.iso_code.clone(),
            country.map(|c| c.name.clone()).unwrap_or_default(),
            country
                .map(|c| c.income_group.name().to_string())
                .unwrap_or_default(),
            format_opt(entry.score),
            if entry.score.is_some() {
                "scored".to_string()
            } else {
                "cannot_score".to_string()
            },
        ];
        for col in 0..core.n_cols() {
            fields.push(format_opt(core.get(entry.row, col)));
            fields.push(
                input.normalized.core_periods[entry.row][col]
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
            );
            fields.push(input.imputed.imputed[entry.row][col].to_string());
            fields.push(format_opt(input.rescaled.matrix.get(entry.row, col)));
        }
        writeln!(w, "{}", fields.join("\t"))?;
    }
    w.flush()
}

fn write_context_tsv(input: &Stage7Input<'_>, path: &Path) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let context = &input.normalized.context;

    let mut header = vec!["iso_code".to_string(), "country_name".to_string()];
    header.extend(CONTEXT_INDICATORS.iter().map(|id| id.key().to_string()));
    writeln!(w, "{}", header.join("\t"))?;

    for entry in &input.index.scores {
        let mut fields = vec![
            entry.iso_code.clone(),
            country_at(input, entry)
                .map(|c| c.name.clone())
                .unwrap_or_default(),
        ];
        for id in CONTEXT_INDICATORS {
            let value = context
                .column_index(id)
                .and_then(|col| context.get(entry.row, col));
            fields.push(format_opt(value));
        }
        writeln!(w, "{}", fields.join("\t"))?;
    }
    w.flush()
}

fn country_at<'a>(input: &'a Stage7Input<'_>, entry: &CountryScore) -> Option<&'a CountryRecord> {
    input.eligible.countries.get(entry.row)
}

fn build_summary(input: &Stage7Input<'_>, diagnostics: Diagnostics) -> SummaryData {
    let scores = input.index.score_values();
    let core = &input.imputed.matrix;

    let mut imputed_by_indicator = BTreeMap::new();
    for (col, id) in core.columns.iter().enumerate() {
        let count = input.imputed.imputed.iter().filter(|r| r[col]).count();
        imputed_by_indicator.insert(id.key(), count);
    }

    SummaryData {
        tool: input.tool_name.clone(),
        tool_version: input.tool_version.clone(),
        input_files: input
            .files
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.display().to_string())
            })
            .collect(),
        skipped_rows: input.skipped_rows,
        profile: input.profile.clone(),
        indicators: builtin_indicators()
            .iter()
            .map(|d| IndicatorSummary {
                key: d.key,
                label: d.label,
                unit: d.unit,
                more_is_worse: d.more_is_worse,
                scored: d.core,
            })
            .collect(),
        eligibility: EligibilitySummary {
            n_classified: input.n_classified,
            n_eligible: input.eligible.len(),
            by_income_group: input
                .eligible
                .by_income_group
                .iter()
                .map(|(g, n)| (g.name(), *n))
                .collect(),
            rejected: input
                .eligible
                .rejected
                .iter()
                .map(|(iso, reason)| RejectedCountry {
                    iso_code: iso.clone(),
                    reason: reason.name(),
                })
                .collect(),
        },
        imputation: ImputationSummary {
            imputed_cells: input.imputed.imputed_cells(),
            imputed_by_indicator,
            column_fallbacks: input.imputed.column_fallbacks,
            wasting_from_fallback: input.normalized.wasting_from_fallback.clone(),
            missing_population: input.normalized.missing_population.clone(),
        },
        unscorable: input
            .imputed
            .unscorable
            .iter()
            .map(|&r| core.countries[r].clone())
            .collect(),
        index: IndexStats {
            n_scored: scores.len(),
            median: median(&scores),
            p10: p10(&scores),
            p90: p90(&scores),
            min: scores.iter().copied().reduce(f64::min).unwrap_or(0.0),
            max: scores.iter().copied().reduce(f64::max).unwrap_or(0.0),
        },
        diagnostics,
    }
}

fn build_report_context(input: &Stage7Input<'_>, summary: &SummaryData) -> ReportContext {
    let top = input
        .index
        .scored()
        .take(TOP_COUNTRIES)
        .filter_map(|s| {
            Some(RankedLine {
                rank: s.rank?,
                iso_code: s.iso_code.clone(),
                name: country_at(input, s)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| s.iso_code.clone()),
                score: s.score?,
            })
        })
        .collect();

    let outlier_notes = summary
        .diagnostics
        .columns
        .iter()
        .filter(|c| c.core && !c.outliers_3sigma.is_empty())
        .map(|c| {
            format!(
                "Outliers beyond 3 sigma in {}: {}",
                c.key,
                c.outliers_3sigma.join(", ")
            )
        })
        .collect();

    ReportContext {
        n_classified: summary.eligibility.n_classified,
        n_eligible: summary.eligibility.n_eligible,
        n_scored: summary.index.n_scored,
        top,
        unscorable: summary.unscorable.clone(),
        imputer: enum_name(&input.profile.imputer),
        scaler: enum_name(&input.profile.scaler),
        neighbors: input.profile.neighbors,
        imputed_cells: summary.imputation.imputed_cells,
        column_fallbacks: summary.imputation.column_fallbacks,
        missing_population: summary.imputation.missing_population.clone(),
        wasting_from_fallback: summary.imputation.wasting_from_fallback.clone(),
        skipped_rows: summary.skipped_rows,
        score_median: summary.index.median,
        score_p10: summary.index.p10,
        score_p90: summary.index.p90,
        collinear_pairs: summary.diagnostics.collinear_pairs(),
        outlier_notes,
    }
}

/// Kebab-case name as it appears in the profile JSON.
fn enum_name<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn write_text(path: &Path, text: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(text.as_bytes())?;
    w.flush()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage7_report.rs"]
mod tests;
