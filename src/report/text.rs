use crate::report::{ReportContext, format_f64_6};

pub fn render_report_text(ctx: &ReportContext) -> String {
    let mut out = String::new();

    out.push_str("Toughest Places to Feed a Family\n");
    out.push_str("================================\n\n");

    out.push_str("1. Coverage\n");
    out.push_str(&format!(
        "Classified countries: {}\nEligible countries: {}\nScored countries: {}\n",
        ctx.n_classified, ctx.n_eligible, ctx.n_scored
    ));
    out.push_str(&format!(
        "Method: {} imputation (k={}), {} rescaling, unweighted mean of 3 core indicators\n\n",
        ctx.imputer, ctx.neighbors, ctx.scaler
    ));

    out.push_str("2. Toughest places\n");
    if ctx.top.is_empty() {
        out.push_str("No country could be scored.\n");
    }
    for line in &ctx.top {
        out.push_str(&format!(
            "{:>3}. {} ({}) score={}\n",
            line.rank,
            line.name,
            line.iso_code,
            format_f64_6(line.score)
        ));
    }
    out.push_str(&format!(
        "Score median: {} (p10 {}, p90 {})\n\n",
        format_f64_6(ctx.score_median),
        format_f64_6(ctx.score_p10),
        format_f64_6(ctx.score_p90)
    ));

    out.push_str("3. Countries that cannot be scored\n");
    if ctx.unscorable.is_empty() {
        out.push_str("None.\n\n");
    } else {
        out.push_str(&format!(
            "{} (no core indicator available)\n\n",
            ctx.unscorable.join(", ")
        ));
    }

    out.push_str("4. Data quality and caveats\n");
    out.push_str(&format!("Imputed cells: {}\n", ctx.imputed_cells));
    if ctx.column_fallbacks > 0 {
        out.push_str(&format!(
            "Cells filled from a column-wide statistic: {}\n",
            ctx.column_fallbacks
        ));
    }
    if ctx.skipped_rows > 0 {
        out.push_str(&format!(
            "Malformed input rows skipped: {}\n",
            ctx.skipped_rows
        ));
    }
    if !ctx.missing_population.is_empty() {
        out.push_str(&format!(
            "No population figure (per-capita values missing): {}\n",
            ctx.missing_population.join(", ")
        ));
    }
    if !ctx.wasting_from_fallback.is_empty() {
        out.push_str(&format!(
            "Wasting taken from the secondary source: {}\n",
            ctx.wasting_from_fallback.join(", ")
        ));
    }
    for (a, b) in &ctx.collinear_pairs {
        out.push_str(&format!("Collinear indicators: {} ~ {}\n", a, b));
    }
    for note in &ctx.outlier_notes {
        out.push_str(&format!("{}\n", note));
    }
    out.push_str(
        "Context indicators (reserves, debt service, food security index) are reported, not scored.\n",
    );

    out
}
