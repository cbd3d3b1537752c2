//! Rendering of analysis records in each output format

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{fmt_num, fmt_opt, fmt_percent, truncate_str};
use crate::cli::OutputFormat;
use crate::engine::bowtie::{BarrierCriticality, BowTieResult};
use crate::engine::fmea::{Criticality, FmeaAnalysis};
use crate::engine::monte_carlo::SimulationResult;
use crate::engine::scenario::ScenarioResult;
use crate::engine::var::VarResult;
use crate::engine::{AnalysisRecord, AnalysisResult, EvaluatorOutcome};

/// Render a record; `Auto` produces the styled terminal summary
pub fn render(record: &AnalysisRecord, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serde_yml::to_string(record).into_diagnostic(),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(record).into_diagnostic()?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Csv => render_csv(record),
        OutputFormat::Md => Ok(render_markdown(record)),
        OutputFormat::Auto => Ok(render_summary(record)),
    }
}

// ---------------------------------------------------------------------------
// Styled summary

fn render_summary(record: &AnalysisRecord) -> String {
    let mut out = String::new();
    let rule = style("─".repeat(60)).dim().to_string();

    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!(
        "{}: {}\n",
        style("Analysis").bold(),
        style(record.id.to_string()).cyan()
    ));
    out.push_str(&format!("{}: {}\n", style("Risk").bold(), style(&record.risk_id).yellow()));
    out.push_str(&format!(
        "{}: {}\n",
        style("Methodology").bold(),
        record.methodology.title()
    ));
    out.push_str(&format!("{}: {}\n", style("Seed").bold(), record.seed));
    out.push_str(&format!(
        "{}: {}\n",
        style("Confidence").bold(),
        fmt_percent(record.confidence_level * 100.0)
    ));
    if let Some(range) = record.uncertainty_range {
        out.push_str(&format!("{}: {}\n", style("Uncertainty").bold(), range));
    }
    out.push_str(&format!("{}\n", rule));

    for outcome in &record.calculation_results {
        out.push('\n');
        match outcome {
            EvaluatorOutcome::Completed(result) => summarize_result(&mut out, result),
            EvaluatorOutcome::Failed(failure) => {
                out.push_str(&format!(
                    "{} {} {}\n",
                    style("✗").red(),
                    style(failure.evaluator.methodology().title()).bold(),
                    style(format!("({})", failure.error_kind)).dim()
                ));
                out.push_str(&format!("  {}\n", style(&failure.message).red()));
            }
        }
    }

    push_list(&mut out, "Recommendations:", &record.recommendations);
    push_list(&mut out, "Assumptions:", &record.assumptions);
    push_list(&mut out, "Limitations:", &record.limitations);

    out.push('\n');
    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!(
        "{}: {}\n",
        style("Created").dim(),
        record.created.format("%Y-%m-%d %H:%M")
    ));
    out
}

fn push_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push('\n');
    out.push_str(&format!("{}\n", style(title).bold()));
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, item));
    }
}

fn heading(out: &mut String, result: &AnalysisResult) {
    out.push_str(&format!(
        "{} {}\n",
        style("✓").green(),
        style(result.kind().methodology().title()).bold()
    ));
}

fn line(out: &mut String, label: &str, value: impl std::fmt::Display) {
    out.push_str(&format!("  {}: {}\n", style(label).dim(), value));
}

fn summarize_result(out: &mut String, result: &AnalysisResult) {
    heading(out, result);
    match result {
        AnalysisResult::MonteCarlo(sim) => summarize_simulation(out, sim),
        AnalysisResult::Fmea(fmea) => summarize_fmea(out, fmea),
        AnalysisResult::BowTie(bt) => summarize_bow_tie(out, bt),
        AnalysisResult::Scenario(sc) => summarize_scenarios(out, sc),
        AnalysisResult::ValueAtRisk(var) => summarize_var(out, var),
    }
}

fn summarize_simulation(out: &mut String, sim: &SimulationResult) {
    line(out, "Iterations", format!("{} ({})", sim.iterations, sim.distribution));
    line(out, "Mean", fmt_num(sim.mean));
    line(out, "Median", fmt_num(sim.median));
    line(out, "Std dev", fmt_opt(sim.std_dev));
    line(out, "Skewness", fmt_opt(sim.skewness));
    line(out, "Kurtosis", fmt_opt(sim.kurtosis));
    line(out, "Range", format!("{} .. {}", fmt_num(sim.min), fmt_num(sim.max)));
    for p in &sim.percentiles {
        line(out, &format!("P{}", fmt_level(p.confidence)), fmt_num(p.value));
    }
    line(out, "Expected shortfall", fmt_num(sim.expected_shortfall));
    line(out, "95% interval", sim.confidence_interval_95);
    for s in &sim.sensitivity {
        line(out, &format!("Sensitivity ({})", s.factor), fmt_opt(s.correlation));
    }
}

fn summarize_fmea(out: &mut String, fmea: &FmeaAnalysis) {
    let summary = &fmea.summary;
    line(out, "Failure modes", summary.total_modes);
    line(out, "Average RPN", format!("{:.1}", summary.average_rpn));
    line(
        out,
        "Highest RPN",
        format!("{} ({})", summary.max_rpn, summary.highest_risk_mode),
    );
    for result in fmea.ranked() {
        out.push_str(&format!(
            "    {:>4}  {} {}\n",
            result.rpn,
            styled_criticality(result.criticality),
            truncate_str(&result.failure_mode.name, 40)
        ));
    }
}

fn styled_criticality(c: Criticality) -> String {
    let label = format!("{:<9}", c.to_string());
    match c {
        Criticality::Critical => style(label).red().bold().to_string(),
        Criticality::High => style(label).red().to_string(),
        Criticality::Medium => style(label).yellow().to_string(),
        Criticality::Low | Criticality::VeryLow => style(label).green().to_string(),
    }
}

fn summarize_bow_tie(out: &mut String, bt: &BowTieResult) {
    line(out, "Central event", &bt.central_event);
    line(out, "Threat probability", fmt_num(bt.aggregated_threat_probability));
    line(out, "Consequence impact", fmt_num(bt.aggregated_consequence_impact));
    line(out, "Initial risk", fmt_num(bt.initial_risk));
    line(out, "Residual risk", fmt_num(bt.residual_risk));
    line(
        out,
        "Risk reduction",
        bt.risk_reduction_percent
            .map(fmt_percent)
            .unwrap_or_else(|| "n/a".to_string()),
    );
    for barrier in bt.critical_single_points() {
        let crit = match barrier.criticality {
            BarrierCriticality::Critical => style(barrier.criticality.to_string()).red().bold(),
            _ => style(barrier.criticality.to_string()).red(),
        };
        out.push_str(&format!(
            "    {} {} barrier '{}' is a single point of failure ({})\n",
            style("!").yellow(),
            barrier.side,
            barrier.name,
            crit
        ));
    }
}

fn summarize_scenarios(out: &mut String, sc: &ScenarioResult) {
    for s in &sc.scenarios {
        line(
            out,
            &s.name.to_string(),
            format!("p={} impact={} ev={}", s.probability, fmt_num(s.impact), fmt_num(s.expected_value)),
        );
    }
    line(out, "Weighted average", fmt_num(sc.weighted_average));
    line(out, "Probability-weighted", fmt_opt(sc.probability_weighted_average));
    line(out, "Range", sc.range);
    line(out, "Focus", sc.priority_focus);
}

fn summarize_var(out: &mut String, var: &VarResult) {
    line(out, "Draws", var.draws);
    line(out, "VaR 95%", fmt_num(var.var_95));
    line(out, "VaR 99%", fmt_num(var.var_99));
    line(out, "Expected shortfall", fmt_num(var.expected_shortfall));
}

/// Confidence level as a percentile label, e.g. 0.975 -> "97.5"
fn fmt_level(confidence: f64) -> String {
    let pct = format!("{:.1}", confidence * 100.0);
    pct.trim_end_matches('0').trim_end_matches('.').to_string()
}

// ---------------------------------------------------------------------------
// CSV

/// One `section,metric,value` row per headline metric
fn render_csv(record: &AnalysisRecord) -> Result<String> {
    let mut rows: Vec<(String, String, String)> = Vec::new();
    let mut push = |section: &str, metric: &str, value: String| {
        rows.push((section.to_string(), metric.to_string(), value));
    };

    push("record", "id", record.id.to_string());
    push("record", "risk_id", record.risk_id.clone());
    push("record", "methodology", record.methodology.to_string());
    push("record", "seed", record.seed.to_string());
    push("record", "confidence_level", record.confidence_level.to_string());
    if let Some(range) = record.uncertainty_range {
        push("record", "uncertainty_min", range.min.to_string());
        push("record", "uncertainty_max", range.max.to_string());
    }

    for outcome in &record.calculation_results {
        match outcome {
            EvaluatorOutcome::Failed(f) => {
                let section = f.evaluator.as_str();
                push(section, "error_kind", f.error_kind.to_string());
                push(section, "message", f.message.clone());
            }
            EvaluatorOutcome::Completed(result) => {
                let section = result.kind().as_str();
                match result {
                    AnalysisResult::MonteCarlo(sim) => {
                        push(section, "iterations", sim.iterations.to_string());
                        push(section, "mean", sim.mean.to_string());
                        push(section, "median", sim.median.to_string());
                        push(section, "std_dev", opt_cell(sim.std_dev));
                        push(section, "skewness", opt_cell(sim.skewness));
                        push(section, "kurtosis", opt_cell(sim.kurtosis));
                        for p in &sim.percentiles {
                            push(section, &format!("p{}", fmt_level(p.confidence)), p.value.to_string());
                        }
                        push(section, "expected_shortfall", sim.expected_shortfall.to_string());
                    }
                    AnalysisResult::Fmea(fmea) => {
                        let s = &fmea.summary;
                        push(section, "total_modes", s.total_modes.to_string());
                        push(section, "average_rpn", s.average_rpn.to_string());
                        push(section, "max_rpn", s.max_rpn.to_string());
                        push(section, "highest_risk_mode", s.highest_risk_mode.clone());
                        for c in Criticality::all() {
                            let metric = c.to_string().to_lowercase().replace(' ', "_");
                            push(section, &metric, s.by_criticality.get(*c).to_string());
                        }
                    }
                    AnalysisResult::BowTie(bt) => {
                        push(section, "initial_risk", bt.initial_risk.to_string());
                        push(section, "residual_risk", bt.residual_risk.to_string());
                        push(section, "risk_reduction_percent", opt_cell(bt.risk_reduction_percent));
                    }
                    AnalysisResult::Scenario(sc) => {
                        push(section, "weighted_average", sc.weighted_average.to_string());
                        push(
                            section,
                            "probability_weighted_average",
                            opt_cell(sc.probability_weighted_average),
                        );
                        push(section, "variance", sc.variance.to_string());
                        push(section, "priority_focus", sc.priority_focus.to_string());
                    }
                    AnalysisResult::ValueAtRisk(var) => {
                        push(section, "var_95", var.var_95.to_string());
                        push(section, "var_99", var.var_99.to_string());
                        push(section, "expected_shortfall", var.expected_shortfall.to_string());
                    }
                }
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["section", "metric", "value"]).into_diagnostic()?;
    for (section, metric, value) in &rows {
        writer.write_record([section, metric, value]).into_diagnostic()?;
    }
    let bytes = writer.into_inner().map_err(|e| miette::miette!("{}", e))?;
    String::from_utf8(bytes).into_diagnostic()
}

fn opt_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Markdown

fn render_markdown(record: &AnalysisRecord) -> String {
    let mut output = String::new();
    output.push_str(&format!("# Risk Analysis {}\n\n", record.id));
    output.push_str(&format!("- **Risk:** {}\n", record.risk_id));
    output.push_str(&format!("- **Methodology:** {}\n", record.methodology.title()));
    output.push_str(&format!("- **Seed:** {}\n", record.seed));
    output.push_str(&format!(
        "- **Confidence:** {}\n",
        fmt_percent(record.confidence_level * 100.0)
    ));
    if let Some(range) = record.uncertainty_range {
        output.push_str(&format!("- **Uncertainty range:** {}\n", range));
    }
    output.push_str(&format!("- **Created:** {}\n", record.created.to_rfc3339()));

    for outcome in &record.calculation_results {
        match outcome {
            EvaluatorOutcome::Failed(f) => {
                output.push_str(&format!(
                    "\n## {} (failed)\n\n`{}`: {}\n",
                    f.evaluator.methodology().title(),
                    f.error_kind,
                    f.message
                ));
            }
            EvaluatorOutcome::Completed(result) => {
                output.push_str(&format!("\n## {}\n\n", result.kind().methodology().title()));
                output.push_str(&markdown_table(result));
                output.push('\n');
            }
        }
    }

    for (title, items) in [
        ("Recommendations", &record.recommendations),
        ("Assumptions", &record.assumptions),
        ("Limitations", &record.limitations),
    ] {
        if items.is_empty() {
            continue;
        }
        output.push_str(&format!("\n## {}\n\n", title));
        for item in items {
            output.push_str(&format!("- {}\n", item));
        }
    }
    output
}

fn markdown_table(result: &AnalysisResult) -> String {
    let mut builder = Builder::default();
    match result {
        AnalysisResult::MonteCarlo(sim) => {
            builder.push_record(["Metric", "Value"]);
            builder.push_record(["Iterations".to_string(), sim.iterations.to_string()]);
            builder.push_record(["Mean".to_string(), fmt_num(sim.mean)]);
            builder.push_record(["Median".to_string(), fmt_num(sim.median)]);
            builder.push_record(["Std dev".to_string(), fmt_opt(sim.std_dev)]);
            for p in &sim.percentiles {
                builder.push_record([format!("P{}", fmt_level(p.confidence)), fmt_num(p.value)]);
            }
            builder.push_record(["Expected shortfall".to_string(), fmt_num(sim.expected_shortfall)]);
        }
        AnalysisResult::Fmea(fmea) => {
            builder.push_record(["Failure Mode", "S", "O", "D", "RPN", "Criticality", "Action"]);
            for r in fmea.ranked() {
                builder.push_record([
                    truncate_str(&r.failure_mode.name, 30),
                    r.failure_mode.severity.to_string(),
                    r.failure_mode.occurrence.to_string(),
                    r.failure_mode.detection.to_string(),
                    r.rpn.to_string(),
                    r.criticality.to_string(),
                    r.action.clone(),
                ]);
            }
        }
        AnalysisResult::BowTie(bt) => {
            builder.push_record(["Barrier", "Side", "Effectiveness", "Criticality", "Single point"]);
            for b in &bt.barrier_criticality {
                builder.push_record([
                    b.name.clone(),
                    b.side.to_string(),
                    fmt_num(b.effectiveness),
                    b.criticality.to_string(),
                    if b.single_point_of_failure { "yes" } else { "no" }.to_string(),
                ]);
            }
        }
        AnalysisResult::Scenario(sc) => {
            builder.push_record(["Scenario", "Probability", "Impact", "Expected value"]);
            for s in &sc.scenarios {
                builder.push_record([
                    s.name.to_string(),
                    s.probability.to_string(),
                    fmt_num(s.impact),
                    fmt_num(s.expected_value),
                ]);
            }
        }
        AnalysisResult::ValueAtRisk(var) => {
            builder.push_record(["Metric", "Value"]);
            builder.push_record(["VaR 95%".to_string(), fmt_num(var.var_95)]);
            builder.push_record(["VaR 99%".to_string(), fmt_num(var.var_99)]);
            builder.push_record(["Expected shortfall".to_string(), fmt_num(var.expected_shortfall)]);
        }
    }
    let mut table = builder.build().with(Style::markdown()).to_string();
    table.push('\n');
    table
}
