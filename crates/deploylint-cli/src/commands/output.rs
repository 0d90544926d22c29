//! Shared output formatting for lint reports.

use anyhow::Result;
use deploylint_core::{LintReport, Recommendation, RecommendationDiagnostic, Severity};
use miette::NamedSource;

use crate::OutputFormat;

/// Print a lint report in the specified format.
pub fn print(report: &LintReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(report),
        OutputFormat::Json => return print_json(report),
        OutputFormat::Compact => print_compact(report),
    }
    Ok(())
}

fn print_text(report: &LintReport) {
    let (errors, warnings, infos) = report.count_by_severity();

    for recommendation in &report.recommendations {
        println!("{}", render_diagnostic(report, recommendation));
        if let Some(diff) = &recommendation.diff {
            println!("{diff}");
        }
    }

    for failure in &report.failures {
        println!("\x1b[31mrule failed\x1b[0m {failure}");
    }

    let summary_color = if errors > 0 || report.is_partial() {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };

    println!(
        "{}Found {} error(s), {} warning(s), {} info(s) in {} config(s) and {} Dockerfile(s)\x1b[0m",
        summary_color,
        errors,
        warnings,
        infos,
        report.units_checked,
        report.dockerfiles_checked
    );
}

/// Renders a recommendation against the text it was computed on, falling
/// back to the plain format when the snapshot is missing.
fn render_diagnostic(report: &LintReport, recommendation: &Recommendation) -> String {
    let Some(source) = report.source_for(recommendation) else {
        return recommendation.format();
    };
    let name = recommendation.flagged_config.path.display().to_string();
    let diagnostic = miette::Report::new(RecommendationDiagnostic::from(recommendation))
        .with_source_code(NamedSource::new(name, source.to_string()));
    let severity = match recommendation.severity {
        Severity::Error => "\x1b[31merror\x1b[0m",
        Severity::Warning => "\x1b[33mwarning\x1b[0m",
        Severity::Info => "\x1b[34minfo\x1b[0m",
    };
    format!("{severity}: {diagnostic:?}")
}

fn print_json(report: &LintReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}

fn print_compact(report: &LintReport) {
    for recommendation in &report.recommendations {
        println!("{recommendation}");
    }
    for failure in &report.failures {
        println!("{failure}");
    }
}
