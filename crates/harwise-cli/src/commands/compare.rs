use crate::{GlobalOptions, OutputFormat};
use anyhow::{Context, Result};
use harwise_core::compare::{Comparison, Thresholds, compare, render_markdown};
use std::fs;
use std::path::{Path, PathBuf};

/// Compare the API-like samples of two HAR files
pub fn compare_hars(
    baseline: &Path,
    new: &Path,
    options: &GlobalOptions,
    thresholds: &Thresholds,
) -> Result<Comparison> {
    let sample_options = options.sample_options();
    let baseline_samples = super::load_samples(baseline, &sample_options)?;
    let new_samples = super::load_samples(new, &sample_options)?;

    Ok(compare(&baseline_samples, &new_samples, thresholds))
}

/// Run the comparison and emit the report.
///
/// Returns whether any endpoint regressed.
pub fn execute(
    baseline: &Path,
    new: &Path,
    thresholds: Thresholds,
    out: Option<PathBuf>,
    options: &GlobalOptions,
    format: OutputFormat,
) -> Result<bool> {
    tracing::info!(
        "Comparing {} against {}",
        new.display(),
        baseline.display()
    );

    let comparison = compare_hars(baseline, new, options, &thresholds)?;

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&comparison)?,
        _ => render_markdown(
            &comparison,
            &file_label(baseline),
            &file_label(new),
            &thresholds,
        ),
    };

    match out {
        Some(path) => {
            fs::write(&path, rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    let has_regression = comparison.has_regression();
    if has_regression {
        eprintln!(
            "{}",
            console::style(format!(
                "{} regression(s) detected",
                comparison.regressions().count()
            ))
            .red()
            .bold()
        );
    }

    Ok(has_regression)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
