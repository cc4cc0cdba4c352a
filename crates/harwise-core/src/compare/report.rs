use super::{Comparison, ComparisonResult, Thresholds};
use std::fmt::Display;

/// Render a comparison as a Markdown report.
///
/// The report is a pure rendering of the already computed results; it has
/// no influence on whether a regression was detected.
pub fn render_markdown(
    comparison: &Comparison,
    baseline_name: &str,
    new_name: &str,
    thresholds: &Thresholds,
) -> String {
    let total = comparison.results.len();
    let regressions: Vec<&ComparisonResult> = comparison.regressions().collect();

    let mut md = String::new();
    md.push_str("# HAR Comparison Report\n\n");
    md.push_str(&format!("**Baseline:** {}\n", baseline_name));
    md.push_str(&format!("**New:** {}\n", new_name));
    md.push_str(&format!("**Time Regression Threshold:** {}%\n", thresholds.time_pct));
    md.push_str(&format!("**Size Regression Threshold:** {}%\n", thresholds.size_pct));

    md.push_str("\n## Summary\n\n");
    md.push_str(&format!("- **Total Endpoints:** {}\n", total));
    md.push_str(&format!("- **Regressions:** {}\n", regressions.len()));
    md.push_str(&format!("- **Clean:** {}\n", total - regressions.len()));

    md.push_str("\n## Results\n\n");
    md.push_str("| Endpoint | Status | Time (ms) | Size (bytes) | Δ% | Regression |\n");
    md.push_str("|----------|--------|-----------|--------------|----|------------|\n");

    for result in &comparison.results {
        let delta = if result.delta_pct == 0.0 {
            "-".to_string()
        } else {
            format!("{}%", signed_pct(result.delta_pct))
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            result.endpoint,
            transition(result.status_old, result.status_new),
            transition(result.time_old, result.time_new),
            transition(result.size_old, result.size_new),
            delta,
            if result.regression { "⚠️" } else { "✅" }
        ));
    }

    if !regressions.is_empty() {
        md.push_str("\n## Regressions\n\n");
        for r in regressions {
            md.push_str(&format!(
                "- **{}**: {}% change\n",
                r.endpoint,
                signed_pct(r.delta_pct)
            ));
        }
    }

    md
}

/// `old → new`, or a single value when nothing changed
fn transition<T: PartialEq + Display>(old: T, new: T) -> String {
    if old == new {
        old.to_string()
    } else {
        format!("{} → {}", old, new)
    }
}

fn signed_pct(pct: f64) -> String {
    if pct > 0.0 {
        format!("+{:.1}", pct)
    } else {
        format!("{:.1}", pct)
    }
}
