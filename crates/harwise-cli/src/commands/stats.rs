use crate::{GlobalOptions, OutputFormat};
use anyhow::Result;
use harwise_core::stats::{ApiStats, StatsAnalyzer};
use std::path::Path;

/// Summarize the API-like samples of a HAR file
pub fn compute_stats(file: &Path, options: &GlobalOptions) -> Result<ApiStats> {
    let samples = super::load_samples(file, &options.sample_options())?;
    Ok(StatsAnalyzer::default().analyze(&samples))
}

pub fn execute(file: &Path, options: &GlobalOptions, format: OutputFormat) -> Result<()> {
    tracing::info!("Extracting statistics from HAR file: {}", file.display());

    let stats = compute_stats(file, options)?;

    match format {
        OutputFormat::Json => output_json(&stats)?,
        OutputFormat::Table => output_table(&stats),
        OutputFormat::Pretty => output_pretty(&stats),
    }

    Ok(())
}

fn output_pretty(stats: &ApiStats) {
    use console::style;

    if stats.total_requests == 0 {
        println!("{}", style("No API-like requests found").yellow());
        return;
    }

    println!("\n{}", style("API Summary").bold().cyan());
    println!("{}", style("===========").cyan());

    println!("  Total Requests:  {}", stats.total_requests);
    println!("  Average Time:    {:.2} ms", stats.average_time);
    println!("  Average Size:    {:.0} bytes", stats.average_size);

    println!("\n{}", style("Status Codes:").bold());
    for (status, count) in &stats.status_counts {
        let label = if *status >= 400 {
            style(status.to_string()).red()
        } else {
            style(status.to_string()).green()
        };
        println!("  {}: {}", label, count);
    }

    if !stats.slowest_requests.is_empty() {
        println!("\n{}", style("Slowest Requests:").bold());
        for (i, req) in stats.slowest_requests.iter().enumerate() {
            println!(
                "  {}. [{:.2} ms] {} - {}",
                i + 1,
                req.time,
                req.status,
                req.key
            );
        }
    }

    println!();
}

fn output_json(stats: &ApiStats) -> Result<()> {
    let json = serde_json::to_string_pretty(stats)?;
    println!("{}", json);
    Ok(())
}

fn output_table(stats: &ApiStats) {
    println!("Metric,Value");
    println!("Total Requests,{}", stats.total_requests);
    println!("Average Time (ms),{:.2}", stats.average_time);
    println!("Average Size (bytes),{:.0}", stats.average_size);
    for (status, count) in &stats.status_counts {
        println!("Status {},{}", status, count);
    }
}
