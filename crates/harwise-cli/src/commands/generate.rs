use crate::GlobalOptions;
use anyhow::{Context, Result};
use harwise_core::export::{generate_curl_suite, generate_insomnia_collection};
use harwise_core::testgen::{PartialTestConfig, TestConfig, TestSuite};
use std::fs;
use std::path::Path;

/// Build the generation config: config file over defaults, then CLI overrides
pub fn resolve_config(config: Option<&Path>, options: &GlobalOptions) -> Result<TestConfig> {
    let mut partial = match config {
        Some(path) => PartialTestConfig::from_file(path)?,
        None => PartialTestConfig::default(),
    };

    if let Some(mask) = &options.mask_headers {
        partial.mask_headers = Some(mask.iter().map(|h| h.trim().to_string()).collect());
    }
    if let Some(base_url) = &options.base_url {
        partial.base_url = Some(base_url.clone());
    }

    Ok(TestConfig::merged(partial))
}

pub fn execute_tests(
    file: &Path,
    out: &Path,
    config: Option<&Path>,
    scripts: bool,
    options: &GlobalOptions,
) -> Result<()> {
    tracing::info!("Generating tests from HAR file: {}", file.display());

    let config = resolve_config(config, options)?;
    let samples = super::load_samples(file, &options.sample_options())?;

    // An empty suite still gets a manifest so `test` reports 0/0
    let suite = TestSuite::generate(&samples, config);
    suite
        .write_to(out, scripts)
        .with_context(|| format!("Failed to write tests to {}", out.display()))?;

    if samples.is_empty() {
        println!("No API-like requests found");
        return Ok(());
    }

    println!(
        "Generated {} test files in {}",
        suite.cases.len(),
        out.display()
    );
    Ok(())
}

pub fn execute_insomnia(file: &Path, out: Option<&Path>, options: &GlobalOptions) -> Result<()> {
    tracing::info!("Generating Insomnia collection from: {}", file.display());

    let samples = super::load_samples(file, &options.sample_options())?;
    let collection = generate_insomnia_collection(&samples, &options.export_options(false))?;

    match out {
        Some(path) => {
            fs::write(path, collection)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Generated Insomnia collection with {} requests: {}",
                samples.len(),
                path.display()
            );
        }
        None => println!("{}", collection),
    }
    Ok(())
}

pub fn execute_curl(file: &Path, out: &Path, strict: bool, options: &GlobalOptions) -> Result<()> {
    tracing::info!("Generating curl suite from: {}", file.display());

    let samples = super::load_samples(file, &options.sample_options())?;
    let script = generate_curl_suite(&samples, &options.export_options(strict));

    fs::write(out, script).with_context(|| format!("Failed to write {}", out.display()))?;
    make_executable(out)?;

    println!(
        "Generated curl suite with {} requests: {}",
        samples.len(),
        out.display()
    );
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
