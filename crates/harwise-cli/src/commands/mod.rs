pub mod compare;
pub mod completion;
pub mod generate;
pub mod stats;

use anyhow::{Context, Result};
use harwise_core::har::HarReader;
use harwise_core::{Sample, SampleOptions};
use std::path::Path;

/// Read a capture and extract its API-like samples
pub fn load_samples(file: &Path, options: &SampleOptions) -> Result<Vec<Sample>> {
    tracing::debug!("Reading HAR file: {}", file.display());

    let har = HarReader::from_file(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    Ok(harwise_core::sample::extract_samples(&har, options))
}
