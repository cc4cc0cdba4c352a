mod case;
pub mod config;
mod script;

pub use case::{
    Assertion, Extraction, RequestTemplate, Substitution, TestCase, is_connection_header,
};
pub use config::{PartialTestConfig, TestConfig};
pub use script::render_script;

use crate::Result;
use crate::sample::Sample;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name of the manifest file inside a generated suite directory
pub const MANIFEST_FILE: &str = ".harwise.manifest.json";

/// Ordered index of the generated tests plus the config they were built with.
///
/// Order matters: extraction rules of earlier tests feed substitution
/// rules of later ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestManifest {
    pub tests: Vec<ManifestEntry>,
    pub config: TestConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file: String,
    pub name: String,
    #[serde(
        rename = "dependsOn",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub depends_on: Option<Vec<String>>,
}

impl TestManifest {
    /// Read the manifest of a suite directory
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        tracing::debug!("Reading manifest from: {}", path.display());

        let content = fs::read_to_string(&path)?;
        let manifest: TestManifest = serde_json::from_str(&content)?;

        tracing::info!("Loaded manifest with {} tests", manifest.tests.len());
        Ok(manifest)
    }
}

/// Descriptors and manifest generated from one sample set
#[derive(Debug, Clone)]
pub struct TestSuite {
    pub manifest: TestManifest,
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    /// Build one descriptor per sample, in sample order
    pub fn generate(samples: &[Sample], config: TestConfig) -> Self {
        tracing::debug!("Generating tests for {} samples", samples.len());

        let cases: Vec<TestCase> = samples
            .iter()
            .enumerate()
            .map(|(index, sample)| TestCase::build(sample, index, &config))
            .collect();

        let tests = cases
            .iter()
            .map(|case| ManifestEntry {
                file: case.file_name(),
                name: case.name.clone(),
                depends_on: None,
            })
            .collect();

        Self {
            manifest: TestManifest { tests, config },
            cases,
        }
    }

    /// Write descriptors and manifest into `dir`, creating it if needed.
    ///
    /// With `with_scripts`, a portable `test_<i>.spec.js` program is
    /// written next to each descriptor.
    pub fn write_to(&self, dir: &Path, with_scripts: bool) -> Result<()> {
        tracing::debug!("Writing test suite to: {}", dir.display());
        fs::create_dir_all(dir)?;

        for case in &self.cases {
            let json = serde_json::to_string_pretty(case)?;
            fs::write(dir.join(case.file_name()), json)?;

            if with_scripts {
                let script_name = format!("test_{}.spec.js", case.index);
                fs::write(dir.join(script_name), render_script(case))?;
            }
        }

        let manifest = serde_json::to_string_pretty(&self.manifest)?;
        fs::write(dir.join(MANIFEST_FILE), manifest)?;

        tracing::info!(
            "Wrote {} tests to {}",
            self.cases.len(),
            dir.display()
        );
        Ok(())
    }
}
