use crate::Result;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Name of the persisted variable store inside a suite directory
pub const ENV_FILE: &str = ".harwise.env.json";

/// Variable store shared by every test of one run.
///
/// Lookups check variables set during the run (or seeded from the
/// persisted store) first, then the process environment.
#[derive(Debug, Clone, Default)]
pub struct TestContext {
    vars: BTreeMap<String, String>,
    changed: BTreeSet<String>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context seeded with previously persisted values
    pub fn with_seed(seed: BTreeMap<String, String>) -> Self {
        Self {
            vars: seed,
            changed: BTreeSet::new(),
        }
    }

    /// Seed a context from the variable store in `dir`, if there is one
    pub fn load(dir: &Path) -> Result<Self> {
        let seed: BTreeMap<String, String> = read_store(&dir.join(ENV_FILE))?
            .into_iter()
            .map(|(k, v)| (k, value_to_string(v)))
            .collect();
        if !seed.is_empty() {
            tracing::debug!("Seeded context with {} persisted variables", seed.len());
        }
        Ok(Self::with_seed(seed))
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        tracing::debug!("Setting variable {}", name);
        self.vars.insert(name.to_string(), value);
        self.changed.insert(name.to_string());
    }

    /// Variables set during this run, with their latest values
    pub fn changed(&self) -> BTreeMap<String, String> {
        self.changed
            .iter()
            .filter_map(|name| self.vars.get(name).map(|v| (name.clone(), v.clone())))
            .collect()
    }

    /// Merge the variables set during this run into the store in `dir`.
    ///
    /// Returns `false` without touching the file when nothing was set.
    pub fn persist(&self, dir: &Path) -> Result<bool> {
        let changed = self.changed();
        if changed.is_empty() {
            return Ok(false);
        }

        let path = dir.join(ENV_FILE);
        let mut store = read_store(&path)?;
        store.extend(changed.into_iter().map(|(k, v)| (k, Value::String(v))));

        fs::write(&path, serde_json::to_string_pretty(&store)?)?;
        tracing::info!("Persisted {} variables to {}", store.len(), path.display());
        Ok(true)
    }
}

/// Read a flat key/value store as stored
fn read_store(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }

    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Context representation of a JSON value: strings unquoted, others as JSON
pub fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
