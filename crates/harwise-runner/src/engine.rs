use crate::context::{TestContext, value_to_string};
use crate::jsonpath;
use crate::stats::RunSummary;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use harwise_core::filter::compile_lenient;
use harwise_core::testgen::{Assertion, ManifestEntry, TestCase, TestManifest};
use regex::NoExpand;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Instant;

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    LoadingManifest,
    /// Running the test at this manifest position
    Executing(usize),
    Aggregating,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingBreakdown {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub status: TestStatus,
    /// Wall time of the whole test, in milliseconds
    pub time: f64,
    /// Assertions evaluated; 0 for a failed test
    pub assertions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<TimingBreakdown>,
}

/// Per-test results in manifest order plus their aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub results: Vec<TestResult>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| r.status == TestStatus::Fail)
    }
}

/// Runs a generated suite one test at a time over a shared context
pub struct TestRunner<T: HttpTransport> {
    transport: T,
    state: RunState,
}

impl<T: HttpTransport> TestRunner<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run the suite in `dir` with a context seeded from its variable store.
    ///
    /// Only an unreadable manifest or store aborts the run; individual test
    /// failures are recorded and the run continues. Failing to write the
    /// store back is logged and the report is still returned.
    pub async fn run_dir(&mut self, dir: &Path) -> Result<RunReport> {
        self.state = RunState::LoadingManifest;
        let manifest = TestManifest::load(dir)
            .map_err(|e| Error::Manifest(format!("{}: {}", dir.display(), e)))?;
        let mut context = TestContext::load(dir)?;

        let report = self.run_manifest(dir, &manifest, &mut context).await;

        if let Err(e) = context.persist(dir) {
            tracing::warn!("Failed to persist variables in {}: {}", dir.display(), e);
        }
        self.state = RunState::Done;
        Ok(report)
    }

    /// Run every manifest entry in order, reading descriptors from `dir`
    pub async fn run_manifest(
        &mut self,
        dir: &Path,
        manifest: &TestManifest,
        context: &mut TestContext,
    ) -> RunReport {
        tracing::info!("Running {} tests", manifest.tests.len());

        let mut results = Vec::with_capacity(manifest.tests.len());
        for (position, entry) in manifest.tests.iter().enumerate() {
            self.state = RunState::Executing(position);
            results.push(self.run_entry(dir, entry, context).await);
        }

        self.state = RunState::Aggregating;
        let summary = RunSummary::from_results(&results);
        tracing::info!(
            "Run complete: {} passed, {} failed",
            summary.passed,
            summary.failed
        );

        RunReport { results, summary }
    }

    async fn run_entry(
        &self,
        dir: &Path,
        entry: &ManifestEntry,
        context: &mut TestContext,
    ) -> TestResult {
        let started_at = Utc::now();
        let start = Instant::now();

        let outcome = match TestCase::from_file(&dir.join(&entry.file)) {
            Ok(case) => self.execute(&case, context).await,
            Err(e) => Err(e.into()),
        };

        let time = start.elapsed().as_secs_f64() * 1000.0;
        let ended_at = Utc::now();

        match outcome {
            Ok(assertions) => {
                tracing::debug!("PASS {} ({:.0}ms)", entry.name, time);
                TestResult {
                    name: entry.name.clone(),
                    status: TestStatus::Pass,
                    time,
                    assertions,
                    error: None,
                    timing: Some(TimingBreakdown {
                        started_at,
                        ended_at,
                        duration_ms: time,
                    }),
                }
            }
            Err(e) => {
                tracing::debug!("FAIL {}: {}", entry.name, e);
                TestResult {
                    name: entry.name.clone(),
                    status: TestStatus::Fail,
                    time,
                    assertions: 0,
                    error: Some(e.to_string()),
                    timing: None,
                }
            }
        }
    }

    /// Interpret one descriptor against the shared context.
    ///
    /// Returns the number of assertions evaluated.
    pub async fn execute(&self, case: &TestCase, context: &mut TestContext) -> Result<usize> {
        let request = substitute(case, context);

        let start = Instant::now();
        let response = self.transport.send(&request).await?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut data: Option<Option<Value>> = None;
        let mut evaluated = 0;
        for assertion in &case.assertions {
            if assertion.needs_body() && data.is_none() {
                data = Some(parse_body(&response)?);
            }
            let body = data.as_ref().and_then(Option::as_ref);
            check(assertion, &response, elapsed_ms, body)?;
            evaluated += 1;
        }

        let data = match data {
            Some(data) => data,
            None => parse_body(&response)?,
        };

        if let Some(data) = &data {
            for extraction in &case.extractions {
                let found = jsonpath::query(data, &extraction.from)?;
                if let Some(first) = found.into_iter().next() {
                    context.set(&extraction.to, value_to_string(first));
                }
            }
        }

        Ok(evaluated)
    }
}

/// Apply the descriptor's substitutions to its URL and body
fn substitute(case: &TestCase, context: &TestContext) -> HttpRequest {
    let mut url = case.request.url.clone();
    let mut body = case.request.body.clone();

    for sub in &case.substitutions {
        let Some(value) = context.get(&sub.var).filter(|v| !v.is_empty()) else {
            continue;
        };
        let Some(re) = compile_lenient(&sub.pattern) else {
            continue;
        };

        url = re.replace_all(&url, NoExpand(&value)).into_owned();
        body = body.map(|b| re.replace_all(&b, NoExpand(&value)).into_owned());
    }

    HttpRequest {
        method: case.request.method.clone(),
        url,
        headers: case.request.headers.clone(),
        body,
    }
}

/// Parse the response body when the response declares a JSON content type
fn parse_body(response: &HttpResponse) -> Result<Option<Value>> {
    if !is_json(response.content_type()) {
        return Ok(None);
    }

    serde_json::from_str(&response.body)
        .map(Some)
        .map_err(|e| Error::Assertion(format!("Response body is not valid JSON: {}", e)))
}

fn is_json(content_type: &str) -> bool {
    content_type
        .parse::<mime::Mime>()
        .map(|m| m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON))
        .unwrap_or(false)
}

fn check(
    assertion: &Assertion,
    response: &HttpResponse,
    elapsed_ms: f64,
    body: Option<&Value>,
) -> Result<()> {
    match assertion {
        Assertion::StatusRange { min, max } => {
            let status = i64::from(response.status);
            if status < *min || status >= *max {
                return Err(Error::Assertion(format!(
                    "Unexpected status {} (expected {}..{})",
                    status, min, max
                )));
            }
        }
        Assertion::ContentType { contains } => {
            let actual = response.content_type();
            if !actual.contains(contains.as_str()) {
                return Err(Error::Assertion(format!(
                    "Expected content-type to contain {}, got {}",
                    contains, actual
                )));
            }
        }
        Assertion::MaxDuration { max_ms, sample_ms } => {
            if elapsed_ms > *max_ms as f64 {
                return Err(Error::Assertion(format!(
                    "Response time {:.0}ms exceeded limit of {}ms (sample: {}ms)",
                    elapsed_ms, max_ms, sample_ms
                )));
            }
        }
        Assertion::JsonPathExists { path } => {
            let found = jsonpath::query(body.unwrap_or(&Value::Null), path)?;
            if found.is_empty() {
                return Err(Error::Assertion(format!("{} should exist", path)));
            }
        }
        Assertion::JsonPathMinLength { path, min } => {
            let found = jsonpath::query(body.unwrap_or(&Value::Null), path)?;
            if found.len() < *min {
                return Err(Error::Assertion(format!(
                    "{} should have at least {} items, found {}",
                    path,
                    min,
                    found.len()
                )));
            }
        }
    }
    Ok(())
}
