//! Named comparison cases and sessions that run several of them

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::CompareConfig;
use crate::diff::{ComparisonEngine, ComparisonResult};
use crate::normalize::HeaderNormalizer;
use crate::source::{SourceFactory, SourceSpec};

/// One named comparison between two file sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub source: SourceSpec,
    pub target: SourceSpec,
    /// Applied to both datasets before comparing
    #[serde(default)]
    pub header: HeaderNormalizer,
    #[serde(default)]
    pub compare: CompareConfig,
}

impl TestCase {
    pub fn new(
        name: impl Into<String>,
        source: SourceSpec,
        target: SourceSpec,
        compare: CompareConfig,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            target,
            header: HeaderNormalizer::default(),
            compare,
        }
    }

    pub fn with_header(mut self, header: HeaderNormalizer) -> Self {
        self.header = header;
        self
    }

    /// Load both sources, normalize headers and compare
    pub fn run(&self) -> Result<ComparisonResult> {
        let source_input = SourceFactory::create(&self.source)?;
        let target_input = SourceFactory::create(&self.target)?;
        debug!(
            "Comparing {} against {}",
            source_input.describe(),
            target_input.describe()
        );

        let mut source = source_input
            .load()
            .with_context(|| format!("Failed to load source {}", source_input.describe()))?;
        let mut target = target_input
            .load()
            .with_context(|| format!("Failed to load target {}", target_input.describe()))?;

        self.header.apply(&mut source);
        self.header.apply(&mut target);

        let result = ComparisonEngine::new(self.compare.clone()).compare(&source, &target)?;
        Ok(result)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for spec in [&mut self.source, &mut self.target] {
            if spec.path.is_relative() {
                spec.path = base.join(&spec.path);
            }
        }
    }
}

/// How a test case ended
#[derive(Debug, Clone, PartialEq)]
pub enum TestStatus {
    Completed(ComparisonResult),
    /// Loading or comparing failed; holds the error chain
    Failed(String),
}

/// Outcome of running one test case
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    pub name: String,
    pub source: PathBuf,
    pub target: PathBuf,
    pub status: TestStatus,
}

impl TestOutcome {
    pub fn result(&self) -> Option<&ComparisonResult> {
        match &self.status {
            TestStatus::Completed(result) => Some(result),
            TestStatus::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            TestStatus::Completed(_) => None,
            TestStatus::Failed(message) => Some(message),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, TestStatus::Failed(_))
    }

    pub fn has_differences(&self) -> bool {
        self.result().is_some_and(ComparisonResult::has_differences)
    }
}

/// An ordered collection of test cases
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    cases: Vec<TestCase>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, case: TestCase) {
        self.cases.push(case);
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Run every case in order; a failing case does not stop the rest
    pub fn run_all(&self) -> Vec<TestOutcome> {
        self.cases
            .iter()
            .map(|case| {
                info!("Running test case '{}'", case.name);
                let status = match case.run() {
                    Ok(result) => TestStatus::Completed(result),
                    Err(err) => {
                        warn!("Test case '{}' failed: {:#}", case.name, err);
                        TestStatus::Failed(format!("{:#}", err))
                    }
                };
                TestOutcome {
                    name: case.name.clone(),
                    source: case.source.path.clone(),
                    target: case.target.path.clone(),
                    status,
                }
            })
            .collect()
    }
}

/// Session file contents: a list of `[[test]]` tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(rename = "test", default)]
    pub tests: Vec<TestCase>,
}

impl SessionConfig {
    /// Parse a session from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse session file")
    }

    /// Load a session file; relative source paths resolve against its directory
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        let mut config = Self::from_toml_str(&text)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for case in &mut config.tests {
            case.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn into_session(self) -> Session {
        Session { cases: self.tests }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SESSION: &str = r#"
[[test]]
name = "orders"
source = { path = "old.csv" }
target = { path = "new.csv" }
header = { generalize = true }

[test.compare]
primary_key = ["order_id"]
ignore_columns = ["updated_at"]

[test.compare.default_policy]
absolute_tolerance = 0.01

[[test]]
name = "missing"
source = { path = "nope.csv" }
target = { path = "new.csv" }
compare = { primary_key = ["order_id"] }
"#;

    #[test]
    fn test_parse_session() {
        let config = SessionConfig::from_toml_str(SESSION).unwrap();
        assert_eq!(config.tests.len(), 2);

        let orders = &config.tests[0];
        assert_eq!(orders.name, "orders");
        assert!(orders.header.generalize);
        assert_eq!(orders.compare.primary_key, vec!["order_id"]);
        assert_eq!(orders.compare.default_policy.absolute_tolerance, Some(0.01));
    }

    #[test]
    fn test_run_all_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("old.csv"),
            "Order ID,Amount,Updated At\n1,10.00,2024-01-01\n2,5.00,2024-01-01\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("new.csv"),
            "order-id,amount,updated_at\n1,10.004,2024-02-01\n2,6.00,2024-02-01\n",
        )
        .unwrap();
        let session_path = dir.path().join("session.toml");
        fs::write(&session_path, SESSION).unwrap();

        let session = SessionConfig::from_path(&session_path).unwrap().into_session();
        let outcomes = session.run_all();
        assert_eq!(outcomes.len(), 2);

        let orders = outcomes[0].result().unwrap();
        assert_eq!(orders.summary().changed, 1);
        assert_eq!(orders.summary().unchanged, 1);
        assert_eq!(orders.compared_columns(), ["amount"]);

        assert!(outcomes[1].is_failed());
        assert!(outcomes[1].error().unwrap().contains("nope.csv"));
    }
}
