//! Test catalog
//!
//! Maps suite ids to ordered lists of test case descriptors. Resolution is
//! total: an unknown suite id yields the default suite instead of an error.
//! The catalog is either the built-in set or loaded from a YAML file.

mod builtin;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};

pub use builtin::DEFAULT_SUITE;

/// Outcome a simulated test is defined to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedOutcome {
    Pass,
    Fail,
}

/// Static definition of one test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseDescriptor {
    /// Test name, unique within its suite
    pub name: String,
    /// Outcome the test always reports
    #[serde(rename = "expect")]
    pub expected_outcome: ExpectedOutcome,
    /// Error detail logged on failure; empty for passing tests
    #[serde(default)]
    pub failure_message: String,
}

impl TestCaseDescriptor {
    /// A test that passes
    pub fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            expected_outcome: ExpectedOutcome::Pass,
            failure_message: String::new(),
        }
    }

    /// A test that fails with the given detail message
    pub fn fail(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            expected_outcome: ExpectedOutcome::Fail,
            failure_message: message.to_string(),
        }
    }
}

/// A named, ordered collection of test case descriptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    pub id: String,
    pub tests: Vec<TestCaseDescriptor>,
}

impl Suite {
    pub fn new(id: &str, tests: Vec<TestCaseDescriptor>) -> Self {
        Self {
            id: id.to_string(),
            tests,
        }
    }

    /// Number of tests expected to fail
    pub fn expected_failures(&self) -> usize {
        self.tests
            .iter()
            .filter(|t| t.expected_outcome == ExpectedOutcome::Fail)
            .count()
    }
}

/// YAML file layout
#[derive(Deserialize, Debug)]
struct CatalogFile {
    suites: Vec<SuiteEntry>,
}

#[derive(Deserialize, Debug)]
struct SuiteEntry {
    name: String,
    #[serde(default)]
    default: bool,
    tests: Vec<TestCaseDescriptor>,
}

/// Mapping from suite id to ordered descriptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    suites: Vec<Suite>,
    default_index: usize,
}

impl Default for Catalog {
    fn default() -> Self {
        builtin::catalog()
    }
}

impl Catalog {
    /// The built-in catalog
    pub fn builtin() -> Self {
        builtin::catalog()
    }

    /// Assemble a catalog from already validated parts
    fn from_parts(suites: Vec<Suite>, default_index: usize) -> Self {
        debug_assert!(default_index < suites.len());
        Self {
            suites,
            default_index,
        }
    }

    /// Load a catalog from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        let catalog = Self::from_yaml_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            suites = catalog.suites.len(),
            "Loaded test catalog"
        );
        Ok(catalog)
    }

    /// Parse and validate a catalog from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(content)
            .map_err(|e| Error::CatalogInvalid(format!("Failed to parse catalog: {}", e)))?;

        if file.suites.is_empty() {
            return Err(Error::CatalogInvalid("catalog defines no suites".to_string()));
        }

        let mut seen = HashSet::new();
        let mut default_index = None;
        for (i, entry) in file.suites.iter().enumerate() {
            if !seen.insert(entry.name.as_str()) {
                return Err(Error::CatalogInvalid(format!(
                    "duplicate suite '{}'",
                    entry.name
                )));
            }
            if entry.tests.is_empty() {
                return Err(Error::CatalogInvalid(format!(
                    "suite '{}' has no tests",
                    entry.name
                )));
            }
            let mut names = HashSet::new();
            if let Some(test) = entry.tests.iter().find(|t| !names.insert(t.name.as_str())) {
                return Err(Error::CatalogInvalid(format!(
                    "duplicate test '{}' in suite '{}'",
                    test.name, entry.name
                )));
            }
            if let Some(test) = entry.tests.iter().find(|t| {
                t.expected_outcome == ExpectedOutcome::Pass && !t.failure_message.is_empty()
            }) {
                return Err(Error::CatalogInvalid(format!(
                    "passing test '{}' in suite '{}' must not carry a failure message",
                    test.name, entry.name
                )));
            }
            if entry.default {
                if let Some(prev) = default_index {
                    let prev: &SuiteEntry = &file.suites[prev];
                    return Err(Error::CatalogInvalid(format!(
                        "both '{}' and '{}' are marked default",
                        prev.name, entry.name
                    )));
                }
                default_index = Some(i);
            }
        }

        let suites = file
            .suites
            .into_iter()
            .map(|entry| Suite {
                id: entry.name,
                tests: entry.tests,
            })
            .collect();

        Ok(Self::from_parts(suites, default_index.unwrap_or(0)))
    }

    /// Resolve a suite id to its ordered test list
    ///
    /// Unknown ids fall back to the default suite.
    pub fn resolve(&self, suite_id: &str) -> &[TestCaseDescriptor] {
        match self.get(suite_id) {
            Some(suite) => &suite.tests,
            None => {
                tracing::warn!(
                    suite = %suite_id,
                    default = %self.default_suite().id,
                    "Unknown suite, falling back to default"
                );
                &self.default_suite().tests
            }
        }
    }

    /// Look up a suite by id
    pub fn get(&self, suite_id: &str) -> Option<&Suite> {
        self.suites.iter().find(|s| s.id == suite_id)
    }

    /// The suite used for unknown ids
    pub fn default_suite(&self) -> &Suite {
        &self.suites[self.default_index]
    }

    /// All suites in catalog order
    pub fn suites(&self) -> &[Suite] {
        &self.suites
    }
}
