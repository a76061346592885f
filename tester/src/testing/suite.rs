//! Runs every expectation of an [`ExpectedTree`] against a mount point

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::assertions::{AssertionResult, MountAssertions};
use super::expected::ExpectedTree;
use shared::{Component, component_error, component_info};

/// Per-check results of one suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub results: Vec<AssertionResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SuiteReport {
    /// Verdict: every check passed
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &AssertionResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn log_summary(&self) {
        for result in &self.results {
            if result.success {
                component_info!(Component::Tester, "  ✅ {} {}: {}", result.subject, check_label(result), result.message);
            } else {
                component_error!(
                    Component::Tester,
                    "  ❌ {} {}: {}{}",
                    result.subject,
                    check_label(result),
                    result.message,
                    result.details.as_deref().map(|d| format!(" ({d})")).unwrap_or_default()
                );
            }
        }
        component_info!(
            Component::Tester,
            "📊 {} examples, {} failures",
            self.total(),
            self.failed_count()
        );
    }
}

fn check_label(result: &AssertionResult) -> String {
    format!("[{:?}]", result.check)
}

pub struct AssertionSuite {
    expected: ExpectedTree,
}

impl AssertionSuite {
    pub fn new(expected: ExpectedTree) -> Self {
        Self { expected }
    }

    pub fn expected(&self) -> &ExpectedTree {
        &self.expected
    }

    /// Evaluate every check; a failing check never prevents the rest
    pub fn run(&self, mount_point: &Path) -> SuiteReport {
        let started_at = Utc::now();
        let assertions = MountAssertions::new(mount_point);
        let tree = &self.expected;
        let mut results = Vec::new();

        let listed = tree.listed_names();
        results.push(assertions.assert_listing_count(listed.len()));
        for name in &listed {
            results.push(assertions.assert_listed(name));
        }
        for name in &tree.excluded {
            results.push(assertions.assert_excluded(name));
        }

        for entry in &tree.entries {
            if let Some(mode) = entry.mode {
                results.push(assertions.assert_mode(&entry.path, mode));
            }
            if let Some(owner) = &entry.owner {
                results.push(assertions.assert_owner(&entry.path, owner));
            }
            if let Some(group) = &entry.group {
                results.push(assertions.assert_group(&entry.path, group));
            }
            if let Some(content) = &entry.content {
                results.push(assertions.assert_content(&entry.path, content));
            }
        }

        for marker in &tree.markers {
            results.push(assertions.assert_exists(marker));
        }
        for listing in &tree.json_listings {
            results.push(assertions.assert_json_array(listing));
        }
        for path in &tree.absent {
            results.push(assertions.assert_absent(path));
        }

        SuiteReport {
            results,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
