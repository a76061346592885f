//! Expected mount contents
//!
//! Describes what a correctly mounted tree must (and must not) expose. The
//! built-in [`ExpectedTree::kwfs_fixture`] matches the server's seed data;
//! other fixtures can be supplied as JSON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{TesterError, TesterResult};

/// Who an entry should belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Principal {
    /// The user (or group) running the harness
    Current,
    /// Resolved through the user/group database
    Named(String),
    Id(u32),
}

/// Expectations for a single path under the mount point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedEntry {
    /// Relative to the mount point; `.` is the mount root itself
    pub path: PathBuf,
    /// Part of the top-level listing (hidden metadata entries are not)
    #[serde(default)]
    pub listed: bool,
    /// Permission bits (`mode & 0o777`)
    #[serde(default)]
    pub mode: Option<u32>,
    #[serde(default)]
    pub owner: Option<Principal>,
    #[serde(default)]
    pub group: Option<Principal>,
    #[serde(default)]
    pub content: Option<String>,
}

impl ExpectedEntry {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            listed: false,
            mode: None,
            owner: None,
            group: None,
            content: None,
        }
    }

    pub fn listed(mut self) -> Self {
        self.listed = true;
        self
    }

    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn owner(mut self, owner: Principal) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn group(mut self, group: Principal) -> Self {
        self.group = Some(group);
        self
    }

    pub fn content<S: Into<String>>(mut self, content: S) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Name as it appears in the top-level listing
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectedTree {
    pub entries: Vec<ExpectedEntry>,
    /// Names that must not appear in the top-level listing
    pub excluded: Vec<String>,
    /// Paths that must report "does not exist"
    pub absent: Vec<PathBuf>,
    /// Paths that must exist (liveness markers)
    pub markers: Vec<PathBuf>,
    /// Files that must contain a JSON array
    pub json_listings: Vec<PathBuf>,
}

impl ExpectedTree {
    /// Seed data served by the development server, as seen through kwfs
    pub fn kwfs_fixture() -> Self {
        Self {
            entries: vec![
                ExpectedEntry::new(".")
                    .mode(0o755)
                    .owner(Principal::Current)
                    .group(Principal::Current),
                ExpectedEntry::new(".json")
                    .mode(0o700)
                    .owner(Principal::Current)
                    .group(Principal::Current),
                ExpectedEntry::new(".json/secret")
                    .mode(0o700)
                    .owner(Principal::Current)
                    .group(Principal::Current),
                ExpectedEntry::new(".json/secrets")
                    .mode(0o400)
                    .owner(Principal::Current)
                    .group(Principal::Current),
                ExpectedEntry::new(".json/secret/Database_Password")
                    .mode(0o400)
                    .owner(Principal::Current)
                    .group(Principal::Current),
                ExpectedEntry::new("Database_Password")
                    .listed()
                    .mode(0o440)
                    .owner(Principal::Current),
                ExpectedEntry::new("General_Password")
                    .listed()
                    .mode(0o400)
                    .content("asddas"),
                ExpectedEntry::new("Nobody_PgPass")
                    .listed()
                    .mode(0o400)
                    .owner(Principal::Named("nobody".to_string())),
                // Configured owner does not resolve, so kwfs falls back to the mounting user
                ExpectedEntry::new("NonexistentOwner_Pass")
                    .listed()
                    .mode(0o400)
                    .owner(Principal::Current),
            ],
            excluded: vec!["Hacking_Password".to_string()],
            absent: vec![PathBuf::from("a_secret_which_does_not_exist")],
            markers: vec![PathBuf::from(".running")],
            json_listings: vec![PathBuf::from(".json/secrets")],
        }
    }

    /// Load a JSON description
    pub fn load(path: &Path) -> TesterResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TesterError::config("expected_tree", format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Names expected in the top-level listing
    pub fn listed_names(&self) -> Vec<String> {
        self.entries.iter().filter(|e| e.listed).map(ExpectedEntry::name).collect()
    }
}
