//! Filesystem assertions over a mounted tree
//!
//! Each check inspects one property of one path and produces an
//! [`AssertionResult`]; checks never short-circuit one another.

use nix::unistd::{Group, User, getgid, getuid};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use super::expected::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    ListingCount,
    Listed,
    Excluded,
    Mode,
    Owner,
    Group,
    Content,
    Exists,
    Absent,
    JsonArray,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionResult {
    pub check: CheckKind,
    /// Path (relative to the mount point) or listing the check looked at
    pub subject: String,
    pub success: bool,
    pub message: String,
    pub details: Option<String>,
}

impl AssertionResult {
    pub fn success(check: CheckKind, subject: impl Into<String>, message: String) -> Self {
        Self {
            check,
            subject: subject.into(),
            success: true,
            message,
            details: None,
        }
    }

    pub fn failure(check: CheckKind, subject: impl Into<String>, message: String) -> Self {
        Self {
            check,
            subject: subject.into(),
            success: false,
            message,
            details: None,
        }
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }
}

/// Which id database a principal is resolved against
#[derive(Debug, Clone, Copy)]
enum IdKind {
    User,
    Group,
}

/// Assertions rooted at a mount point
#[derive(Debug, Clone)]
pub struct MountAssertions {
    root: PathBuf,
}

impl MountAssertions {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &Path) -> PathBuf {
        if relative == Path::new(".") {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }

    /// Visible (non-dot) names in the mount root, sorted
    pub fn visible_entries(&self) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn assert_listing_count(&self, expected: usize) -> AssertionResult {
        match self.visible_entries() {
            Ok(names) if names.len() == expected => AssertionResult::success(
                CheckKind::ListingCount,
                ".",
                format!("Mount lists {expected} entries"),
            ),
            Ok(names) => AssertionResult::failure(
                CheckKind::ListingCount,
                ".",
                format!("Expected {expected} entries, found {}", names.len()),
            )
            .with_details(names.join(", ")),
            Err(e) => AssertionResult::failure(CheckKind::ListingCount, ".", format!("Cannot list mount: {e}")),
        }
    }

    pub fn assert_listed(&self, name: &str) -> AssertionResult {
        match self.visible_entries() {
            Ok(names) if names.iter().any(|n| n == name) => {
                AssertionResult::success(CheckKind::Listed, name, format!("'{name}' is listed"))
            }
            Ok(names) => AssertionResult::failure(CheckKind::Listed, name, format!("'{name}' is missing from listing"))
                .with_details(names.join(", ")),
            Err(e) => AssertionResult::failure(CheckKind::Listed, name, format!("Cannot list mount: {e}")),
        }
    }

    pub fn assert_excluded(&self, name: &str) -> AssertionResult {
        match self.visible_entries() {
            Ok(names) if names.iter().any(|n| n == name) => {
                AssertionResult::failure(CheckKind::Excluded, name, format!("'{name}' should not be listed"))
            }
            Ok(_) => AssertionResult::success(CheckKind::Excluded, name, format!("'{name}' is not listed")),
            Err(e) => AssertionResult::failure(CheckKind::Excluded, name, format!("Cannot list mount: {e}")),
        }
    }

    pub fn assert_mode(&self, relative: &Path, expected: u32) -> AssertionResult {
        let subject = relative.display().to_string();
        match std::fs::metadata(self.resolve(relative)) {
            Ok(meta) => {
                let actual = meta.mode() & 0o777;
                if actual == expected {
                    AssertionResult::success(CheckKind::Mode, subject, format!("Mode is {expected:o}"))
                } else {
                    AssertionResult::failure(
                        CheckKind::Mode,
                        subject,
                        format!("Expected mode {expected:o}, found {actual:o}"),
                    )
                }
            }
            Err(e) => AssertionResult::failure(CheckKind::Mode, subject, format!("Cannot stat: {e}")),
        }
    }

    pub fn assert_owner(&self, relative: &Path, expected: &Principal) -> AssertionResult {
        self.assert_principal(relative, expected, IdKind::User)
    }

    pub fn assert_group(&self, relative: &Path, expected: &Principal) -> AssertionResult {
        self.assert_principal(relative, expected, IdKind::Group)
    }

    fn assert_principal(&self, relative: &Path, expected: &Principal, kind: IdKind) -> AssertionResult {
        let check = match kind {
            IdKind::User => CheckKind::Owner,
            IdKind::Group => CheckKind::Group,
        };
        let subject = relative.display().to_string();

        let wanted = match resolve_principal(expected, kind) {
            Ok(id) => id,
            Err(message) => return AssertionResult::failure(check, subject, message),
        };

        match std::fs::metadata(self.resolve(relative)) {
            Ok(meta) => {
                let actual = match kind {
                    IdKind::User => meta.uid(),
                    IdKind::Group => meta.gid(),
                };
                if actual == wanted {
                    AssertionResult::success(check, subject, format!("Owned by {expected:?} ({wanted})"))
                } else {
                    AssertionResult::failure(
                        check,
                        subject,
                        format!("Expected {expected:?} ({wanted}), found {actual}"),
                    )
                }
            }
            Err(e) => AssertionResult::failure(check, subject, format!("Cannot stat: {e}")),
        }
    }

    pub fn assert_content(&self, relative: &Path, expected: &str) -> AssertionResult {
        let subject = relative.display().to_string();
        match std::fs::read(self.resolve(relative)) {
            Ok(bytes) if bytes == expected.as_bytes() => {
                AssertionResult::success(CheckKind::Content, subject, "Content matches".to_string())
            }
            Ok(bytes) => AssertionResult::failure(CheckKind::Content, subject, "Content differs".to_string())
                .with_details(format!("expected {:?}, found {:?}", expected, String::from_utf8_lossy(&bytes))),
            Err(e) => AssertionResult::failure(CheckKind::Content, subject, format!("Cannot read: {e}")),
        }
    }

    pub fn assert_exists(&self, relative: &Path) -> AssertionResult {
        let subject = relative.display().to_string();
        match std::fs::symlink_metadata(self.resolve(relative)) {
            Ok(_) => AssertionResult::success(CheckKind::Exists, subject, "Exists".to_string()),
            Err(e) => AssertionResult::failure(CheckKind::Exists, subject, format!("Missing: {e}")),
        }
    }

    /// Passes only on "does not exist"; permission or I/O errors fail
    pub fn assert_absent(&self, relative: &Path) -> AssertionResult {
        let subject = relative.display().to_string();
        match std::fs::symlink_metadata(self.resolve(relative)) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                AssertionResult::success(CheckKind::Absent, subject, "Does not exist".to_string())
            }
            Err(e) => AssertionResult::failure(
                CheckKind::Absent,
                subject,
                format!("Expected \"does not exist\", got: {e}"),
            ),
            Ok(_) => AssertionResult::failure(CheckKind::Absent, subject, "Unexpectedly exists".to_string()),
        }
    }

    pub fn assert_json_array(&self, relative: &Path) -> AssertionResult {
        let subject = relative.display().to_string();
        let raw = match std::fs::read(self.resolve(relative)) {
            Ok(raw) => raw,
            Err(e) => return AssertionResult::failure(CheckKind::JsonArray, subject, format!("Cannot read: {e}")),
        };

        match serde_json::from_slice::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Array(items)) => AssertionResult::success(
                CheckKind::JsonArray,
                subject,
                format!("JSON array with {} element(s)", items.len()),
            ),
            Ok(other) => AssertionResult::failure(CheckKind::JsonArray, subject, "Not a JSON array".to_string())
                .with_details(other.to_string()),
            Err(e) => AssertionResult::failure(CheckKind::JsonArray, subject, format!("Invalid JSON: {e}")),
        }
    }
}

fn resolve_principal(principal: &Principal, kind: IdKind) -> Result<u32, String> {
    match (principal, kind) {
        (Principal::Id(id), _) => Ok(*id),
        (Principal::Current, IdKind::User) => Ok(getuid().as_raw()),
        (Principal::Current, IdKind::Group) => Ok(getgid().as_raw()),
        (Principal::Named(name), IdKind::User) => match User::from_name(name) {
            Ok(Some(user)) => Ok(user.uid.as_raw()),
            Ok(None) => Err(format!("No such user '{name}'")),
            Err(e) => Err(format!("User lookup for '{name}' failed: {e}")),
        },
        (Principal::Named(name), IdKind::Group) => match Group::from_name(name) {
            Ok(Some(group)) => Ok(group.gid.as_raw()),
            Ok(None) => Err(format!("No such group '{name}'")),
            Err(e) => Err(format!("Group lookup for '{name}' failed: {e}")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn tree() -> (tempfile::TempDir, MountAssertions) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("General_Password"), "asddas").unwrap();
        std::fs::set_permissions(dir.path().join("General_Password"), std::fs::Permissions::from_mode(0o400))
            .unwrap();
        std::fs::write(dir.path().join(".running"), "").unwrap();
        let assertions = MountAssertions::new(dir.path());
        (dir, assertions)
    }

    #[test]
    fn test_listing_ignores_hidden_entries() {
        let (_dir, assertions) = tree();
        assert_eq!(assertions.visible_entries().unwrap(), vec!["General_Password"]);
        assert!(assertions.assert_listing_count(1).success);
        assert!(!assertions.assert_listing_count(4).success);
        assert!(assertions.assert_listed("General_Password").success);
        assert!(assertions.assert_excluded("Hacking_Password").success);
        assert!(!assertions.assert_excluded("General_Password").success);
    }

    #[test]
    fn test_mode_and_content() {
        let (_dir, assertions) = tree();
        let path = Path::new("General_Password");
        assert!(assertions.assert_mode(path, 0o400).success);
        assert!(!assertions.assert_mode(path, 0o440).success);
        assert!(assertions.assert_content(path, "asddas").success);

        let wrong = assertions.assert_content(path, "asddas\n");
        assert!(!wrong.success);
        assert!(wrong.details.is_some());
    }

    #[test]
    fn test_owner_current_and_numeric() {
        let (_dir, assertions) = tree();
        let path = Path::new("General_Password");
        assert!(assertions.assert_owner(path, &Principal::Current).success);
        assert!(assertions.assert_owner(path, &Principal::Id(getuid().as_raw())).success);
        assert!(assertions.assert_group(path, &Principal::Current).success);
        assert!(!assertions.assert_owner(path, &Principal::Id(getuid().as_raw() + 1)).success);
    }

    #[test]
    fn test_unknown_named_owner_fails() {
        let (_dir, assertions) = tree();
        let result = assertions.assert_owner(
            Path::new("General_Password"),
            &Principal::Named("kwfs-no-such-user".to_string()),
        );
        assert!(!result.success);
        assert!(result.message.contains("No such user"));
    }

    #[test]
    fn test_absent_distinguishes_missing_from_present() {
        let (_dir, assertions) = tree();
        assert!(assertions.assert_absent(Path::new("a_secret_which_does_not_exist")).success);
        assert!(!assertions.assert_absent(Path::new("General_Password")).success);
        assert!(assertions.assert_exists(Path::new(".running")).success);
        assert!(!assertions.assert_exists(Path::new("missing")).success);
    }

    #[test]
    fn test_json_array() {
        let (dir, assertions) = tree();
        std::fs::write(dir.path().join("array"), r#"[{"name":"General_Password"}]"#).unwrap();
        std::fs::write(dir.path().join("object"), r#"{"name":"General_Password"}"#).unwrap();

        assert!(assertions.assert_json_array(Path::new("array")).success);
        assert!(!assertions.assert_json_array(Path::new("object")).success);
        assert!(!assertions.assert_json_array(Path::new("missing")).success);
    }

    #[test]
    fn test_mount_root_resolves_dot() {
        let (dir, assertions) = tree();
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(assertions.assert_mode(Path::new("."), 0o755).success);
    }
}
