//! Ephemeral workspace for a single run
//!
//! The workspace holds the mount point and any staged description files. It
//! is created before the first supervised process starts and destroyed only
//! after every process tied to it has been signalled, so the orchestrator
//! owns it for the whole run and hands out paths, never the directory itself.

use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::{TesterError, TesterResult};
use shared::{Component, component_debug, component_info};

/// Name of the mount-point subdirectory
pub const MOUNT_DIR: &str = "mnt";

#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    root: PathBuf,
    mount_point: PathBuf,
    created_at: DateTime<Utc>,
}

impl Workspace {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_destroyed(&self) -> bool {
        self.dir.is_none()
    }
}

pub struct WorkspaceManager {
    prefix: String,
    base: Option<PathBuf>,
}

impl WorkspaceManager {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
            base: None,
        }
    }

    /// Create workspaces under `base` instead of the system temp dir
    pub fn in_dir<P: Into<PathBuf>>(mut self, base: Option<P>) -> Self {
        self.base = base.map(Into::into);
        self
    }

    /// Allocate a uniquely named workspace with an empty mount point
    pub fn create(&self) -> TesterResult<Workspace> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.prefix);

        let base = self.base.clone().unwrap_or_else(std::env::temp_dir);
        let dir = builder
            .tempdir_in(&base)
            .map_err(|source| TesterError::resource("create", &base, source))?;

        let root = dir.path().to_path_buf();
        let mount_point = root.join(MOUNT_DIR);
        std::fs::create_dir(&mount_point)
            .map_err(|source| TesterError::resource("create mount point", &mount_point, source))?;

        component_info!(Component::Tester, "📁 Running tests in temporary directory {}", root.display());

        Ok(Workspace {
            dir: Some(dir),
            root,
            mount_point,
            created_at: Utc::now(),
        })
    }

    /// Copy a file into the workspace root, returning the staged path
    pub fn stage(&self, workspace: &Workspace, source: &Path) -> TesterResult<PathBuf> {
        if workspace.is_destroyed() {
            return Err(TesterError::resource(
                "stage",
                workspace.root(),
                std::io::Error::from(ErrorKind::NotFound),
            ));
        }
        let file_name = source.file_name().ok_or_else(|| {
            TesterError::config("stage", format!("{} has no file name", source.display()))
        })?;

        let target = workspace.root().join(file_name);
        std::fs::copy(source, &target).map_err(|e| TesterError::resource("stage", source, e))?;
        component_debug!(Component::Tester, "📄 Staged {} into workspace", source.display());
        Ok(target)
    }

    /// Recursively remove the workspace.
    ///
    /// Returns `Ok(true)` when this call removed it and `Ok(false)` when it
    /// had already been destroyed. A tree that vanished underneath us counts
    /// as removed.
    pub fn destroy(&self, workspace: &mut Workspace) -> TesterResult<bool> {
        let Some(dir) = workspace.dir.take() else {
            component_debug!(Component::Tester, "Workspace {} already destroyed", workspace.root.display());
            return Ok(false);
        };

        match dir.close() {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(TesterError::resource("destroy", &workspace.root, source)),
        }

        component_info!(Component::Tester, "🧹 Removed workspace {}", workspace.root.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_create_allocates_unique_tree_with_mount_point() {
        let manager = WorkspaceManager::new("kwfs-ws-test");
        let mut first = manager.create().unwrap();
        let mut second = manager.create().unwrap();

        assert_ne!(first.root(), second.root());
        assert!(first.mount_point().is_dir());
        assert!(first.root().file_name().unwrap().to_string_lossy().starts_with("kwfs-ws-test"));

        manager.destroy(&mut first).unwrap();
        manager.destroy(&mut second).unwrap();
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let manager = WorkspaceManager::new("kwfs-ws-test");
        let mut workspace = manager.create().unwrap();
        let root = workspace.root().to_path_buf();

        assert!(manager.destroy(&mut workspace).unwrap());
        assert!(!root.exists());
        assert!(!manager.destroy(&mut workspace).unwrap());
        assert!(workspace.is_destroyed());
    }

    #[test]
    fn test_destroy_tolerates_externally_removed_tree() {
        let manager = WorkspaceManager::new("kwfs-ws-test");
        let mut workspace = manager.create().unwrap();
        std::fs::remove_dir_all(workspace.root()).unwrap();

        assert!(manager.destroy(&mut workspace).unwrap());
    }

    #[test]
    fn test_unwritable_base_is_resource_error() {
        let not_a_dir = tempfile::NamedTempFile::new().unwrap();
        let manager = WorkspaceManager::new("kwfs-ws-test").in_dir(Some(not_a_dir.path()));

        assert_matches!(manager.create(), Err(TesterError::Resource { .. }));
    }

    #[test]
    fn test_stage_copies_into_root() {
        let manager = WorkspaceManager::new("kwfs-ws-test");
        let mut workspace = manager.create().unwrap();

        let source_dir = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("expected_tree.json");
        std::fs::write(&source, "{}").unwrap();

        let staged = manager.stage(&workspace, &source).unwrap();
        assert_eq!(staged, workspace.root().join("expected_tree.json"));
        assert_eq!(std::fs::read_to_string(&staged).unwrap(), "{}");

        manager.destroy(&mut workspace).unwrap();
        assert_matches!(manager.stage(&workspace, &source), Err(TesterError::Resource { .. }));
    }
}
