//! In-memory mock filesystem for testing collectors without real sysfs.
//!
//! `MockFs` simulates the laptop's `/sys` and `/proc` trees in memory.
//! Clones share the underlying tree, so a test can keep one handle and
//! mutate sensor values between ticks while the sampler reads through
//! another.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct MockFsInner {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
}

/// In-memory filesystem for testing.
///
/// Stores files and directories in memory, allowing tests to simulate
/// various hardware states (missing attributes, changing charge counters)
/// without access to an actual laptop.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    inner: Arc<RwLock<MockFsInner>>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content, replacing any previous content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        let mut inner = self.inner.write().unwrap();

        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                inner.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }

        inner.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut inner = self.inner.write().unwrap();
        inner.directories.insert(path.clone());

        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                inner.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    /// Removes a file, simulating an attribute that disappears mid-session.
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let mut inner = self.inner.write().unwrap();
        inner.files.remove(path.as_ref());
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let inner = self.inner.read().unwrap();
        inner
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{:?}", path)))
    }

    fn exists(&self, path: &Path) -> bool {
        let inner = self.inner.read().unwrap();
        inner.files.contains_key(path) || inner.directories.contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let inner = self.inner.read().unwrap();
        if !inner.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{:?}", path),
            ));
        }

        let mut entries: Vec<PathBuf> = Vec::new();
        for candidate in inner.files.keys().chain(inner.directories.iter()) {
            if candidate.parent() == Some(path) {
                entries.push(candidate.clone());
            }
        }
        entries.sort();
        entries.dedup();
        Ok(entries)
    }
}
