// Host file store
// Paths are '/'-separated strings relative to the store root

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;

/// Storage the persistence layer reads and writes through
pub trait FileStore {
    /// Read a whole text file. `None` if it does not exist or cannot be read.
    fn read_file(&self, path: &str) -> Option<String>;

    /// Create or replace a text file
    fn write_file(&mut self, path: &str, text: &str) -> io::Result<()>;

    /// Create a folder and its parents (no-op if it exists)
    fn create_folder(&mut self, path: &str) -> io::Result<()>;
}

impl<S: FileStore + ?Sized> FileStore for &mut S {
    fn read_file(&self, path: &str) -> Option<String> {
        (**self).read_file(path)
    }

    fn write_file(&mut self, path: &str, text: &str) -> io::Result<()> {
        (**self).write_file(path, text)
    }

    fn create_folder(&mut self, path: &str) -> io::Result<()> {
        (**self).create_folder(path)
    }
}

/// Join a folder and a relative path
pub fn join_path(folder: &str, path: &str) -> String {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", folder, path)
    }
}

/// Store backed by the real filesystem, rooted at a directory
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl FileStore for FsStore {
    fn read_file(&self, path: &str) -> Option<String> {
        std::fs::read_to_string(self.resolve(path)).ok()
    }

    fn write_file(&mut self, path: &str, text: &str) -> io::Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full, text)
    }

    fn create_folder(&mut self, path: &str) -> io::Result<()> {
        std::fs::create_dir_all(self.resolve(path))
    }
}

/// In-memory store for tests and demos
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: BTreeMap<String, String>,
    folders: BTreeSet<String>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (simulates a read-only disk)
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn insert(&mut self, path: &str, text: &str) {
        self.files.insert(path.to_string(), text.to_string());
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.files.remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn has_folder(&self, path: &str) -> bool {
        self.folders.contains(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl FileStore for MemoryStore {
    fn read_file(&self, path: &str) -> Option<String> {
        self.files.get(path).cloned()
    }

    fn write_file(&mut self, path: &str, text: &str) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("write to {} refused", path),
            ));
        }
        self.files.insert(path.to_string(), text.to_string());
        Ok(())
    }

    fn create_folder(&mut self, path: &str) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("mkdir {} refused", path),
            ));
        }
        self.folders.insert(path.to_string());
        Ok(())
    }
}
