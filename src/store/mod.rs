pub mod sqlite;

use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::profile::{ProfileLoader, ProfileSample};

pub use sqlite::SqliteVectorStore;

/// Source of named trait-vector tables.
pub trait VectorStore {
    fn load(&self, source: &str) -> Result<ProfileSample>;
}

/// JSON profile documents under a root directory.
#[derive(Debug, Clone)]
pub struct JsonVectorStore {
    root: PathBuf,
}

impl JsonVectorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl VectorStore for JsonVectorStore {
    fn load(&self, source: &str) -> Result<ProfileSample> {
        let path = self.root.join(source);
        ProfileLoader::from_path(&path).with_context(|| format!("load profile {source}"))
    }
}

const PROFILE_EXTENSION: &str = "db";

/// Every `.db` file of a directory, loaded in file-name order.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn paths(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("list profile directory {:?}", self.root))?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(OsStr::to_str)
                        .map(|ext| ext.eq_ignore_ascii_case(PROFILE_EXTENSION))
                        .unwrap_or(false)
            })
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Multi-profile analyses need at least two sources.
    pub fn load_profiles(&self) -> Result<Vec<ProfileSample>> {
        let paths = self.paths()?;
        if paths.len() < 2 {
            anyhow::bail!(
                "need at least two .db files under {:?}, found {}",
                self.root,
                paths.len()
            );
        }
        paths
            .iter()
            .map(|path| SqliteVectorStore::load_path(path))
            .collect()
    }
}
