use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use rusqlite::{Connection, OpenFlags};

use crate::profile::{ProfileSample, Trait, TraitVector, TRAIT_COUNT};
use crate::store::VectorStore;

const PERSONALITY_QUERY: &str = "SELECT openness, conscientiousness, extraversion, agreeableness, \
                                 neuroticism FROM personality";

/// Reads the `personality` table of per-source SQLite files under a root directory.
#[derive(Debug, Clone)]
pub struct SqliteVectorStore {
    root: PathBuf,
}

impl SqliteVectorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Load one database file. The profile is named after the file stem.
    pub fn load_path(path: &Path) -> Result<ProfileSample> {
        if !path.is_file() {
            anyhow::bail!("SQLite database {:?} does not exist", path);
        }
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("open SQLite database {:?}", path))?;
        let mut stmt = conn
            .prepare(PERSONALITY_QUERY)
            .with_context(|| format!("query personality table in {:?}", path))?;
        let rows = stmt
            .query_map([], |row| {
                let mut values = [None; TRAIT_COUNT];
                for (idx, slot) in values.iter_mut().enumerate() {
                    *slot = row.get::<_, Option<f64>>(idx)?;
                }
                Ok(values)
            })
            .with_context(|| format!("read personality rows from {:?}", path))?;

        let mut vectors = Vec::new();
        let mut skipped = 0usize;
        for row in rows {
            let values = row.with_context(|| format!("decode personality row in {:?}", path))?;
            let Some(complete) = complete_row(values) else {
                skipped += 1;
                continue;
            };
            let vector = TraitVector::new(complete)
                .with_context(|| format!("validate personality row in {:?}", path))?;
            vectors.push(vector);
        }
        if skipped > 0 {
            warn!(
                "Profile {}: skipped {} rows with missing traits",
                name, skipped
            );
        }
        if vectors.is_empty() {
            anyhow::bail!("no complete personality rows in {:?}", path);
        }
        debug!("Profile {}: loaded {} vectors from {:?}", name, vectors.len(), path);
        Ok(ProfileSample::new(name, vectors)?)
    }
}

fn complete_row(values: [Option<f64>; TRAIT_COUNT]) -> Option<[f64; TRAIT_COUNT]> {
    let mut out = [0.0; TRAIT_COUNT];
    for (slot, trait_) in out.iter_mut().zip(Trait::ALL) {
        *slot = values[trait_.index()]?;
    }
    Some(out)
}

impl VectorStore for SqliteVectorStore {
    fn load(&self, source: &str) -> Result<ProfileSample> {
        Self::load_path(&self.root.join(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_rows_are_dropped() {
        assert_eq!(
            complete_row([Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]),
            Some([1.0, 2.0, 3.0, 4.0, 5.0])
        );
        assert_eq!(
            complete_row([Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)]),
            None
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let err = SqliteVectorStore::new("/nonexistent-root")
            .load("absent.db")
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
