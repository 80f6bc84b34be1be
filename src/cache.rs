use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const CACHE_DIR: &str = "cache";
const REPORT_SUBDIR: &str = "reports";
const METADATA_FILE: &str = "meta.json";
const REPORT_FILE: &str = "report.json";
const CACHE_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub len: u64,
    pub modified: u64,
}

impl CacheMetadata {
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata =
            fs::metadata(path).with_context(|| format!("read metadata for {:?}", path))?;
        let len = metadata.len();
        let modified = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Ok(Self { len, modified })
    }

    pub fn matches(&self, other: &Self) -> bool {
        self.len == other.len && self.modified == other.modified
    }
}

/// Identity of one cached report: the input files as they were on disk plus the
/// configuration the report was computed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    pub inputs: Vec<(PathBuf, CacheMetadata)>,
    pub config: String,
}

impl CacheKey {
    pub fn new<C: Serialize>(paths: &[PathBuf], config: &C) -> Result<Self> {
        let inputs = paths
            .iter()
            .map(|path| {
                let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
                CacheMetadata::from_path(path).map(|meta| (canonical, meta))
            })
            .collect::<Result<Vec<_>>>()?;
        let config = serde_json::to_string(config).context("serialize config for cache key")?;
        Ok(Self { inputs, config })
    }

    fn matches(&self, other: &Self) -> bool {
        self.config == other.config
            && self.inputs.len() == other.inputs.len()
            && self
                .inputs
                .iter()
                .zip(&other.inputs)
                .all(|((pa, ma), (pb, mb))| pa == pb && ma.matches(mb))
    }

    fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (path, meta) in &self.inputs {
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update(&meta.len.to_le_bytes());
            hasher.update(&meta.modified.to_le_bytes());
        }
        hasher.update(self.config.as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

#[derive(Debug, Clone)]
pub struct ReportCache {
    root: PathBuf,
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new(CACHE_DIR)
    }
}

impl ReportCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn load<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>> {
        let dir = self.entry_dir(key);
        let meta_path = dir.join(METADATA_FILE);
        let report_path = dir.join(REPORT_FILE);
        if !meta_path.exists() || !report_path.exists() {
            info!("Report cache miss at {:?}", dir);
            return Ok(None);
        }

        let meta: CachedMeta = read_json(&meta_path)
            .with_context(|| format!("deserialize report metadata from {:?}", meta_path))?;
        if meta.version != CACHE_VERSION || !meta.key.matches(key) {
            info!("Report cache entry at {:?} is stale", dir);
            return Ok(None);
        }

        let report = read_json(&report_path)
            .with_context(|| format!("read cached report from {:?}", report_path))?;
        info!("Report cache hit at {:?}", dir);
        Ok(Some(report))
    }

    pub fn store<T: Serialize>(&self, key: &CacheKey, report: &T) -> Result<()> {
        let dir = self.entry_dir(key);
        fs::create_dir_all(&dir).with_context(|| format!("create cache directory {:?}", dir))?;
        let meta = CachedMeta {
            version: CACHE_VERSION,
            key: key.clone(),
        };
        write_json(&dir.join(METADATA_FILE), &meta)
            .with_context(|| format!("write report metadata to {:?}", dir))?;
        write_json(&dir.join(REPORT_FILE), report)
            .with_context(|| format!("write cached report to {:?}", dir))?;
        Ok(())
    }

    /// Cached report for `key`, computing and storing it on a miss.
    pub fn get_or_compute<T, F>(&self, key: &CacheKey, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        if let Some(report) = self.load(key)? {
            return Ok(report);
        }
        let report = compute()?;
        self.store(key, &report)?;
        Ok(report)
    }

    pub fn clear(&self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)
                .with_context(|| format!("remove cache directory {:?}", self.root))?;
        }
        Ok(())
    }

    fn entry_dir(&self, key: &CacheKey) -> PathBuf {
        self.root.join(REPORT_SUBDIR).join(key.digest())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedMeta {
    version: u32,
    key: CacheKey,
}

fn read_json<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let file = File::open(path).with_context(|| format!("open cached json file {:?}", path))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("deserialize cached json file {:?}", path))
}

fn write_json<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create cache parent directory {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("create cache json file {:?}", path))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer(writer, value)
        .with_context(|| format!("serialize cache json file {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn input(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).expect("create input");
        file.write_all(body.as_bytes()).expect("write input");
        path
    }

    #[test]
    fn report_round_trips_through_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let inputs = vec![input(dir.path(), "a.db", "aaaa")];
        let cache = ReportCache::new(dir.path().join("cache"));
        let key = CacheKey::new(&inputs, &serde_json::json!({"seed": 1})).expect("key");

        assert_eq!(cache.load::<Vec<f64>>(&key).expect("load"), None);
        cache.store(&key, &vec![1.5, 2.5]).expect("store");
        assert_eq!(
            cache.load::<Vec<f64>>(&key).expect("load"),
            Some(vec![1.5, 2.5])
        );
    }

    #[test]
    fn changed_config_misses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let inputs = vec![input(dir.path(), "a.db", "aaaa")];
        let cache = ReportCache::new(dir.path().join("cache"));
        let first = CacheKey::new(&inputs, &serde_json::json!({"seed": 1})).expect("key");
        let second = CacheKey::new(&inputs, &serde_json::json!({"seed": 2})).expect("key");
        cache.store(&first, &"report").expect("store");
        assert_eq!(cache.load::<String>(&second).expect("load"), None);

        let mut calls = 0;
        let value = cache
            .get_or_compute(&first, || {
                calls += 1;
                Ok("fresh".to_string())
            })
            .expect("cached");
        assert_eq!(value, "report");
        assert_eq!(calls, 0);
    }

    #[test]
    fn resized_input_is_stale() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = input(dir.path(), "a.db", "aaaa");
        let cache = ReportCache::new(dir.path().join("cache"));
        let key = CacheKey::new(&[path.clone()], &0u8).expect("key");
        cache.store(&key, &1u32).expect("store");

        input(dir.path(), "a.db", "aaaaaaaa");
        let fresh = CacheKey::new(&[path], &0u8).expect("key");
        assert_ne!(key, fresh);
        assert_eq!(cache.load::<u32>(&fresh).expect("load"), None);
    }
}
