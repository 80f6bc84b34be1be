use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::profile::model::{ProfileSample, RawProfile};

/// Turns JSON profile documents into in-memory samples and back.
#[derive(Debug, Default)]
pub struct ProfileLoader;

impl ProfileLoader {
    /// Parse a JSON string into a profile sample.
    pub fn from_json_str(json: &str) -> Result<ProfileSample> {
        let raw: RawProfile = serde_json::from_str(json).context("parse profile json")?;
        Self::from_raw(raw)
    }

    /// Read JSON profile data from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<ProfileSample> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        Self::from_json_str(&buf)
    }

    pub fn from_path(path: &Path) -> Result<ProfileSample> {
        let file = File::open(path).with_context(|| format!("open profile file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("load profile from {:?}", path))
    }

    pub fn to_json_string(profile: &ProfileSample) -> Result<String> {
        Ok(serde_json::to_string_pretty(&profile.to_raw())?)
    }

    pub fn write_to_path(profile: &ProfileSample, path: &Path) -> Result<()> {
        let json = Self::to_json_string(profile)?;
        let mut file =
            File::create(path).with_context(|| format!("create profile file {:?}", path))?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    fn from_raw(raw: RawProfile) -> Result<ProfileSample> {
        let name = raw.name.clone();
        ProfileSample::try_from(raw).with_context(|| format!("validate profile '{name}'"))
    }
}
