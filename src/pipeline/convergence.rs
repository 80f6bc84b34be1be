use std::collections::HashSet;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::mahalanobis::ReferenceFrame;
use crate::pipeline::config::AnalysisConfig;
use crate::profile::ProfileSample;
use crate::stats::DistanceSummary;

/// Spread of one profile around the mean of all profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceEntry {
    pub raw_count: usize,
    pub retained: usize,
    pub cv: f64,
    pub kurtosis: f64,
    pub summary: Option<DistanceSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceAnalysis {
    pub reference_rows: usize,
    pub profiles: IndexMap<String, ConvergenceEntry>,
}

impl ConvergenceAnalysis {
    pub fn run(profiles: &[ProfileSample], config: &AnalysisConfig) -> Result<Self> {
        let mut seen = HashSet::new();
        for profile in profiles {
            if !seen.insert(profile.name()) {
                anyhow::bail!("duplicate profile name {}", profile.name());
            }
        }

        let frame = ReferenceFrame::fit(profiles, &config.reference_regularization)
            .context("fit global reference frame")?;
        debug!("Reference frame fitted over {} rows", frame.rows());

        let entries: Vec<(String, ConvergenceEntry)> = profiles
            .par_iter()
            .map(|profile| {
                let distances = frame.distances(profile);
                let cleaned = distances.remove_outliers_iqr();
                let shape = cleaned.shape_metrics();
                let entry = ConvergenceEntry {
                    raw_count: distances.len(),
                    retained: cleaned.len(),
                    cv: shape.cv,
                    kurtosis: shape.kurtosis,
                    summary: cleaned.summary(),
                };
                (profile.name().to_string(), entry)
            })
            .collect();

        for (name, entry) in &entries {
            info!(
                "Profile {}: reference cv {:.4}, kurtosis {:.4} ({} of {} kept)",
                name, entry.cv, entry.kurtosis, entry.retained, entry.raw_count
            );
        }

        Ok(Self {
            reference_rows: frame.rows(),
            profiles: entries.into_iter().collect(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&ConvergenceEntry> {
        self.profiles.get(name)
    }
}
