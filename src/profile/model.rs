use std::fmt;
use std::ops::Index;

use nalgebra::DMatrix;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::stats::Moments;

pub const TRAIT_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl Trait {
    pub const ALL: [Trait; TRAIT_COUNT] = [
        Trait::Openness,
        Trait::Conscientiousness,
        Trait::Extraversion,
        Trait::Agreeableness,
        Trait::Neuroticism,
    ];

    /// Column name used by the personality tables.
    pub fn column(self) -> &'static str {
        match self {
            Trait::Openness => "openness",
            Trait::Conscientiousness => "conscientiousness",
            Trait::Extraversion => "extraversion",
            Trait::Agreeableness => "agreeableness",
            Trait::Neuroticism => "neuroticism",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One scored questionnaire administration, in OCEAN order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTraitVector", into = "RawTraitVector")]
pub struct TraitVector {
    values: [f64; TRAIT_COUNT],
}

impl TraitVector {
    pub fn new(values: [f64; TRAIT_COUNT]) -> Result<Self> {
        for (value, trait_) in values.iter().zip(Trait::ALL) {
            if !value.is_finite() {
                return Err(AnalysisError::NonFiniteTrait(trait_));
            }
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64; TRAIT_COUNT] {
        &self.values
    }

    pub fn get(&self, trait_: Trait) -> f64 {
        self.values[trait_.index()]
    }
}

impl Index<Trait> for TraitVector {
    type Output = f64;

    fn index(&self, index: Trait) -> &Self::Output {
        &self.values[index.index()]
    }
}

impl TryFrom<[f64; TRAIT_COUNT]> for TraitVector {
    type Error = AnalysisError;

    fn try_from(values: [f64; TRAIT_COUNT]) -> Result<Self> {
        Self::new(values)
    }
}

/// Wire form of a trait vector, one named field per trait.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawTraitVector {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

impl TryFrom<RawTraitVector> for TraitVector {
    type Error = AnalysisError;

    fn try_from(raw: RawTraitVector) -> Result<Self> {
        Self::new([
            raw.openness,
            raw.conscientiousness,
            raw.extraversion,
            raw.agreeableness,
            raw.neuroticism,
        ])
    }
}

impl From<TraitVector> for RawTraitVector {
    fn from(vector: TraitVector) -> Self {
        let [openness, conscientiousness, extraversion, agreeableness, neuroticism] =
            vector.values;
        Self {
            openness,
            conscientiousness,
            extraversion,
            agreeableness,
            neuroticism,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawProfile {
    pub name: String,
    pub vectors: Vec<TraitVector>,
}

/// Trait vectors sharing one generation source. Never empty.
#[derive(Debug, Clone)]
pub struct ProfileSample {
    name: String,
    vectors: Vec<TraitVector>,
    moments: OnceCell<Moments>,
}

impl ProfileSample {
    pub fn new(name: impl Into<String>, vectors: Vec<TraitVector>) -> Result<Self> {
        let name = name.into();
        if vectors.is_empty() {
            return Err(AnalysisError::degenerate(format!(
                "profile '{name}' has no trait vectors"
            )));
        }
        Ok(Self {
            name,
            vectors,
            moments: OnceCell::new(),
        })
    }

    /// Build a profile from plain rows, validating every value.
    pub fn from_rows(
        name: impl Into<String>,
        rows: impl IntoIterator<Item = [f64; TRAIT_COUNT]>,
    ) -> Result<Self> {
        let vectors = rows
            .into_iter()
            .map(TraitVector::new)
            .collect::<Result<Vec<_>>>()?;
        Self::new(name, vectors)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vectors(&self) -> &[TraitVector] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Row-major `N x 5` observation matrix.
    pub fn matrix(&self) -> DMatrix<f64> {
        vectors_to_matrix(&self.vectors)
    }

    /// Sample mean and covariance, computed once per profile.
    pub fn moments(&self) -> Result<&Moments> {
        self.moments
            .get_or_try_init(|| Moments::from_matrix(&self.matrix()))
    }

    pub fn column(&self, trait_: Trait) -> Vec<f64> {
        self.vectors.iter().map(|v| v[trait_]).collect()
    }

    pub fn to_raw(&self) -> RawProfile {
        RawProfile {
            name: self.name.clone(),
            vectors: self.vectors.clone(),
        }
    }
}

impl TryFrom<RawProfile> for ProfileSample {
    type Error = AnalysisError;

    fn try_from(raw: RawProfile) -> Result<Self> {
        Self::new(raw.name, raw.vectors)
    }
}

pub(crate) fn vectors_to_matrix(vectors: &[TraitVector]) -> DMatrix<f64> {
    DMatrix::from_fn(vectors.len(), TRAIT_COUNT, |row, col| {
        vectors[row].values[col]
    })
}

/// Several profiles stacked in input order, with a parallel label per row.
#[derive(Debug, Clone)]
pub struct CombinedDataset {
    matrix: DMatrix<f64>,
    labels: Vec<usize>,
    names: Vec<String>,
}

impl CombinedDataset {
    pub fn stack(profiles: &[ProfileSample]) -> Result<Self> {
        if profiles.is_empty() {
            return Err(AnalysisError::degenerate(
                "at least one profile is required to build a combined dataset",
            ));
        }
        let rows: usize = profiles.iter().map(ProfileSample::len).sum();
        let mut matrix = DMatrix::zeros(rows, TRAIT_COUNT);
        let mut labels = Vec::with_capacity(rows);
        let mut offset = 0;
        for (label, profile) in profiles.iter().enumerate() {
            for vector in profile.vectors() {
                for (col, value) in vector.values().iter().enumerate() {
                    matrix[(offset, col)] = *value;
                }
                labels.push(label);
                offset += 1;
            }
        }
        Ok(Self {
            matrix,
            labels,
            names: profiles.iter().map(|p| p.name().to_string()).collect(),
        })
    }

    /// Same rows and labels with every column standardized.
    pub fn standardized(&self) -> Result<Self> {
        Ok(Self {
            matrix: crate::stats::standardize(&self.matrix)?,
            labels: self.labels.clone(),
            names: self.names.clone(),
        })
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn row_count(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn profile_count(&self) -> usize {
        self.names.len()
    }
}
