pub mod pca;
pub mod tsne;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use pca::{pca_1d, pca_2d, Pca};
pub use tsne::{tsne_2d, TsneConfig, TsneInit};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection2D {
    pub points: Vec<[f64; 2]>,
    /// Variance fraction per axis; PCA only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub explained_variance: Option<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection1D {
    pub points: Vec<f64>,
    pub explained_variance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMethod {
    #[default]
    Pca,
    Tsne,
}

pub fn project_2d(
    matrix: &DMatrix<f64>,
    method: ProjectionMethod,
    tsne: &TsneConfig,
    seed: u64,
) -> Result<Projection2D> {
    match method {
        ProjectionMethod::Pca => pca_2d(matrix),
        ProjectionMethod::Tsne => tsne_2d(matrix, tsne, seed),
    }
}
