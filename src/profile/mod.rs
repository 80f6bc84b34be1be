pub mod loader;
pub mod model;

pub use loader::ProfileLoader;
pub use model::{
    CombinedDataset, ProfileSample, RawProfile, RawTraitVector, Trait, TraitVector, TRAIT_COUNT,
};
