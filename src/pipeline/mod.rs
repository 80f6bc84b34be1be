pub mod comparison;
pub mod config;
pub mod consistency;
pub mod convergence;
pub mod identifiability;

pub use comparison::{baseline_divergence, compare_profiles, BaselineDivergence, ComparisonReport};
pub use config::AnalysisConfig;
pub use consistency::{consistency_report, ConsistencyReport, ReportDetail};
pub use convergence::{ConvergenceAnalysis, ConvergenceEntry};
pub use identifiability::{IdentifiabilitySummary, IdentifiabilityWorkflow};
