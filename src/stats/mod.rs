pub mod moments;
pub mod sample;
pub mod scaler;
pub mod special;
pub mod ttest;

pub use moments::{column_means, Moments};
pub use sample::{
    percentile, remove_outliers_iqr, shape_metrics, DistanceSample, DistanceSummary, Histogram,
    ShapeMetrics,
};
pub use scaler::{standardize, StandardScaler};
pub use special::{chi_squared_quantile, student_t_two_sided_p};
pub use ttest::{student_t_test, trait_t_tests, TTest, TraitTest};
