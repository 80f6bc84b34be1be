//! Chi-squared and Student-t tails backed by `statrs`.

use statrs::distribution::{ChiSquared, ContinuousCDF, StudentsT};

use crate::error::{AnalysisError, Result};

/// Critical value of the chi-squared distribution at `probability`.
pub fn chi_squared_quantile(probability: f64, degrees_of_freedom: f64) -> Result<f64> {
    if !(probability > 0.0 && probability < 1.0) {
        return Err(AnalysisError::invalid(format!(
            "chi-squared quantile needs a probability in (0, 1), got {probability}"
        )));
    }
    let distribution = ChiSquared::new(degrees_of_freedom).map_err(|err| {
        AnalysisError::invalid(format!(
            "chi-squared degrees of freedom {degrees_of_freedom}: {err}"
        ))
    })?;
    Ok(distribution.inverse_cdf(probability))
}

/// Two-sided p-value of a Student-t statistic.
pub fn student_t_two_sided_p(t: f64, degrees_of_freedom: f64) -> Result<f64> {
    let distribution = StudentsT::new(0.0, 1.0, degrees_of_freedom).map_err(|err| {
        AnalysisError::invalid(format!(
            "Student-t degrees of freedom {degrees_of_freedom}: {err}"
        ))
    })?;
    Ok((2.0 * distribution.sf(t.abs())).clamp(0.0, 1.0))
}
