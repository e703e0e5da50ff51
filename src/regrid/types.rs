//! Regridding data types

use crate::error::RegridError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Reduction method applied when transferring data source-to-target
///
/// `Sum` and `Mean` are linear combinations of the contributing source
/// values; `Maximum`, `Minimum`, and `Mode` are selection rules that pick
/// one contributing value per target instead of blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegridMethod {
    /// Weight = raw intersection measure, unnormalized (conservative,
    /// total-preserving)
    Sum,

    /// Area-weighted average: weights normalized to sum to 1 per target
    #[serde(alias = "area_weighted_average")]
    Mean,

    /// Largest contributing source value
    Maximum,

    /// Smallest contributing source value
    Minimum,

    /// Contributing value with the greatest accumulated overlap measure
    Mode,
}

impl FromStr for RegridMethod {
    type Err = RegridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "mean" | "area_weighted_average" => Ok(Self::Mean),
            "maximum" | "max" => Ok(Self::Maximum),
            "minimum" | "min" => Ok(Self::Minimum),
            "mode" => Ok(Self::Mode),
            other => Err(RegridError::Config(format!(
                "unknown regrid method '{}'",
                other
            ))),
        }
    }
}

/// Policy for missing (NaN) source values during application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Exclude missing contributions; linear methods renormalize over the
    /// remaining weights
    #[default]
    Skip,

    /// Any missing contribution makes the target result missing
    Propagate,
}

impl FromStr for MissingValuePolicy {
    type Err = RegridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "propagate" => Ok(Self::Propagate),
            other => Err(RegridError::Config(format!(
                "unknown missing-value policy '{}'",
                other
            ))),
        }
    }
}

/// Sparse source-to-target transfer operator
///
/// Compressed row storage keyed by target cell: the entries of target `t`
/// live in `source_ids[target_ptr[t]..target_ptr[t + 1]]` and
/// `weights[..]`, sorted by source id. For `Mean` the weights of each row
/// are normalized to sum to 1 at construction; all other methods keep the
/// raw overlay measures.
#[derive(Debug, Clone)]
pub struct RegridOperator {
    pub(crate) method: RegridMethod,
    pub(crate) n_source: usize,
    pub(crate) n_target: usize,
    pub(crate) target_ptr: Vec<usize>,
    pub(crate) source_ids: Vec<usize>,
    pub(crate) weights: Vec<f64>,
}

impl RegridOperator {
    /// Reduction method this operator was built for
    pub fn method(&self) -> RegridMethod {
        self.method
    }

    /// Expected source cell count
    pub fn n_source(&self) -> usize {
        self.n_source
    }

    /// Target cell count
    pub fn n_target(&self) -> usize {
        self.n_target
    }

    /// Number of stored entries
    pub fn num_entries(&self) -> usize {
        self.source_ids.len()
    }

    /// Contributing source ids and weights for target `t`
    pub fn row(&self, t: usize) -> (&[usize], &[f64]) {
        let range = self.target_ptr[t]..self.target_ptr[t + 1];
        (&self.source_ids[range.clone()], &self.weights[range])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("sum".parse::<RegridMethod>().unwrap(), RegridMethod::Sum);
        assert_eq!("Mean".parse::<RegridMethod>().unwrap(), RegridMethod::Mean);
        assert_eq!(
            "area_weighted_average".parse::<RegridMethod>().unwrap(),
            RegridMethod::Mean
        );
        assert_eq!(
            "max".parse::<RegridMethod>().unwrap(),
            RegridMethod::Maximum
        );
        assert!("median".parse::<RegridMethod>().is_err());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "skip".parse::<MissingValuePolicy>().unwrap(),
            MissingValuePolicy::Skip
        );
        assert_eq!(
            "propagate".parse::<MissingValuePolicy>().unwrap(),
            MissingValuePolicy::Propagate
        );
        assert!("drop".parse::<MissingValuePolicy>().is_err());
    }

    #[test]
    fn test_method_serde_roundtrip() {
        let json = serde_json::to_string(&RegridMethod::Mean).unwrap();
        assert_eq!(json, "\"mean\"");
        let back: RegridMethod = serde_json::from_str("\"area_weighted_average\"").unwrap();
        assert_eq!(back, RegridMethod::Mean);
    }
}
