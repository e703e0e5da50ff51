//! Regrid operator construction and application

use crate::config::RegridConfig;
use crate::error::{RegridError, Result};
use crate::mesh::types::Grid;
use crate::overlay::engine::compute_overlay;
use crate::overlay::types::OverlayEntry;
use crate::regrid::types::{MissingValuePolicy, RegridMethod, RegridOperator};
use crate::spatial::index::SpatialIndex;

impl RegridOperator {
    /// Build the sparse transfer operator from overlay entries
    ///
    /// Entries are grouped per target cell and sorted by source id;
    /// duplicate (source, target) pairs are summed into one slot. For
    /// [`RegridMethod::Mean`] each row's weights are normalized to sum to 1;
    /// other methods keep the raw overlay measures.
    pub fn from_entries(
        entries: &[OverlayEntry],
        n_source: usize,
        n_target: usize,
        method: RegridMethod,
    ) -> Result<Self> {
        for entry in entries {
            if entry.source >= n_source || entry.target >= n_target {
                return Err(RegridError::InvalidTopology(format!(
                    "overlay entry ({}, {}) out of range for {} source and {} \
                     target cells",
                    entry.source, entry.target, n_source, n_target
                )));
            }
        }

        let mut sorted: Vec<OverlayEntry> = entries.to_vec();
        sorted.sort_by(|a, b| (a.target, a.source).cmp(&(b.target, b.source)));

        let mut target_ptr = Vec::with_capacity(n_target + 1);
        let mut source_ids = Vec::with_capacity(sorted.len());
        let mut weights = Vec::with_capacity(sorted.len());

        target_ptr.push(0);
        let mut row = 0usize;
        for entry in &sorted {
            while row < entry.target {
                target_ptr.push(source_ids.len());
                row += 1;
            }
            if source_ids.len() > *target_ptr.last().unwrap()
                && *source_ids.last().unwrap() == entry.source
            {
                // merge duplicate (source, target) pair
                *weights.last_mut().unwrap() += entry.measure;
            } else {
                source_ids.push(entry.source);
                weights.push(entry.measure);
            }
        }
        while row < n_target {
            target_ptr.push(source_ids.len());
            row += 1;
        }

        if method == RegridMethod::Mean {
            for t in 0..n_target {
                let range = target_ptr[t]..target_ptr[t + 1];
                let total: f64 = weights[range.clone()].iter().sum();
                if total > 0.0 {
                    for w in &mut weights[range] {
                        *w /= total;
                    }
                }
            }
        }

        log::debug!(
            "built {:?} operator: {} targets, {} entries",
            method,
            n_target,
            source_ids.len()
        );

        Ok(Self {
            method,
            n_source,
            n_target,
            target_ptr,
            source_ids,
            weights,
        })
    }

    /// Apply the operator to a data array
    ///
    /// The trailing dimension of `data` is the source cell dimension; any
    /// leading dimensions are broadcast in order, so the input length must
    /// be a multiple of the source cell count and the output length is the
    /// same multiple of the target cell count. A target cell with no
    /// contributing sources yields NaN under either policy, never an error.
    pub fn apply(&self, data: &[f64], policy: MissingValuePolicy) -> Result<Vec<f64>> {
        if self.n_source == 0 {
            if data.is_empty() {
                return Ok(vec![f64::NAN; self.n_target]);
            }
            return Err(RegridError::DimensionMismatch {
                expected: 0,
                found: data.len(),
            });
        }
        if data.is_empty() || data.len() % self.n_source != 0 {
            return Err(RegridError::DimensionMismatch {
                expected: self.n_source,
                found: data.len(),
            });
        }

        let blocks = data.len() / self.n_source;
        let mut out = Vec::with_capacity(blocks * self.n_target);
        for block in data.chunks_exact(self.n_source) {
            for t in 0..self.n_target {
                out.push(self.reduce_target(t, block, policy));
            }
        }
        Ok(out)
    }

    /// Reduce the contributions of one target cell for one data block
    fn reduce_target(&self, t: usize, values: &[f64], policy: MissingValuePolicy) -> f64 {
        let (sources, weights) = self.row(t);
        if sources.is_empty() {
            return f64::NAN;
        }

        let mut contributions: Vec<(f64, f64)> = Vec::with_capacity(sources.len());
        for (&s, &w) in sources.iter().zip(weights.iter()) {
            let v = values[s];
            if v.is_nan() {
                match policy {
                    MissingValuePolicy::Propagate => return f64::NAN,
                    MissingValuePolicy::Skip => continue,
                }
            }
            contributions.push((v, w));
        }
        if contributions.is_empty() {
            return f64::NAN;
        }

        match self.method {
            RegridMethod::Sum => contributions.iter().map(|(v, w)| v * w).sum(),
            RegridMethod::Mean => {
                let weighted: f64 = contributions.iter().map(|(v, w)| v * w).sum();
                let total: f64 = contributions.iter().map(|(_, w)| w).sum();
                weighted / total
            }
            RegridMethod::Maximum => contributions
                .iter()
                .map(|&(v, _)| v)
                .fold(f64::NEG_INFINITY, f64::max),
            RegridMethod::Minimum => contributions
                .iter()
                .map(|&(v, _)| v)
                .fold(f64::INFINITY, f64::min),
            RegridMethod::Mode => mode_value(&mut contributions),
        }
    }
}

/// The value with the greatest accumulated weight
///
/// Equal values merge their weights first; on a weight tie the smallest
/// value wins, so the result is deterministic.
fn mode_value(contributions: &mut [(f64, f64)]) -> f64 {
    contributions.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let mut best_value = contributions[0].0;
    let mut best_weight = 0.0;
    let mut run_value = contributions[0].0;
    let mut run_weight = 0.0;
    for &(v, w) in contributions.iter() {
        if v == run_value {
            run_weight += w;
        } else {
            if run_weight > best_weight {
                best_weight = run_weight;
                best_value = run_value;
            }
            run_value = v;
            run_weight = w;
        }
    }
    if run_weight > best_weight {
        best_value = run_value;
    }
    best_value
}

/// One-stop regridding facade
///
/// Owns the overlay entries and the operator built from two grids; the
/// grids themselves are only borrowed during construction. `apply` may be
/// called repeatedly with different data over the same geometry.
#[derive(Debug, Clone)]
pub struct Regridder {
    config: RegridConfig,
    entries: Vec<OverlayEntry>,
    operator: RegridOperator,
}

impl Regridder {
    /// Build a regridder from a source grid, a target grid, and a config
    ///
    /// Builds the source spatial index, computes the overlay, and assembles
    /// the transfer operator. Fails eagerly on unsupported topology
    /// combinations; geometry work happens only after validation.
    pub fn new(source: &Grid, target: &Grid, config: RegridConfig) -> Result<Self> {
        log::info!(
            "building {:?} regridder: {} source cells -> {} target cells",
            config.method,
            source.cell_count(),
            target.cell_count()
        );
        let source_index = SpatialIndex::build(source);
        let entries = compute_overlay(source, &source_index, target)?;
        let operator = RegridOperator::from_entries(
            &entries,
            source.cell_count(),
            target.cell_count(),
            config.method,
        )?;
        Ok(Self {
            config,
            entries,
            operator,
        })
    }

    /// Transfer a data array from the source grid to the target grid
    pub fn regrid(&self, data: &[f64]) -> Result<Vec<f64>> {
        self.operator.apply(data, self.config.missing)
    }

    /// Raw overlay entries, for inspection and validation
    pub fn entries(&self) -> &[OverlayEntry] {
        &self.entries
    }

    /// The underlying sparse operator
    pub fn operator(&self) -> &RegridOperator {
        &self.operator
    }

    /// The configuration this regridder was built with
    pub fn config(&self) -> &RegridConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two sources covering one target half-and-half, plus an empty target
    fn half_half_entries() -> Vec<OverlayEntry> {
        vec![
            OverlayEntry::new(0, 0, 0.5),
            OverlayEntry::new(1, 0, 0.5),
        ]
    }

    #[test]
    fn test_operator_csr_layout() {
        let entries = vec![
            OverlayEntry::new(1, 2, 0.25),
            OverlayEntry::new(0, 0, 1.0),
            OverlayEntry::new(2, 2, 0.75),
        ];
        let op = RegridOperator::from_entries(&entries, 3, 3, RegridMethod::Sum).unwrap();

        assert_eq!(op.n_target(), 3);
        assert_eq!(op.num_entries(), 3);
        assert_eq!(op.row(0), (&[0usize][..], &[1.0][..]));
        assert_eq!(op.row(1).0.len(), 0);
        assert_eq!(op.row(2), (&[1usize, 2][..], &[0.25, 0.75][..]));
    }

    #[test]
    fn test_operator_merges_duplicate_pairs() {
        let entries = vec![
            OverlayEntry::new(0, 0, 0.25),
            OverlayEntry::new(0, 0, 0.25),
        ];
        let op = RegridOperator::from_entries(&entries, 1, 1, RegridMethod::Sum).unwrap();
        assert_eq!(op.num_entries(), 1);
        assert_relative_eq!(op.row(0).1[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_operator_rejects_out_of_range_entries() {
        let entries = vec![OverlayEntry::new(5, 0, 1.0)];
        let err = RegridOperator::from_entries(&entries, 2, 1, RegridMethod::Sum).unwrap_err();
        assert!(matches!(err, RegridError::InvalidTopology(_)));
    }

    #[test]
    fn test_mean_weights_normalized() {
        let entries = vec![
            OverlayEntry::new(0, 0, 0.2),
            OverlayEntry::new(1, 0, 0.6),
        ];
        let op = RegridOperator::from_entries(&entries, 2, 1, RegridMethod::Mean).unwrap();
        let (_, weights) = op.row(0);
        assert_relative_eq!(weights[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(weights[1], 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_apply_mean_and_sum() {
        let entries = half_half_entries();

        let mean = RegridOperator::from_entries(&entries, 2, 1, RegridMethod::Mean).unwrap();
        let result = mean.apply(&[10.0, 20.0], MissingValuePolicy::Skip).unwrap();
        assert_relative_eq!(result[0], 15.0, epsilon = 1e-12);

        let sum = RegridOperator::from_entries(&entries, 2, 1, RegridMethod::Sum).unwrap();
        let result = sum.apply(&[10.0, 20.0], MissingValuePolicy::Skip).unwrap();
        assert_relative_eq!(result[0], 15.0, epsilon = 1e-12);
    }

    #[test]
    fn test_apply_selection_methods() {
        let entries = half_half_entries();
        let data = [10.0, 20.0];

        let max = RegridOperator::from_entries(&entries, 2, 1, RegridMethod::Maximum).unwrap();
        assert_eq!(max.apply(&data, MissingValuePolicy::Skip).unwrap()[0], 20.0);

        let min = RegridOperator::from_entries(&entries, 2, 1, RegridMethod::Minimum).unwrap();
        assert_eq!(min.apply(&data, MissingValuePolicy::Skip).unwrap()[0], 10.0);
    }

    #[test]
    fn test_apply_mode() {
        let entries = vec![
            OverlayEntry::new(0, 0, 0.2),
            OverlayEntry::new(1, 0, 0.5),
            OverlayEntry::new(2, 0, 0.3),
        ];
        let op = RegridOperator::from_entries(&entries, 3, 1, RegridMethod::Mode).unwrap();

        // Sources 0 and 2 carry the same category; their weights pool
        let result = op.apply(&[7.0, 3.0, 7.0], MissingValuePolicy::Skip).unwrap();
        assert_eq!(result[0], 7.0);

        // Exact weight tie: the smaller value wins
        let entries = vec![
            OverlayEntry::new(0, 0, 0.5),
            OverlayEntry::new(1, 0, 0.5),
        ];
        let op = RegridOperator::from_entries(&entries, 2, 1, RegridMethod::Mode).unwrap();
        let result = op.apply(&[9.0, 4.0], MissingValuePolicy::Skip).unwrap();
        assert_eq!(result[0], 4.0);
    }

    #[test]
    fn test_missing_value_policies() {
        let entries = half_half_entries();
        let data = [10.0, f64::NAN];

        let mean = RegridOperator::from_entries(&entries, 2, 1, RegridMethod::Mean).unwrap();

        // Skip renormalizes over the remaining weight
        let result = mean.apply(&data, MissingValuePolicy::Skip).unwrap();
        assert_relative_eq!(result[0], 10.0, epsilon = 1e-12);

        // Propagate poisons the target
        let result = mean.apply(&data, MissingValuePolicy::Propagate).unwrap();
        assert!(result[0].is_nan());

        // All contributions missing: NaN even under Skip
        let result = mean
            .apply(&[f64::NAN, f64::NAN], MissingValuePolicy::Skip)
            .unwrap();
        assert!(result[0].is_nan());
    }

    #[test]
    fn test_empty_target_yields_nan() {
        let entries = vec![OverlayEntry::new(0, 0, 1.0)];
        let op = RegridOperator::from_entries(&entries, 1, 2, RegridMethod::Mean).unwrap();

        let result = op.apply(&[5.0], MissingValuePolicy::Skip).unwrap();
        assert_eq!(result[0], 5.0);
        assert!(result[1].is_nan());

        let result = op.apply(&[5.0], MissingValuePolicy::Propagate).unwrap();
        assert!(result[1].is_nan());
    }

    #[test]
    fn test_apply_broadcasts_leading_dimensions() {
        let entries = half_half_entries();
        let op = RegridOperator::from_entries(&entries, 2, 1, RegridMethod::Mean).unwrap();

        // Three "time steps" over two source cells
        let data = [10.0, 20.0, 1.0, 3.0, -2.0, 2.0];
        let result = op.apply(&data, MissingValuePolicy::Skip).unwrap();

        assert_eq!(result.len(), 3);
        assert_relative_eq!(result[0], 15.0, epsilon = 1e-12);
        assert_relative_eq!(result[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(result[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_apply_dimension_mismatch() {
        let entries = half_half_entries();
        let op = RegridOperator::from_entries(&entries, 2, 1, RegridMethod::Mean).unwrap();

        let err = op.apply(&[1.0, 2.0, 3.0], MissingValuePolicy::Skip).unwrap_err();
        assert!(matches!(
            err,
            RegridError::DimensionMismatch {
                expected: 2,
                found: 3
            }
        ));
    }
}
