//! Size-driven splitting of a subset into time chunks.

use std::ops::Range;

use subset_common::{CfDatetime, SubsetError, SubsetResult};
use tracing::debug;

use crate::config::current_config;
use crate::dataset::{Dataset, TIME_DIM};

/// Bytes of one time coordinate value, stored as `f64` offsets.
const TIME_VALUE_BYTES: u64 = 8;

/// Estimated serialized size of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEstimate {
    /// Bytes of every time-dependent variable, plus the time coordinate,
    /// for one time step.
    pub bytes_per_step: u64,

    /// Bytes of the variables without a time dimension. Every chunk
    /// carries them in full.
    pub static_bytes: u64,

    /// Number of time steps, zero without a time axis.
    pub time_steps: usize,

    /// Estimated size of the whole dataset in bytes.
    pub total_bytes: u64,
}

impl SizeEstimate {
    /// Estimate from all variables: element width times the elements
    /// across the non-time dimensions, summed over time-dependent
    /// variables for the per-step size.
    pub fn for_dataset(ds: &Dataset) -> Self {
        let time_steps = ds.time_len();
        let mut bytes_per_step = if ds.time().is_some() { TIME_VALUE_BYTES } else { 0 };
        let mut static_bytes = 0u64;

        for var in ds.variables() {
            let width = var.data_type().size_bytes() as u64;
            match var.dim_index(TIME_DIM) {
                Some(axis) => {
                    let per_step: u64 = var
                        .shape()
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != axis)
                        .map(|(_, &len)| len as u64)
                        .product();
                    bytes_per_step += width * per_step;
                }
                None => static_bytes += width * var.len() as u64,
            }
        }

        Self {
            bytes_per_step,
            static_bytes,
            time_steps,
            total_bytes: static_bytes + bytes_per_step * time_steps as u64,
        }
    }

    /// Time steps that fit in `budget` bytes, never less than one.
    pub fn steps_per_chunk(&self, budget: u64) -> usize {
        if self.bytes_per_step == 0 {
            return self.time_steps.max(1);
        }
        let available = budget.saturating_sub(self.static_bytes);
        ((available / self.bytes_per_step) as usize).max(1)
    }

    /// Whether the whole dataset fits in `budget` bytes.
    pub fn fits(&self, budget: u64) -> bool {
        self.total_bytes <= budget
    }
}

/// Consecutive time index ranges covering `ds`, each within `budget` bytes
/// unless a single step is already larger.
pub fn get_time_slices(ds: &Dataset, budget: u64) -> SubsetResult<Vec<Range<usize>>> {
    if budget == 0 {
        return Err(SubsetError::invalid_parameter(
            "file_size_limit",
            "size budget must be greater than zero",
        ));
    }

    let estimate = SizeEstimate::for_dataset(ds);
    let steps = estimate.time_steps;
    if steps == 0 {
        return Ok(Vec::new());
    }

    let per_chunk = estimate.steps_per_chunk(budget);
    let n_chunks = steps.div_ceil(per_chunk);

    // Full runs of `per_chunk` steps; the last chunk takes what is left.
    let slices: Vec<Range<usize>> = (0..n_chunks)
        .map(|i| i * per_chunk..((i + 1) * per_chunk).min(steps))
        .collect();

    debug!(
        bytes_per_step = estimate.bytes_per_step,
        static_bytes = estimate.static_bytes,
        total_bytes = estimate.total_bytes,
        budget,
        chunks = slices.len(),
        "Computed time slices"
    );
    Ok(slices)
}

/// One time-bounded piece of a subset.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputChunk {
    /// Zero-based position in the chunk sequence.
    pub index: usize,
    /// The data of this chunk.
    pub dataset: Dataset,
    /// First and last time value, absent for data without a time axis.
    pub time_extent: Option<(CfDatetime, CfDatetime)>,
}

impl OutputChunk {
    fn new(index: usize, dataset: Dataset) -> Self {
        let time_extent = if dataset.time_len() > 0 {
            dataset.time_extent()
        } else {
            None
        };
        Self {
            index,
            dataset,
            time_extent,
        }
    }

    pub fn min_time(&self) -> Option<CfDatetime> {
        self.time_extent.map(|(min, _)| min)
    }

    pub fn max_time(&self) -> Option<CfDatetime> {
        self.time_extent.map(|(_, max)| max)
    }
}

/// Split `ds` into chronological chunks of at most `budget` bytes each.
///
/// Without an explicit budget the process-wide `write.file_size_limit`
/// is used. Data without a time axis, or without time steps, is returned
/// as one chunk.
pub fn chunk_dataset(ds: &Dataset, budget: Option<u64>) -> SubsetResult<Vec<OutputChunk>> {
    let budget = match budget {
        Some(budget) => budget,
        None => current_config().write.file_size_limit_bytes()?,
    };

    let slices = get_time_slices(ds, budget)?;
    if slices.is_empty() {
        return Ok(vec![OutputChunk {
            index: 0,
            dataset: ds.clone(),
            time_extent: None,
        }]);
    }
    if slices.len() == 1 {
        return Ok(vec![OutputChunk::new(0, ds.clone())]);
    }

    Ok(slices
        .into_iter()
        .enumerate()
        .map(|(i, range)| OutputChunk::new(i, ds.slice_time(range)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Attributes, TimeCoordinate, Variable, LAT_DIM, LON_DIM};
    use subset_common::Calendar;

    fn dataset(steps: usize) -> Dataset {
        let values = (0..steps)
            .map(|i| {
                let (year, month) = (2000 + (i / 12) as i32, (i % 12 + 1) as u32);
                CfDatetime::from_ymd(Calendar::NoLeap, year, month, 15).unwrap()
            })
            .collect();
        let time = TimeCoordinate::new(Calendar::NoLeap, values).unwrap();
        // 2 x 5 float32 grid and one time value = 48 bytes per step
        let tas = Variable::new(
            "tas",
            &[TIME_DIM, LAT_DIM, LON_DIM],
            vec![steps, 2, 5],
            vec![1.0f32; steps * 10],
        )
        .unwrap();
        Dataset::new(
            Some(time),
            vec![0.0, 1.0],
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![tas],
            Attributes::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_size_estimate() {
        let estimate = SizeEstimate::for_dataset(&dataset(12));
        assert_eq!(estimate.bytes_per_step, 48);
        assert_eq!(estimate.static_bytes, 0);
        assert_eq!(estimate.time_steps, 12);
        assert_eq!(estimate.total_bytes, 576);
        assert_eq!(estimate.steps_per_chunk(100), 2);
        assert_eq!(estimate.steps_per_chunk(10), 1);
        assert!(estimate.fits(576));
        assert!(!estimate.fits(575));
    }

    #[test]
    fn test_time_slices_remainder_in_last() {
        let slices = get_time_slices(&dataset(10), 144).unwrap();
        assert_eq!(slices, vec![0..3, 3..6, 6..9, 9..10]);
    }

    #[test]
    fn test_budget_larger_than_total() {
        let ds = dataset(12);
        let chunks = chunk_dataset(&ds, Some(1 << 20)).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].dataset, ds);
        assert_eq!(chunks[0].time_extent, ds.time_extent());
    }

    #[test]
    fn test_zero_budget_rejected() {
        let err = chunk_dataset(&dataset(3), Some(0)).unwrap_err();
        assert!(matches!(err, SubsetError::InvalidParameter { .. }));
    }

    #[test]
    fn test_chunks_partition_time_axis() {
        let ds = dataset(37);
        for budget in [1, 48, 49, 100, 200, 1000, 1776, 5000] {
            let chunks = chunk_dataset(&ds, Some(budget)).unwrap();
            let joined: Vec<CfDatetime> = chunks
                .iter()
                .flat_map(|c| c.dataset.time().unwrap().values().to_vec())
                .collect();
            assert_eq!(joined, ds.time().unwrap().values(), "budget {budget}");

            for pair in chunks.windows(2) {
                assert!(pair[0].max_time().unwrap() < pair[1].min_time().unwrap());
            }
            for (i, chunk) in chunks.iter().enumerate() {
                assert_eq!(chunk.index, i);
            }
        }
    }

    #[test]
    fn test_smaller_budget_never_fewer_chunks() {
        let ds = dataset(50);
        let mut previous = 0;
        for budget in (1..=2500).rev().step_by(7) {
            let count = get_time_slices(&ds, budget).unwrap().len();
            assert!(count >= previous, "budget {budget}");
            previous = count;
        }
    }

    #[test]
    fn test_single_step_over_budget() {
        let chunks = chunk_dataset(&dataset(4), Some(10)).unwrap();
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.dataset.time_len() == 1));
    }

    /// Bytes of every variable in `ds` plus its time coordinate.
    fn data_bytes(ds: &Dataset) -> u64 {
        let vars: usize = ds
            .variables()
            .iter()
            .map(|v| v.len() * v.data_type().size_bytes())
            .sum();
        (vars + ds.time_len() * 8) as u64
    }

    #[test]
    fn test_every_time_dependent_variable_counts() {
        let ds = dataset(10);
        let tas = ds.variable("tas").unwrap().clone();
        let pr = Variable::new("pr", &[TIME_DIM, LAT_DIM, LON_DIM], vec![10, 2, 5], vec![0.5f32; 100])
            .unwrap();
        let time_bnds =
            Variable::new("time_bnds", &[TIME_DIM, "bnds"], vec![10, 2], vec![0.0f64; 20]).unwrap();
        let ds = Dataset::new(
            ds.time().cloned(),
            ds.lat().to_vec(),
            ds.lon().to_vec(),
            vec![tas, pr, time_bnds],
            Attributes::new(),
        )
        .unwrap();

        let estimate = SizeEstimate::for_dataset(&ds);
        // tas 40 + pr 40 + time_bnds 16 + time 8
        assert_eq!(estimate.bytes_per_step, 104);

        for budget in [104, 150, 208, 400, 1040] {
            let chunks = chunk_dataset(&ds, Some(budget)).unwrap();
            for chunk in &chunks {
                assert!(data_bytes(&chunk.dataset) <= budget, "budget {budget}");
            }
            let steps: usize = chunks.iter().map(|c| c.dataset.time_len()).sum();
            assert_eq!(steps, 10);
        }
    }

    #[test]
    fn test_static_variable_counts_once_per_chunk() {
        let ds = dataset(6);
        let tas = ds.variable("tas").unwrap().clone();
        let orog =
            Variable::new("orog", &[LAT_DIM, LON_DIM], vec![2, 5], vec![100.0f64; 10]).unwrap();
        let ds = Dataset::new(
            ds.time().cloned(),
            ds.lat().to_vec(),
            ds.lon().to_vec(),
            vec![tas, orog],
            Attributes::new(),
        )
        .unwrap();

        let estimate = SizeEstimate::for_dataset(&ds);
        assert_eq!(estimate.static_bytes, 80);
        assert_eq!(estimate.total_bytes, 80 + 6 * 48);
        // 80 static bytes leave room for two 48 byte steps
        assert_eq!(estimate.steps_per_chunk(176), 2);

        let chunks = chunk_dataset(&ds, Some(176)).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| data_bytes(&c.dataset) <= 176));
    }

    #[test]
    fn test_time_axis_counts_when_main_variable_is_static() {
        // The largest variable has no time dimension.
        let values = (1..=3)
            .map(|month| CfDatetime::from_ymd(Calendar::NoLeap, 2000, month, 15).unwrap())
            .collect();
        let time = TimeCoordinate::new(Calendar::NoLeap, values).unwrap();
        let tas = Variable::new("tas", &[TIME_DIM, LAT_DIM], vec![3, 2], vec![1.0f32; 6]).unwrap();
        let orog = Variable::new("orog", &[LAT_DIM, LON_DIM], vec![2, 4], vec![0.0f32; 8]).unwrap();
        let ds = Dataset::new(
            Some(time),
            vec![0.0, 1.0],
            vec![0.0, 1.0, 2.0, 3.0],
            vec![tas, orog],
            Attributes::new(),
        )
        .unwrap();

        let estimate = SizeEstimate::for_dataset(&ds);
        assert_eq!(estimate.time_steps, 3);
        assert_eq!(estimate.bytes_per_step, 16);

        let chunks = chunk_dataset(&ds, Some(8)).unwrap();
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert_eq!(chunk.dataset.time_len(), 1);
            assert!(chunk.time_extent.is_some());
            assert_eq!(chunk.dataset.variable("orog"), ds.variable("orog"));
        }
    }

    #[test]
    fn test_no_time_dimension() {
        let orog =
            Variable::new("orog", &[LAT_DIM, LON_DIM], vec![1, 2], vec![5.0f64, 6.0]).unwrap();
        let ds =
            Dataset::new(None, vec![0.0], vec![0.0, 1.0], vec![orog], Attributes::new()).unwrap();
        let chunks = chunk_dataset(&ds, Some(1)).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].time_extent.is_none());
    }

    #[test]
    fn test_zero_time_steps() {
        let ds = dataset(0);
        let chunks = chunk_dataset(&ds, Some(100)).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].time_extent.is_none());
    }
}
