use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::ComparisonError;
use crate::simulator::StateLayout;

/// Trajectory of one integrated (Model, Protocol) pair
///
/// Amounts are stored as a `ntimes x nstates` matrix in state vector order,
/// see [StateLayout]. Use the accessors to read compartments by role.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    times: Vec<f64>,
    amounts: Array2<f64>,
    layout: StateLayout,
}

impl RunResult {
    pub(crate) fn new(times: Vec<f64>, amounts: Array2<f64>, layout: StateLayout) -> Self {
        debug_assert_eq!(amounts.nrows(), times.len());
        debug_assert_eq!(amounts.ncols(), layout.nstates());
        RunResult {
            times,
            amounts,
            layout,
        }
    }

    /// Get the sampled time points
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Get the full `ntimes x nstates` amount matrix
    pub fn amounts(&self) -> &Array2<f64> {
        &self.amounts
    }

    pub fn layout(&self) -> StateLayout {
        self.layout
    }

    /// Number of compartments, central plus peripherals (the depot is not a compartment)
    pub fn ncompartments(&self) -> usize {
        1 + self.layout.nperipherals()
    }

    /// Amount in the central compartment over time
    pub fn central(&self) -> ArrayView1<'_, f64> {
        self.amounts.column(self.layout.central())
    }

    /// Amount in peripheral compartment `i` over time
    pub fn peripheral(&self, i: usize) -> Option<ArrayView1<'_, f64>> {
        self.layout.peripheral(i).map(|idx| self.amounts.column(idx))
    }

    /// Amount left in the absorption depot over time, subcutaneous models only
    pub fn depot(&self) -> Option<ArrayView1<'_, f64>> {
        self.layout.depot().map(|idx| self.amounts.column(idx))
    }

    /// Compartment trajectories, central first then peripherals in model order
    pub fn compartments(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> + '_ {
        std::iter::once(self.central())
            .chain((0..self.layout.nperipherals()).filter_map(move |i| self.peripheral(i)))
    }

    /// Total amount of drug in the body (depot included) at every time point
    pub fn total(&self) -> Array1<f64> {
        self.amounts.sum_axis(Axis(1))
    }

    /// Linearly interpolate the trajectory onto `times`
    ///
    /// Fails if any requested time lies outside of the simulated range.
    /// `run` only labels the error.
    pub fn resample(&self, times: &[f64], run: usize) -> Result<RunResult, ComparisonError> {
        let start = self.times.first().copied().unwrap_or(0.0);
        let end = self.times.last().copied().unwrap_or(0.0);
        let mut amounts = Array2::zeros((times.len(), self.amounts.ncols()));

        for (row, &t) in times.iter().enumerate() {
            if !(t >= start && t <= end) {
                return Err(ComparisonError::OutOfRange {
                    run,
                    time: t,
                    start,
                    end,
                });
            }
            // First sample with time >= t
            let hi = self.times.partition_point(|&x| x < t);
            if self.times[hi] == t || hi == 0 {
                amounts.row_mut(row).assign(&self.amounts.row(hi));
                continue;
            }
            let lo = hi - 1;
            let (t0, t1) = (self.times[lo], self.times[hi]);
            let w = (t - t0) / (t1 - t0);
            let interpolated = &self.amounts.row(lo) * (1.0 - w) + &self.amounts.row(hi) * w;
            amounts.row_mut(row).assign(&interpolated);
        }

        Ok(RunResult::new(times.to_vec(), amounts, self.layout))
    }
}
