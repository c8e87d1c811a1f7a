//! Assembly and numerical integration of compartment systems
mod closure;
mod result;
mod system;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use diffsol::{
    error::{DiffsolError, OdeSolverError},
    NalgebraLU, OdeBuilder, OdeSolverMethod, OdeSolverStopReason,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::{Model, Protocol};
use crate::error::{ConfigurationError, IntegrationError, PkError};
use crate::settings::SolverSettings;
use closure::{CompartmentProblem, Fault};

pub use result::RunResult;
pub use system::{StateLayout, System};

pub type T = f64;
pub type V = nalgebra::DVector<T>;
pub type M = nalgebra::DMatrix<T>;

/// Points at which a trajectory is reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeGrid {
    /// `samples` evenly spaced points over `[0, horizon]`, both ends included
    Uniform { horizon: f64, samples: usize },
    /// Caller supplied points, starting at 0 and strictly increasing
    Explicit(Vec<f64>),
}

impl Default for TimeGrid {
    fn default() -> Self {
        TimeGrid::Uniform {
            horizon: 1.0,
            samples: 1000,
        }
    }
}

impl TimeGrid {
    pub fn uniform(horizon: f64, samples: usize) -> Self {
        TimeGrid::Uniform { horizon, samples }
    }

    pub fn explicit(times: impl Into<Vec<f64>>) -> Self {
        TimeGrid::Explicit(times.into())
    }

    /// Validate the grid and expand it into its time points
    pub fn points(&self) -> Result<Vec<f64>, ConfigurationError> {
        match self {
            TimeGrid::Uniform { horizon, samples } => {
                if !horizon.is_finite() || *horizon <= 0.0 {
                    return Err(ConfigurationError::InvalidTimeGrid(format!(
                        "horizon must be finite and > 0, got {}",
                        horizon
                    )));
                }
                if *samples < 2 {
                    return Err(ConfigurationError::InvalidTimeGrid(format!(
                        "at least 2 samples are required, got {}",
                        samples
                    )));
                }
                let step = horizon / (*samples - 1) as f64;
                let mut points: Vec<f64> = (0..*samples).map(|i| i as f64 * step).collect();
                // Avoid accumulated rounding on the last point
                points[*samples - 1] = *horizon;
                Ok(points)
            }
            TimeGrid::Explicit(times) => {
                match times.first() {
                    Some(&t0) if t0 == 0.0 => {}
                    Some(&t0) => {
                        return Err(ConfigurationError::InvalidTimeGrid(format!(
                            "the first time point must be 0, got {}",
                            t0
                        )))
                    }
                    None => {
                        return Err(ConfigurationError::InvalidTimeGrid(
                            "the grid is empty".to_string(),
                        ))
                    }
                }
                for (i, pair) in times.windows(2).enumerate() {
                    if !pair[1].is_finite() || pair[1] <= pair[0] {
                        return Err(ConfigurationError::InvalidTimeGrid(format!(
                            "time points must be finite and strictly increasing, got {} after {} at position {}",
                            pair[1],
                            pair[0],
                            i + 1
                        )));
                    }
                }
                Ok(times.clone())
            }
        }
    }
}

/// Integrate a (Model, Protocol) pair and sample it on `grid`
///
/// Uses an adaptive BDF method, which copes with the stiffness caused by
/// rate constants spanning several orders of magnitude. The solver is
/// restarted at every discontinuity of the dose rate and grid points are
/// read from its dense output, so the step count does not depend on the
/// number of samples.
pub fn simulate(
    model: &Model,
    protocol: &Protocol,
    grid: &TimeGrid,
    settings: &SolverSettings,
) -> Result<RunResult, PkError> {
    settings.validate()?;
    let times = grid.points()?;
    let system = System::new(model, protocol);
    integrate(system, &times, settings)
}

fn integrate(system: System, times: &[f64], settings: &SolverSettings) -> Result<RunResult, PkError> {
    let layout = system.layout();
    let nstates = layout.nstates();
    let horizon = times[times.len() - 1];

    // The solver is restarted at every discontinuity of the dose rate
    let mut segments: Vec<f64> = system
        .protocol()
        .breakpoints()
        .into_iter()
        .filter(|&t| t > 0.0 && t < horizon)
        .collect();
    segments.push(horizon);
    segments.sort_by(f64::total_cmp);
    segments.dedup();

    tracing::debug!(
        nstates,
        horizon,
        samples = times.len(),
        segments = segments.len(),
        rtol = settings.rtol,
        atol = settings.atol,
        "Integrating compartment system"
    );

    let mut state = system.initial_state();
    let mut amounts = Array2::zeros((times.len(), nstates));
    record(&mut amounts, 0, &state);

    let fault: Fault = Rc::new(RefCell::new(None));
    let started = Instant::now();
    let mut nsteps = 0usize;
    let mut row = 1;
    let mut t0 = 0.0;

    for end in segments {
        if end <= t0 {
            continue;
        }
        let rate = system.segment_rate(t0)?;
        let problem = OdeBuilder::<M>::new()
            .atol(vec![settings.atol; nstates])
            .rtol(settings.rtol)
            .t0(t0)
            .h0(settings.h0.min(end - t0))
            .build_from_eqn(CompartmentProblem::new(
                system.clone(),
                state.clone(),
                rate,
                fault.clone(),
            ))
            .map_err(IntegrationError::from)?;
        let mut solver = problem
            .bdf::<NalgebraLU<f64>>()
            .map_err(IntegrationError::from)?;

        solver
            .set_stop_time(end)
            .map_err(IntegrationError::from)?;
        loop {
            let outcome = solver.step();
            if let Some(err) = fault.borrow_mut().take() {
                return Err(err.into());
            }
            let reached = match outcome {
                Ok(OdeSolverStopReason::TstopReached) => true,
                Ok(OdeSolverStopReason::InternalTimestep) => false,
                Ok(OdeSolverStopReason::RootFound(_)) => false,
                Err(DiffsolError::OdeSolverError(OdeSolverError::StepSizeTooSmall { .. })) => {
                    return Err(IntegrationError::StepSizeTooSmall {
                        time: solver.state().t,
                    }
                    .into());
                }
                Err(err) => return Err(IntegrationError::Solver(err).into()),
            };

            let t = solver.state().t;
            check_finite(solver.state().y, t)?;

            // Grid points covered by the last step are read from the dense output.
            // The stop time is only matched up to roundoff.
            let covered = if reached { end } else { t.min(end) };
            while row < times.len() && times[row] <= covered {
                let sample = times[row];
                if sample >= t {
                    record(&mut amounts, row, solver.state().y);
                } else {
                    let y = solver.interpolate(sample).map_err(IntegrationError::from)?;
                    check_finite(&y, sample)?;
                    record(&mut amounts, row, &y);
                }
                row += 1;
            }

            if reached {
                break;
            }
            nsteps += 1;
            if nsteps >= settings.max_steps {
                return Err(IntegrationError::StepBudgetExceeded {
                    max_steps: settings.max_steps,
                    time: t,
                }
                .into());
            }
            if let Some(budget) = settings.max_duration {
                if started.elapsed().as_secs_f64() > budget {
                    return Err(IntegrationError::TimeBudgetExceeded { budget, time: t }.into());
                }
            }
        }

        state.copy_from(solver.state().y);
        t0 = end;
    }

    tracing::debug!(
        steps = nsteps,
        elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
        "Integration finished"
    );

    Ok(RunResult::new(times.to_vec(), amounts, layout))
}

/// Fails on the first NaN or infinite entry of `state`
fn check_finite(state: &V, time: f64) -> Result<(), IntegrationError> {
    match state.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(IntegrationError::NonFiniteState { index, time }),
        None => Ok(()),
    }
}

fn record(amounts: &mut Array2<f64>, row: usize, state: &V) {
    amounts
        .row_mut(row)
        .iter_mut()
        .zip(state.iter())
        .for_each(|(a, &x)| *a = x);
}
