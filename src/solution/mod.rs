//! Collections of runs for joint inspection
mod presentation;

use std::sync::Arc;

use rayon::prelude::*;

use crate::data::{Model, Protocol};
use crate::error::{ComparisonError, PkError};
use crate::settings::{Settings, SolverSettings};
use crate::simulator::{simulate, RunResult, TimeGrid};

pub use presentation::{Layout, Presentation, Series, Trajectory};

/// Identifies a run within the [Solution] that created it
///
/// Handles are never reused. Removing a run does not change the handles of
/// the other runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunHandle(usize);

impl RunHandle {
    /// Submission number of the run, counting removed runs
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One integrated (Model, Protocol) pair
#[derive(Debug, Clone)]
pub struct Run {
    handle: RunHandle,
    model: Arc<Model>,
    protocol: Arc<Protocol>,
    result: RunResult,
}

impl Run {
    pub fn handle(&self) -> RunHandle {
        self.handle
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn result(&self) -> &RunResult {
        &self.result
    }

    /// Route and compartment count of the model
    pub fn label(&self) -> String {
        self.model.label()
    }
}

/// An ordered collection of integrated runs
///
/// Runs are integrated eagerly when added and kept in submission order.
/// A failing run leaves the collection unchanged.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    runs: Vec<Run>,
    next: usize,
    grid: TimeGrid,
    solver: SolverSettings,
}

impl Solution {
    /// An empty solution using the default grid and solver settings
    pub fn new() -> Self {
        Solution::default()
    }

    /// An empty solution using the grid and solver sections of `settings`
    pub fn from_settings(settings: &Settings) -> Self {
        Solution {
            runs: Vec::new(),
            next: 0,
            grid: settings.grid.clone(),
            solver: settings.solver.clone(),
        }
    }

    /// Set the grid used by [Solution::add]
    pub fn with_grid(mut self, grid: TimeGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_solver(mut self, solver: SolverSettings) -> Self {
        self.solver = solver;
        self
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Integrate a pair on the default grid and append it
    pub fn add(
        &mut self,
        model: impl Into<Arc<Model>>,
        protocol: impl Into<Arc<Protocol>>,
    ) -> Result<RunHandle, PkError> {
        let grid = self.grid.clone();
        self.add_with_grid(model, protocol, &grid)
    }

    /// Integrate a pair on its own grid and append it
    pub fn add_with_grid(
        &mut self,
        model: impl Into<Arc<Model>>,
        protocol: impl Into<Arc<Protocol>>,
        grid: &TimeGrid,
    ) -> Result<RunHandle, PkError> {
        let handle = RunHandle(self.next);
        let run = self.integrate(handle, model.into(), protocol.into(), grid)?;
        tracing::info!(run = handle.0, label = %run.label(), "Added run");
        self.runs.push(run);
        self.next += 1;
        Ok(handle)
    }

    /// Integrate several pairs in parallel on the default grid
    ///
    /// Runs are appended in submission order. If any pair fails nothing is
    /// appended and the error names the submission number the failed run
    /// would have had.
    pub fn add_all<I>(&mut self, pairs: I) -> Result<Vec<RunHandle>, PkError>
    where
        I: IntoIterator<Item = (Arc<Model>, Arc<Protocol>)>,
    {
        let pairs: Vec<(Arc<Model>, Arc<Protocol>)> = pairs.into_iter().collect();
        let offset = self.next;

        let runs = pairs
            .into_par_iter()
            .enumerate()
            .map(|(i, (model, protocol))| {
                let label = model.label();
                self.integrate(RunHandle(offset + i), model, protocol, &self.grid)
                    .map_err(|err| PkError::Run {
                        index: offset + i,
                        label,
                        source: Box::new(err),
                    })
            })
            .collect::<Result<Vec<Run>, PkError>>()?;

        tracing::info!(count = runs.len(), "Added runs");
        let handles = runs.iter().map(Run::handle).collect();
        self.next += runs.len();
        self.runs.extend(runs);
        Ok(handles)
    }

    fn integrate(
        &self,
        handle: RunHandle,
        model: Arc<Model>,
        protocol: Arc<Protocol>,
        grid: &TimeGrid,
    ) -> Result<Run, PkError> {
        match simulate(&model, &protocol, grid, &self.solver) {
            Ok(result) => Ok(Run {
                handle,
                model,
                protocol,
                result,
            }),
            Err(err) => {
                tracing::warn!(label = %model.label(), "Run failed: {}", err);
                Err(err)
            }
        }
    }

    /// Get the results of all runs in submission order
    pub fn get_runs(&self) -> Vec<&RunResult> {
        self.runs.iter().map(|run| &run.result).collect()
    }

    /// Get all runs with their model and protocol
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Look up a run, `None` if it was removed
    pub fn run(&self, handle: RunHandle) -> Option<&Run> {
        self.position(handle).map(|i| &self.runs[i])
    }

    /// Remove a run and return it
    ///
    /// The remaining runs keep their order and their handles.
    pub fn remove(&mut self, handle: RunHandle) -> Option<Run> {
        let run = self.runs.remove(self.position(handle)?);
        tracing::info!(run = handle.0, label = %run.label(), "Removed run");
        Some(run)
    }

    // Runs are sorted by handle
    fn position(&self, handle: RunHandle) -> Option<usize> {
        self.runs.binary_search_by_key(&handle, |run| run.handle).ok()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Resample every run onto a common grid
    ///
    /// Fails if there are no runs or the grid leaves the simulated range of
    /// any run. Errors name the run by [RunHandle::index].
    pub fn aligned(&self, grid: &TimeGrid) -> Result<Vec<RunResult>, PkError> {
        if self.runs.is_empty() {
            return Err(ComparisonError::Empty.into());
        }
        let times = grid.points()?;
        let aligned = self
            .runs
            .iter()
            .map(|run| run.result.resample(&times, run.handle.0))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(aligned)
    }

    /// Structured data for an external renderer
    pub fn presentation(&self, layout: Layout) -> Presentation {
        Presentation::new(
            layout,
            self.runs
                .iter()
                .map(|run| Series::from_result(run.label(), &run.result))
                .collect(),
        )
    }

    /// Like [Solution::presentation], with every run resampled onto `grid`
    pub fn aligned_presentation(&self, layout: Layout, grid: &TimeGrid) -> Result<Presentation, PkError> {
        let aligned = self.aligned(grid)?;
        Ok(Presentation::new(
            layout,
            self.runs
                .iter()
                .zip(aligned.iter())
                .map(|(run, result)| Series::from_result(run.label(), result))
                .collect(),
        ))
    }
}
