//! Multi-compartment pharmacokinetic models.
//!
//! A [Model] is a central compartment, receiving and eliminating drug, plus any
//! number of peripheral compartments exchanging drug with it. A [Protocol]
//! describes the dose. [simulate] integrates one pair into a [RunResult] and a
//! [Solution] collects several runs for comparison.
//!
//! ```ignore
//! use pkmodel::*;
//!
//! let model = Model::intravenous(1.0, 1.0)?
//!     .with_compartment(2.0, 3.0)?
//!     .with_compartment(8.0, 0.5)?;
//! let protocol = Protocol::bolus(100.0)?;
//!
//! let mut solution = Solution::new().with_grid(TimeGrid::uniform(24.0, 241));
//! let handle = solution.add(model, protocol)?;
//! let run = solution.run(handle).unwrap();
//! println!("{:?}", run.result().central());
//!
//! let payload = solution.presentation(Layout::Overlay).to_json()?;
//! ```
pub mod data;
pub mod error;
pub mod logger;
pub mod settings;
pub mod simulator;
pub mod solution;

pub use crate::data::*;
pub use crate::error::*;
pub use crate::logger::setup_log;
pub use crate::settings::{LogSettings, Settings, SolverSettings};
pub use crate::simulator::{simulate, RunResult, StateLayout, System, TimeGrid};
pub use crate::solution::*;
