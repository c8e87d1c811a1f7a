use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::simulator::RunResult;

/// How an external renderer should arrange the runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// All runs share one coordinate system
    #[default]
    Overlay,
    /// Each run gets its own panel
    SideBySide,
}

impl FromStr for Layout {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "overlay" => Ok(Layout::Overlay),
            "side_by_side" | "side-by-side" => Ok(Layout::SideBySide),
            _ => Err(ConfigurationError::UnknownLayout(s.to_string())),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Overlay => write!(f, "overlay"),
            Layout::SideBySide => write!(f, "side_by_side"),
        }
    }
}

/// Amount of drug in one compartment over time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub name: String,
    pub values: Vec<f64>,
}

/// One run as seen by a renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    pub time_grid: Vec<f64>,
    pub compartment_trajectories: Vec<Trajectory>,
}

impl Series {
    /// Central compartment first, then peripherals in model order
    pub(crate) fn from_result(label: String, result: &RunResult) -> Self {
        let compartment_trajectories = result
            .compartments()
            .enumerate()
            .map(|(i, values)| Trajectory {
                name: if i == 0 {
                    "central".to_string()
                } else {
                    format!("peripheral {}", i)
                },
                values: values.to_vec(),
            })
            .collect();
        Series {
            label,
            time_grid: result.times().to_vec(),
            compartment_trajectories,
        }
    }
}

/// Everything a renderer needs, and nothing more
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub layout: Layout,
    pub series: Vec<Series>,
}

impl Presentation {
    pub(crate) fn new(layout: Layout, series: Vec<Series>) -> Self {
        Presentation { layout, series }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
