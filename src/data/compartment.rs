use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::{check_non_negative, check_positive};
use crate::error::ConfigurationError;

/// Absorption rate constant (1/h) used when a subcutaneous route is parsed from its name
pub const DEFAULT_ABSORPTION_RATE: f64 = 1.0;

/// Route of administration of the dose
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RouteDef", into = "RouteDef")]
pub enum Route {
    /// The dose enters the central compartment directly
    Intravenous,
    /// The dose is absorbed from a depot into the central compartment at rate `absorption_rate` (1/h)
    Subcutaneous { absorption_rate: f64 },
}

impl Route {
    /// A subcutaneous route with the given absorption rate constant
    pub fn subcutaneous(absorption_rate: f64) -> Result<Self, ConfigurationError> {
        Ok(Route::Subcutaneous {
            absorption_rate: check_positive("absorption_rate", absorption_rate)?,
        })
    }

    /// Get the absorption rate constant, if the route has one
    pub fn absorption_rate(&self) -> Option<f64> {
        match self {
            Route::Intravenous => None,
            Route::Subcutaneous { absorption_rate } => Some(*absorption_rate),
        }
    }

    /// Short name of the route
    pub fn name(&self) -> &'static str {
        match self {
            Route::Intravenous => "iv",
            Route::Subcutaneous { .. } => "subcutaneous",
        }
    }

    fn validate(self) -> Result<Self, ConfigurationError> {
        match self {
            Route::Intravenous => Ok(self),
            Route::Subcutaneous { absorption_rate } => Route::subcutaneous(absorption_rate),
        }
    }
}

impl FromStr for Route {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "iv" | "intravenous" => Ok(Route::Intravenous),
            "sc" | "subcutaneous" => Ok(Route::Subcutaneous {
                absorption_rate: DEFAULT_ABSORPTION_RATE,
            }),
            _ => Err(ConfigurationError::UnknownRoute(s.to_string())),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The central compartment, the only one receiving and eliminating drug
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CentralDef", into = "CentralDef")]
pub struct CentralCompartment {
    volume: f64,
    clearance: f64,
    route: Route,
}

impl CentralCompartment {
    /// Create a new central compartment
    ///
    /// # Arguments
    ///
    /// * `route` - Route of administration
    /// * `volume` - Volume `V_c` in mL, must be `> 0`
    /// * `clearance` - Clearance `CL` in mL/h, must be `>= 0`
    pub fn new(route: Route, volume: f64, clearance: f64) -> Result<Self, ConfigurationError> {
        Ok(CentralCompartment {
            volume: check_positive("central.volume", volume)?,
            clearance: check_non_negative("central.clearance", clearance)?,
            route: route.validate()?,
        })
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn clearance(&self) -> f64 {
        self.clearance
    }

    pub fn route(&self) -> Route {
        self.route
    }
}

/// A peripheral compartment exchanging drug with the central compartment only
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CompartmentDef", into = "CompartmentDef")]
pub struct Compartment {
    volume: f64,
    transfer: f64,
}

impl Compartment {
    /// Create a new peripheral compartment
    ///
    /// # Arguments
    ///
    /// * `volume` - Volume `V_p` in mL, must be `> 0`
    /// * `transfer` - Inter-compartmental transfer rate `Q_p` in mL/h, must be `>= 0`
    pub fn new(volume: f64, transfer: f64) -> Result<Self, ConfigurationError> {
        Compartment::indexed(None, volume, transfer)
    }

    fn indexed(index: Option<usize>, volume: f64, transfer: f64) -> Result<Self, ConfigurationError> {
        let name = |field: &str| match index {
            Some(i) => format!("peripheral[{}].{}", i, field),
            None => format!("peripheral.{}", field),
        };
        Ok(Compartment {
            volume: check_positive(&name("volume"), volume)?,
            transfer: check_non_negative(&name("transfer"), transfer)?,
        })
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn transfer(&self) -> f64 {
        self.transfer
    }
}

/// A central compartment plus an ordered sequence of peripheral compartments
///
/// All parameters are validated when the model is built or extended, so a
/// [Model] value always satisfies its invariants. Deserialization goes
/// through the same validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelDef", into = "ModelDef")]
pub struct Model {
    central: CentralCompartment,
    peripherals: Vec<Compartment>,
}

impl Model {
    /// Create a model without peripheral compartments
    pub fn new(route: Route, volume: f64, clearance: f64) -> Result<Self, ConfigurationError> {
        Ok(Model {
            central: CentralCompartment::new(route, volume, clearance)?,
            peripherals: Vec::new(),
        })
    }

    /// Shorthand for an intravenous model
    pub fn intravenous(volume: f64, clearance: f64) -> Result<Self, ConfigurationError> {
        Model::new(Route::Intravenous, volume, clearance)
    }

    /// Shorthand for a subcutaneous model with absorption rate `ka`
    pub fn subcutaneous(volume: f64, clearance: f64, ka: f64) -> Result<Self, ConfigurationError> {
        Model::new(Route::subcutaneous(ka)?, volume, clearance)
    }

    /// Create a model from the name of its route, `"iv"` or `"subcutaneous"`
    pub fn from_route_name(route: &str, volume: f64, clearance: f64) -> Result<Self, ConfigurationError> {
        Model::new(route.parse()?, volume, clearance)
    }

    /// Append a peripheral compartment
    ///
    /// On error the model is left unchanged.
    pub fn add_compartment(&mut self, volume: f64, transfer: f64) -> Result<&mut Self, ConfigurationError> {
        let compartment = Compartment::indexed(Some(self.peripherals.len()), volume, transfer)?;
        self.peripherals.push(compartment);
        Ok(self)
    }

    /// Consuming variant of [Model::add_compartment] for chaining
    pub fn with_compartment(mut self, volume: f64, transfer: f64) -> Result<Self, ConfigurationError> {
        self.add_compartment(volume, transfer)?;
        Ok(self)
    }

    pub fn central(&self) -> &CentralCompartment {
        &self.central
    }

    pub fn peripherals(&self) -> &[Compartment] {
        &self.peripherals
    }

    pub fn route(&self) -> Route {
        self.central.route
    }

    /// Number of compartments, central included
    pub fn ncompartments(&self) -> usize {
        1 + self.peripherals.len()
    }

    /// Human readable label, route and compartment count
    pub fn label(&self) -> String {
        let n = self.ncompartments();
        format!(
            "{}, {} compartment{}",
            self.route(),
            n,
            if n == 1 { "" } else { "s" }
        )
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Model ({}): V_c = {}, CL = {}",
            self.route(),
            self.central.volume,
            self.central.clearance
        )?;
        for (i, p) in self.peripherals.iter().enumerate() {
            writeln!(f, "  peripheral {}: V_p = {}, Q_p = {}", i, p.volume, p.transfer)?;
        }
        Ok(())
    }
}

// Unvalidated mirrors of the public types, every deserialized value is
// rebuilt through the checked constructors.

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RouteDef {
    Intravenous,
    Subcutaneous { absorption_rate: f64 },
}

impl TryFrom<RouteDef> for Route {
    type Error = ConfigurationError;

    fn try_from(def: RouteDef) -> Result<Self, Self::Error> {
        match def {
            RouteDef::Intravenous => Ok(Route::Intravenous),
            RouteDef::Subcutaneous { absorption_rate } => Route::subcutaneous(absorption_rate),
        }
    }
}

impl From<Route> for RouteDef {
    fn from(route: Route) -> Self {
        match route {
            Route::Intravenous => RouteDef::Intravenous,
            Route::Subcutaneous { absorption_rate } => RouteDef::Subcutaneous { absorption_rate },
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CentralDef {
    volume: f64,
    clearance: f64,
    route: Route,
}

impl TryFrom<CentralDef> for CentralCompartment {
    type Error = ConfigurationError;

    fn try_from(def: CentralDef) -> Result<Self, Self::Error> {
        CentralCompartment::new(def.route, def.volume, def.clearance)
    }
}

impl From<CentralCompartment> for CentralDef {
    fn from(central: CentralCompartment) -> Self {
        CentralDef {
            volume: central.volume,
            clearance: central.clearance,
            route: central.route,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CompartmentDef {
    volume: f64,
    transfer: f64,
}

impl TryFrom<CompartmentDef> for Compartment {
    type Error = ConfigurationError;

    fn try_from(def: CompartmentDef) -> Result<Self, Self::Error> {
        Compartment::new(def.volume, def.transfer)
    }
}

impl From<Compartment> for CompartmentDef {
    fn from(compartment: Compartment) -> Self {
        CompartmentDef {
            volume: compartment.volume,
            transfer: compartment.transfer,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ModelDef {
    central: CentralCompartment,
    // Kept raw so that errors name the position of the compartment
    #[serde(default)]
    peripherals: Vec<CompartmentDef>,
}

impl TryFrom<ModelDef> for Model {
    type Error = ConfigurationError;

    fn try_from(def: ModelDef) -> Result<Self, Self::Error> {
        let mut model = Model {
            central: def.central,
            peripherals: Vec::with_capacity(def.peripherals.len()),
        };
        for p in def.peripherals {
            model.add_compartment(p.volume, p.transfer)?;
        }
        Ok(model)
    }
}

impl From<Model> for ModelDef {
    fn from(model: Model) -> Self {
        ModelDef {
            central: model.central,
            peripherals: model.peripherals.into_iter().map(CompartmentDef::from).collect(),
        }
    }
}
