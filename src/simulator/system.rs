use serde::Serialize;

use crate::data::{Compartment, Model, Protocol};
use crate::error::DomainError;
use crate::simulator::{T, V};

/// Positions of the compartments in the state vector
///
/// Intravenous models use `[central, p_1 .. p_k]`. Subcutaneous models put the
/// absorption depot first: `[depot, central, p_1 .. p_k]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateLayout {
    depot: Option<usize>,
    central: usize,
    nperipherals: usize,
}

impl StateLayout {
    pub fn for_model(model: &Model) -> Self {
        let has_depot = model.route().absorption_rate().is_some();
        StateLayout {
            depot: has_depot.then_some(0),
            central: usize::from(has_depot),
            nperipherals: model.peripherals().len(),
        }
    }

    /// Index of the absorption depot, if any
    pub fn depot(&self) -> Option<usize> {
        self.depot
    }

    /// Index of the central compartment
    pub fn central(&self) -> usize {
        self.central
    }

    /// Index of peripheral compartment `i`
    pub fn peripheral(&self, i: usize) -> Option<usize> {
        (i < self.nperipherals).then(|| self.central + 1 + i)
    }

    pub fn nperipherals(&self) -> usize {
        self.nperipherals
    }

    /// Total number of state entries
    pub fn nstates(&self) -> usize {
        self.central + 1 + self.nperipherals
    }
}

/// The first-order ODE system `dy/dt = f(t, y)` of a (Model, Protocol) pair
///
/// ```text
/// dq_c/dt   = dose_rate(t) - CL q_c/V_c - sum_i Q_i (q_c/V_c - q_i/V_i) [+ ka depot]
/// dq_i/dt   = Q_i (q_c/V_c - q_i/V_i)
/// ddepot/dt = -ka depot
/// ```
///
/// Transfer is driven by concentrations, so drug flows from the higher to the
/// lower concentration. Elimination only acts on the central compartment.
#[derive(Debug, Clone)]
pub struct System {
    layout: StateLayout,
    volume: f64,
    clearance: f64,
    absorption_rate: Option<f64>,
    peripherals: Vec<Compartment>,
    protocol: Protocol,
}

impl System {
    /// Assemble the system, the model was validated on construction
    pub fn new(model: &Model, protocol: &Protocol) -> Self {
        let central = model.central();
        System {
            layout: StateLayout::for_model(model),
            volume: central.volume(),
            clearance: central.clearance(),
            absorption_rate: model.route().absorption_rate(),
            peripherals: model.peripherals().to_vec(),
            protocol: protocol.clone(),
        }
    }

    pub fn layout(&self) -> StateLayout {
        self.layout
    }

    pub fn nstates(&self) -> usize {
        self.layout.nstates()
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// State at `t = 0`
    ///
    /// The bolus goes straight into the central compartment for the
    /// intravenous route and into the depot for the subcutaneous route.
    pub fn initial_state(&self) -> V {
        let mut x = V::zeros(self.nstates());
        let target = self.layout.depot.unwrap_or(self.layout.central);
        x[target] = self.protocol.initial_dose();
        x
    }

    /// Full right hand side, `dx = f(t, x)`
    pub fn derivative(&self, t: T, x: &V, dx: &mut V) -> Result<(), DomainError> {
        let rate = self.protocol.dose_rate(t)?;
        self.derivative_at_rate(rate, x, dx);
        Ok(())
    }

    /// Right hand side for a known dose rate
    pub fn derivative_at_rate(&self, rate: f64, x: &V, dx: &mut V) {
        self.transfer(x, dx);
        dx[self.layout.central] += rate;
    }

    /// Dose rate held constant on the segment starting at `t`, see
    /// [Protocol::rate_until_next_breakpoint]
    pub fn segment_rate(&self, t: T) -> Result<Option<f64>, DomainError> {
        self.protocol.rate_until_next_breakpoint(t)
    }

    /// Dose free part of the right hand side, `dx = A x`
    ///
    /// The system is linear in the state, so this is also the exact
    /// Jacobian-vector product.
    pub fn transfer(&self, x: &V, dx: &mut V) {
        let c = self.layout.central;
        let concentration = x[c] / self.volume;
        let mut central = -self.clearance * concentration;

        for (i, p) in self.peripherals.iter().enumerate() {
            let idx = c + 1 + i;
            let flux = p.transfer() * (concentration - x[idx] / p.volume());
            dx[idx] = flux;
            central -= flux;
        }

        if let (Some(depot), Some(ka)) = (self.layout.depot, self.absorption_rate) {
            let absorbed = ka * x[depot];
            dx[depot] = -absorbed;
            central += absorbed;
        }

        dx[c] = central;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_peripherals() -> Model {
        Model::intravenous(1.0, 0.0)
            .and_then(|m| m.with_compartment(2.0, 3.0))
            .and_then(|m| m.with_compartment(8.0, 0.5))
            .unwrap()
    }

    #[test]
    fn test_layout() {
        let iv = StateLayout::for_model(&two_peripherals());
        assert_eq!(iv.depot(), None);
        assert_eq!(iv.central(), 0);
        assert_eq!(iv.peripheral(1), Some(2));
        assert_eq!(iv.peripheral(2), None);
        assert_eq!(iv.nstates(), 3);

        let sc = StateLayout::for_model(&Model::subcutaneous(1.0, 1.0, 2.0).unwrap());
        assert_eq!(sc.depot(), Some(0));
        assert_eq!(sc.central(), 1);
        assert_eq!(sc.nstates(), 2);
    }

    #[test]
    fn test_initial_state() {
        let protocol = Protocol::bolus(100.0).unwrap();
        let iv = System::new(&two_peripherals(), &protocol);
        assert_eq!(iv.initial_state().as_slice(), &[100.0, 0.0, 0.0]);

        let sc = System::new(
            &Model::subcutaneous(1.0, 1.0, 2.0)
                .and_then(|m| m.with_compartment(1.0, 1.0))
                .unwrap(),
            &protocol,
        );
        assert_eq!(sc.initial_state().as_slice(), &[100.0, 0.0, 0.0]);
        assert_eq!(sc.layout().central(), 1);
    }

    #[test]
    fn test_derivative_follows_concentrations() {
        let system = System::new(&two_peripherals(), &Protocol::bolus(0.0).unwrap());
        // q_c/V_c = 1, q_1/V_1 = 2, q_2/V_2 = 0.5
        let x = V::from_vec(vec![1.0, 4.0, 4.0]);
        let mut dx = V::zeros(3);
        system.derivative(0.0, &x, &mut dx).unwrap();

        assert_relative_eq!(dx[1], 3.0 * (1.0 - 2.0));
        assert_relative_eq!(dx[2], 0.5 * (1.0 - 0.5));
        assert_relative_eq!(dx[0], -(dx[1] + dx[2]));
    }

    #[test]
    fn test_derivative_adds_dose_rate_and_absorption() {
        let model = Model::subcutaneous(2.0, 1.0, 0.5).unwrap();
        let protocol = Protocol::continuous(10.0, |_t| 3.0).unwrap();
        let system = System::new(&model, &protocol);
        let x = V::from_vec(vec![10.0, 4.0]);
        let mut dx = V::zeros(2);
        system.derivative(1.0, &x, &mut dx).unwrap();

        assert_relative_eq!(dx[0], -5.0);
        assert_relative_eq!(dx[1], 3.0 - 1.0 * 4.0 / 2.0 + 5.0);

        assert!(matches!(
            system.derivative(-1.0, &x, &mut dx),
            Err(DomainError::NegativeTime { .. })
        ));
    }
}
