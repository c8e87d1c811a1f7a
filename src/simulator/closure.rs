use std::cell::RefCell;
use std::rc::Rc;

use diffsol::{
    ConstantOp, LinearOp, NonLinearOp, NonLinearOpJacobian, OdeEquations, OdeEquationsRef, Op,
};

use crate::error::DomainError;
use crate::simulator::{System, M, T, V};

/// First dose rate failure seen while the solver evaluated the right hand side
///
/// The solver traits cannot return errors, so the right hand side records the
/// failure here and the driver checks it after every step.
pub(crate) type Fault = Rc<RefCell<Option<DomainError>>>;

pub struct CompartmentRhs<'a> {
    system: &'a System,
    rate: Option<f64>,
    fault: &'a Fault,
}

impl Op for CompartmentRhs<'_> {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.system.nstates()
    }
    fn nout(&self) -> usize {
        self.system.nstates()
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl NonLinearOp for CompartmentRhs<'_> {
    fn call_inplace(&self, x: &Self::V, t: Self::T, y: &mut Self::V) {
        if let Some(rate) = self.rate {
            self.system.derivative_at_rate(rate, x, y);
        } else if let Err(err) = self.system.derivative(t, x, y) {
            // Poison the step so the solver rejects it
            y.fill(f64::NAN);
            let mut fault = self.fault.borrow_mut();
            if fault.is_none() {
                *fault = Some(err);
            }
        }
    }
}

impl NonLinearOpJacobian for CompartmentRhs<'_> {
    fn jac_mul_inplace(&self, _x: &Self::V, _t: Self::T, v: &Self::V, y: &mut Self::V) {
        self.system.transfer(v, y);
    }
}

pub struct CompartmentMass {
    nstates: usize,
}

impl Op for CompartmentMass {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl LinearOp for CompartmentMass {
    fn gemv_inplace(&self, _x: &Self::V, _t: Self::T, _beta: Self::T, _y: &mut Self::V) {}
}

pub struct CompartmentInit {
    init: V,
}

impl Op for CompartmentInit {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.init.len()
    }
    fn nout(&self) -> usize {
        self.init.len()
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl ConstantOp for CompartmentInit {
    fn call_inplace(&self, _t: Self::T, y: &mut Self::V) {
        y.copy_from(&self.init);
    }
}

pub struct CompartmentRoot {
    nstates: usize,
}

impl Op for CompartmentRoot {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        0
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl NonLinearOp for CompartmentRoot {
    fn call_inplace(&self, _x: &Self::V, _t: Self::T, _y: &mut Self::V) {}
}

pub struct CompartmentOut {
    nstates: usize,
}

impl Op for CompartmentOut {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl NonLinearOp for CompartmentOut {
    fn call_inplace(&self, x: &Self::V, _t: Self::T, y: &mut Self::V) {
        y.copy_from(x);
    }
}

/// Owns an assembled [System] and exposes one integration segment of it to diffsol
///
/// `rate` is the dose rate held over the whole segment, or `None` to evaluate
/// the protocol at every time point.
pub struct CompartmentProblem {
    system: System,
    init: V,
    rate: Option<f64>,
    fault: Fault,
}

impl CompartmentProblem {
    pub(crate) fn new(system: System, init: V, rate: Option<f64>, fault: Fault) -> Self {
        CompartmentProblem {
            system,
            init,
            rate,
            fault,
        }
    }
}

impl Op for CompartmentProblem {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.system.nstates()
    }
    fn nout(&self) -> usize {
        self.system.nstates()
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl<'b> OdeEquationsRef<'b> for CompartmentProblem {
    type Rhs = CompartmentRhs<'b>;
    type Mass = CompartmentMass;
    type Init = CompartmentInit;
    type Root = CompartmentRoot;
    type Out = CompartmentOut;
}

impl OdeEquations for CompartmentProblem {
    fn rhs(&self) -> CompartmentRhs<'_> {
        CompartmentRhs {
            system: &self.system,
            rate: self.rate,
            fault: &self.fault,
        }
    }

    fn mass(&self) -> Option<CompartmentMass> {
        None
    }

    fn init(&self) -> CompartmentInit {
        CompartmentInit {
            init: self.init.clone(),
        }
    }

    fn get_params(&self, _p: &mut V) {}

    fn root(&self) -> Option<CompartmentRoot> {
        None
    }

    fn out(&self) -> Option<CompartmentOut> {
        None
    }

    fn set_params(&mut self, _p: &V) {}
}
