//! Sensitivity of the simulated measurement to the state vector.
//!
//! The Jacobian is built by forward-mode differentiation: one dual-seeded
//! evaluation of the forward model per state element, each yielding one
//! column. Columns are independent, so they run in parallel on the rayon
//! pool. A centered finite-difference path is kept alongside as the
//! validation reference.

use ndarray::Array2;
use rayon::prelude::*;

use crate::dual::Dual;
use crate::error::Result;
use crate::forward::{ForwardModel, StateVector};

/// Computes ∂(simulated measurement)/∂(state vector).
#[derive(Debug)]
pub struct JacobianEngine<'a, 'b> {
    model: &'a ForwardModel<'b>,
}

impl<'a, 'b> JacobianEngine<'a, 'b> {
    /// Bind the engine to a forward model.
    pub fn new(model: &'a ForwardModel<'b>) -> Self {
        Self { model }
    }

    /// The Jacobian at `state` via dual numbers.
    ///
    /// Row i, column j is ∂output[i]/∂state[j] in the flattening order of
    /// [`StateVector::flatten`]. Runs one forward evaluation per state
    /// element.
    pub fn jacobian(&self, state: &StateVector) -> Result<Array2<f64>> {
        self.model.check_state(state)?;
        let layers = state.num_layers();
        let gases = state.num_gases();
        let vmr_len = layers * gases;
        let n_state = state.len();

        let columns: Vec<Vec<f64>> = (0..n_state)
            .into_par_iter()
            .map(|seed| -> Result<Vec<f64>> {
                // Lift the state into duals with element `seed` as the
                // variable; the flat index convention matches flatten().
                let vmr = Array2::from_shape_fn((layers, gases), |(l, g)| {
                    let value = state.vmr()[[l, g]];
                    if g * layers + l == seed {
                        Dual::variable(value)
                    } else {
                        Dual::constant(value)
                    }
                });
                let poly: Vec<Dual> = state
                    .poly()
                    .iter()
                    .enumerate()
                    .map(|(k, &c)| {
                        if vmr_len + k == seed {
                            Dual::variable(c)
                        } else {
                            Dual::constant(c)
                        }
                    })
                    .collect();

                let out = self.model.evaluate(&vmr, &poly)?;
                Ok(out.into_iter().map(|d| d.deriv).collect())
            })
            .collect::<Result<_>>()?;

        let out_len = columns.first().map_or(0, Vec::len);
        let mut jacobian = Array2::zeros((out_len, n_state));
        for (j, column) in columns.iter().enumerate() {
            for (i, &value) in column.iter().enumerate() {
                jacobian[[i, j]] = value;
            }
        }
        Ok(jacobian)
    }

    /// The Jacobian at `state` via centered finite differences.
    ///
    /// The step for element j is `rel_step·|state[j]|`, falling back to
    /// `rel_step` itself for zero entries. Kept as the validation path for
    /// the dual-number Jacobian; note that VMR entries near zero cannot be
    /// perturbed downward without leaving the valid state space, so states
    /// probed this way should sit inside the domain.
    pub fn jacobian_fd(&self, state: &StateVector, rel_step: f64) -> Result<Array2<f64>> {
        self.model.check_state(state)?;
        let layers = state.num_layers();
        let gases = state.num_gases();
        let degree = state.polynomial_degree();
        let flat = state.flatten();
        let n_state = flat.len();

        let columns: Vec<Vec<f64>> = (0..n_state)
            .into_par_iter()
            .map(|j| -> Result<Vec<f64>> {
                let x = flat[j];
                let step = if x != 0. { rel_step * x.abs() } else { rel_step };

                let mut plus = flat.to_vec();
                plus[j] = x + step;
                let mut minus = flat.to_vec();
                minus[j] = x - step;

                let plus =
                    StateVector::from_flat(&plus, layers, gases, degree)?;
                let minus =
                    StateVector::from_flat(&minus, layers, gases, degree)?;

                let f_plus = self.model.simulate(&plus)?;
                let f_minus = self.model.simulate(&minus)?;
                Ok(f_plus
                    .iter()
                    .zip(f_minus.iter())
                    .map(|(p, m)| (p - m) / (2. * step))
                    .collect())
            })
            .collect::<Result<_>>()?;

        let out_len = columns.first().map_or(0, Vec::len);
        let mut jacobian = Array2::zeros((out_len, n_state));
        for (j, column) in columns.iter().enumerate() {
            for (i, &value) in column.iter().enumerate() {
                jacobian[[i, j]] = value;
            }
        }
        Ok(jacobian)
    }
}
