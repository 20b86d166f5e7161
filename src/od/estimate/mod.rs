/*
    Windkessel estimation, sequential parameter estimation of lumped arterial models
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::dynamics::{Baseline, WindkesselParams};
use crate::errors::EstimationError;
use crate::linalg::Vector3;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

mod divergence;
pub use divergence::{DivergenceKind, FilterDivergence};

/// The estimation engine which produced a record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    Ensemble,
    Unscented,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ensemble => write!(f, "EnKF"),
            Self::Unscented => write!(f, "UKF"),
        }
    }
}

/// Result of a time update: the parameter belief after the random walk and the predicted pressure.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Index of the measurement this prediction will be compared to
    pub step: usize,
    /// Predicted pressure (dyne/cm²)
    pub pressure: f64,
    /// One-sigma of the predicted pressure (dyne/cm²)
    pub pressure_std: f64,
    /// Predicted log-ratio parameters (Rp, C, Rd)
    pub theta: Vector3<f64>,
    /// Variance of the predicted log-ratio parameters
    pub theta_var: Vector3<f64>,
}

/// Immutable snapshot published by a filter after ingesting the measurement of one step.
#[derive(Clone, Debug, PartialEq)]
pub struct StepEstimate {
    /// Index of the ingested measurement
    pub step: usize,
    pub kind: FilterKind,
    /// Reference values about which `theta` is expressed
    pub baseline: Baseline,
    /// Posterior log-ratio parameters (Rp, C, Rd)
    pub theta: Vector3<f64>,
    /// Posterior variance of `theta`
    pub theta_var: Vector3<f64>,
    /// Pressure estimate (dyne/cm²)
    pub pressure: f64,
    /// One-sigma of the pressure estimate (dyne/cm²)
    pub pressure_std: f64,
    /// Ingested measurement (dyne/cm²)
    pub measurement: f64,
    /// Measurement minus predicted observation, in the filter's observation space
    pub prefit: f64,
    /// Innovation variance used in the gain, after flooring, in the filter's observation space
    pub innovation_var: f64,
    /// Regularizations applied while computing this estimate
    pub divergences: Vec<FilterDivergence>,
}

impl StepEstimate {
    /// Physical parameters at the posterior mean.
    pub fn params(&self) -> WindkesselParams {
        self.baseline.to_params(&self.theta)
    }

    /// One-sigma of the log-ratio parameters.
    pub fn theta_std(&self) -> Vector3<f64> {
        self.theta_var.map(|v| v.max(0.0).sqrt())
    }

    /// Returns the physical uncertainty band `baseline·2^(θ ± k·σ)` as (lower, upper).
    ///
    /// The band is asymmetric in physical units since the parametrization is multiplicative.
    pub fn param_bounds(&self, k: f64) -> (WindkesselParams, WindkesselParams) {
        let delta = self.theta_std() * k;
        (
            self.baseline.to_params(&(self.theta - delta)),
            self.baseline.to_params(&(self.theta + delta)),
        )
    }

    /// Whether any regularization was required, i.e. this estimate should not be treated as converged.
    pub fn is_degraded(&self) -> bool {
        !self.divergences.is_empty()
    }

    pub(crate) fn ensure_finite(self) -> Result<Self, EstimationError> {
        let finite = self.theta.iter().chain(self.theta_var.iter()).all(|v| v.is_finite())
            && self.pressure.is_finite()
            && self.pressure_std.is_finite()
            && self.innovation_var.is_finite();
        if finite {
            Ok(self)
        } else {
            Err(EstimationError::NonFiniteEstimate { step: self.step })
        }
    }
}

impl fmt::Display for StepEstimate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sigmas = self.theta_std();
        write!(
            f,
            "=== {} estimate #{}{} ===\n{}\nlog2 sigmas [{:e}, {:e}, {:e}]\npressure {:.3} ± {:.3} (measured {:.3})",
            self.kind,
            self.step,
            if self.is_degraded() { " (degraded)" } else { "" },
            self.params(),
            sigmas[0],
            sigmas[1],
            sigmas[2],
            self.pressure,
            self.pressure_std,
            self.measurement
        )
    }
}
