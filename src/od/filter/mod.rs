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

use crate::dynamics::Windkessel;
use crate::errors::{EstimationError, InputError};
use crate::waveform::FlowPair;

use super::estimate::{FilterKind, Prediction, StepEstimate};

pub mod enkf;
pub mod ukf;

pub use enkf::{EnsembleConfig, EnsembleKF};
pub use ukf::{SigmaWeights, UnscentedConfig, UnscentedKF};

/// Step-wise contract shared by the estimation engines.
///
/// A filter exclusively owns its working state. Each step is a time update (`predict`) driven by the flow pair of
/// the step, followed by a measurement update (`update`) against the pressure measured at that step.
pub trait Filter {
    /// Which engine this is.
    fn kind(&self) -> FilterKind;

    /// The forward model, and therefore the time step, this filter propagates with.
    fn model(&self) -> &Windkessel;

    /// Number of measurements ingested so far, i.e. the index of the next step.
    fn steps_completed(&self) -> usize;

    /// Checks that the filter's own inputs cover a run of `steps` measurements.
    fn validate_run(&self, _steps: usize) -> Result<(), InputError> {
        Ok(())
    }

    /// Computes a time update: applies the parameter random walk and propagates the pressure through the forward model.
    ///
    /// Calling `predict` twice without an `update` in between propagates twice.
    fn predict(&mut self, flow: FlowPair) -> Result<Prediction, EstimationError>;

    /// Computes the measurement update of the pending prediction with the provided pressure measurement.
    ///
    /// Returns an error if no prediction is pending.
    fn update(&mut self, measurement: f64) -> Result<StepEstimate, EstimationError>;

    /// Predicts then updates.
    fn step(&mut self, flow: FlowPair, measurement: f64) -> Result<StepEstimate, EstimationError> {
        self.predict(flow)?;
        self.update(measurement)
    }
}
