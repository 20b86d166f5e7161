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

use snafu::prelude::*;

/// Errors raised while validating the inputs of an estimation run. These are never recoverable.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InputError {
    #[snafu(display("{what} has {got} samples but {expected} were expected"))]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[snafu(display("time step #{index} is {step} s but the series is sampled every {expected} s"))]
    NonUniformStep {
        index: usize,
        step: f64,
        expected: f64,
    },
    #[snafu(display("waveform is sampled every {waveform} s but the model steps by {model} s"))]
    StepMismatch { waveform: f64, model: f64 },
    #[snafu(display("{what} requires at least {need} samples, got {got}"))]
    TooFewSamples {
        what: &'static str,
        need: usize,
        got: usize,
    },
    #[snafu(display("an ensemble of {size} members cannot estimate a covariance (need at least 2)"))]
    EnsembleTooSmall { size: usize },
    #[snafu(display("invalid {param}: {value}"))]
    InvalidParameter { param: &'static str, value: f64 },
    #[snafu(display("{what} covariance is not positive semi-definite"))]
    CovarianceNotPsd { what: &'static str },
    #[snafu(display("measurement #{step} ({value}) is not a positive finite pressure"))]
    InvalidMeasurement { step: usize, value: f64 },
}

/// Errors raised by the forward model when the physics are ill-posed.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DomainError {
    #[snafu(display("time constant Rd·C = {tau} must be strictly positive"))]
    NonPositiveTimeConstant { tau: f64 },
    #[snafu(display("pressure {pressure} has no log-ratio representation"))]
    NonPositivePressure { pressure: f64 },
}

/// Errors which abort an estimation run.
///
/// A near-singular innovation or state covariance is _not_ an error: it is regularized and reported as a
/// [`FilterDivergence`](crate::od::estimate::FilterDivergence) on the step's estimate.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EstimationError {
    #[snafu(context(false), display("estimation aborted on invalid input: {source}"))]
    Input { source: InputError },
    #[snafu(context(false), display("estimation aborted in the forward model: {source}"))]
    Domain { source: DomainError },
    #[snafu(display("a prediction must precede every measurement update"))]
    PredictionRequired,
    #[snafu(display("estimate of step #{step} is not finite"))]
    NonFiniteEstimate { step: usize },
}
