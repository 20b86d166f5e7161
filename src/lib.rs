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

/*! # windkessel-estimation

Sequential estimation of the parameters of a three-element Windkessel (proximal resistance, compliance and distal
resistance) from a noisy pressure trace driven by a known inflow waveform.

Two engines are provided, an ensemble Kalman filter and an unscented Kalman filter. Both estimate the parameters as
log2 ratios to a baseline guess, and both publish one immutable estimate per measurement.
*/

/// Provides the discretized Windkessel forward model and its parametrization.
pub mod dynamics;

/// Provides the inflow waveform generation.
pub mod waveform;

/// Utility functions shared by different modules, mostly covariance handling.
pub mod utils;

mod errors;
/// Functions which may fail will return one of these errors.
pub use self::errors::{DomainError, EstimationError, InputError};

/// All the estimation tools: filters, estimates, noise models, and the estimation process.
pub mod od;

/// Random sampling module
pub mod mc;

#[macro_use]
extern crate log;
extern crate nalgebra as na;

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export some useful things
pub use self::dynamics::{simulate_series, step_pressure, Baseline, Windkessel, WindkesselParams};
pub use self::waveform::{tile_waveform, FlowPair, Waveform};
