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

pub mod filter;
pub use filter::Filter;

/// Provides the per-step records published by the filters.
pub mod estimate;

/// Provides noise modeling
pub mod noise;

/// Provides the synthetic reference experiment
pub mod simulator;

/// Provides the interfaces to the estimation process
pub mod process;

#[allow(unused_imports)]
pub mod prelude {
    pub use super::estimate::*;
    pub use super::filter::*;
    pub use super::noise::{ObservationNoise, WhiteNoise};
    pub use super::process::*;
    pub use super::simulator::*;
    pub use crate::dynamics::{Baseline, Windkessel, WindkesselParams};
    pub use crate::waveform::*;
    pub use crate::{DomainError, EstimationError, InputError};
}
