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

use crate::errors::{DomainError, InputError, InvalidParameterSnafu, NonPositivePressureSnafu};
use crate::linalg::Vector3;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;
use typed_builder::TypedBuilder;

/// The discretized three-element Windkessel forward model.
pub mod windkessel;
pub use self::windkessel::*;

/// Physical parameters of a three-element Windkessel: proximal resistance, compliance and distal resistance.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindkesselParams {
    /// Proximal resistance (dyne·s/cm⁵)
    pub rp: f64,
    /// Compliance (cm⁵/dyne)
    pub c: f64,
    /// Distal resistance (dyne·s/cm⁵)
    pub rd: f64,
}

impl WindkesselParams {
    pub fn new(rp: f64, c: f64, rd: f64) -> Self {
        Self { rp, c, rd }
    }

    /// Relaxation time constant τ = Rd·C, in seconds.
    pub fn tau(&self) -> f64 {
        self.rd * self.c
    }

    pub fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.rp, self.c, self.rd)
    }

    /// Returns the relative error of each parameter with respect to the provided reference, ordered as (Rp, C, Rd).
    pub fn relative_error(&self, reference: &Self) -> Vector3<f64> {
        (self.as_vector() - reference.as_vector()).component_div(&reference.as_vector())
    }
}

impl fmt::Display for WindkesselParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Rp = {:.3} dyne·s/cm⁵\tC = {:.3e} cm⁵/dyne\tRd = {:.3} dyne·s/cm⁵",
            self.rp, self.c, self.rd
        )
    }
}

/// Reference values about which the filters estimate log-base-2 ratios.
///
/// A physical quantity is represented as `baseline · 2^θ`, which keeps it positive for any real θ
/// and makes multiplicative uncertainty additive.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct Baseline {
    /// Reference pressure, also used as the initial pressure guess (dyne/cm²)
    #[builder(default = 80_000.0)]
    pub pressure: f64,
    #[builder(default = 1_000.0)]
    pub rp: f64,
    #[builder(default = 1e-5)]
    pub c: f64,
    #[builder(default = 12_000.0)]
    pub rd: f64,
}

impl Default for Baseline {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Baseline {
    /// Initializes a baseline from the parameter guesses and the reference pressure.
    pub fn new(pressure: f64, guess: WindkesselParams) -> Self {
        Self {
            pressure,
            rp: guess.rp,
            c: guess.c,
            rd: guess.rd,
        }
    }

    /// The parameter guesses, i.e. the physical parameters at θ = 0.
    pub fn params(&self) -> WindkesselParams {
        WindkesselParams::new(self.rp, self.c, self.rd)
    }

    /// Maps log-ratio offsets (Rp, C, Rd) to physical parameters.
    pub fn to_params(&self, theta: &Vector3<f64>) -> WindkesselParams {
        WindkesselParams {
            rp: self.rp * theta[0].exp2(),
            c: self.c * theta[1].exp2(),
            rd: self.rd * theta[2].exp2(),
        }
    }

    /// Maps physical parameters to their log-ratio offsets from this baseline.
    pub fn to_log_ratio(&self, params: &WindkesselParams) -> Vector3<f64> {
        Vector3::new(
            (params.rp / self.rp).log2(),
            (params.c / self.c).log2(),
            (params.rd / self.rd).log2(),
        )
    }

    pub fn pressure_from_log_ratio(&self, ratio: f64) -> f64 {
        self.pressure * ratio.exp2()
    }

    pub fn pressure_log_ratio(&self, pressure: f64) -> Result<f64, DomainError> {
        ensure!(
            pressure > 0.0 && pressure.is_finite(),
            NonPositivePressureSnafu { pressure }
        );
        Ok((pressure / self.pressure).log2())
    }

    pub(crate) fn validate(&self) -> Result<(), InputError> {
        for (param, value) in [
            ("baseline pressure", self.pressure),
            ("baseline Rp", self.rp),
            ("baseline C", self.c),
            ("baseline Rd", self.rd),
        ] {
            ensure!(
                value > 0.0 && value.is_finite(),
                InvalidParameterSnafu { param, value }
            );
        }
        Ok(())
    }
}
