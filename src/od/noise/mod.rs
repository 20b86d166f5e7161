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

use crate::errors::{InputError, InvalidParameterSnafu, TooFewSamplesSnafu};
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;

pub mod white;
pub use white::WhiteNoise;

/// How the ensemble filter sizes the one-sigma observation noise at each step.
///
/// There is deliberately no default: sizing the noise from the clean signal is only possible in a synthetic
/// harness, so the caller must state which model applies to its data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObservationNoise {
    /// Fixed one-sigma, in pressure units.
    Constant { sigma: f64 },
    /// One-sigma as a fraction of the magnitude of each measurement.
    ProportionalToMeasurement { fraction: f64 },
    /// One-sigma supplied for every step, e.g. estimated externally or sized from a known reference signal.
    Supplied { sigmas: Vec<f64> },
}

impl ObservationNoise {
    /// One-sigma of the observation noise of step `step`, which observed `measurement`.
    pub fn sigma(&self, step: usize, measurement: f64) -> Result<f64, InputError> {
        match self {
            Self::Constant { sigma } => Ok(*sigma),
            Self::ProportionalToMeasurement { fraction } => Ok(fraction * measurement.abs()),
            Self::Supplied { sigmas } => sigmas.get(step).copied().ok_or(InputError::TooFewSamples {
                what: "supplied observation noise",
                need: step + 1,
                got: sigmas.len(),
            }),
        }
    }

    /// Ensures that every sigma is finite and non-negative, and that a supplied series covers `steps` steps.
    pub fn validate(&self, steps: Option<usize>) -> Result<(), InputError> {
        match self {
            Self::Constant { sigma } => ensure!(
                *sigma >= 0.0 && sigma.is_finite(),
                InvalidParameterSnafu {
                    param: "observation noise sigma",
                    value: *sigma
                }
            ),
            Self::ProportionalToMeasurement { fraction } => ensure!(
                *fraction >= 0.0 && fraction.is_finite(),
                InvalidParameterSnafu {
                    param: "observation noise fraction",
                    value: *fraction
                }
            ),
            Self::Supplied { sigmas } => {
                if let Some(bad) = sigmas.iter().find(|s| !(**s >= 0.0 && s.is_finite())) {
                    return InvalidParameterSnafu {
                        param: "observation noise sigma",
                        value: *bad,
                    }
                    .fail();
                }
                if let Some(steps) = steps {
                    ensure!(
                        sigmas.len() >= steps,
                        TooFewSamplesSnafu {
                            what: "supplied observation noise",
                            need: steps,
                            got: sigmas.len()
                        }
                    );
                }
            }
        }
        Ok(())
    }
}
