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

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde_derive::{Deserialize, Serialize};

/// Uncorrelated Gaussian measurement noise.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WhiteNoise {
    /// Bias of the noise
    pub mean: f64,
    /// One-sigma about the bias
    pub sigma: f64,
}

impl WhiteNoise {
    /// Zero mean noise of the provided one-sigma.
    pub fn constant_white_noise(sigma: f64) -> Self {
        Self { mean: 0.0, sigma }
    }

    pub fn variance(&self) -> f64 {
        self.sigma * self.sigma
    }

    /// Draws one realization.
    ///
    /// Exactly one standard normal draw is consumed per call, even for a zero sigma, so that the sequence of the
    /// generator does not depend on the noise level.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z: f64 = StandardNormal.sample(rng);
        self.mean + self.sigma * z
    }
}
