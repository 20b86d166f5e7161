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

use rand_distr::{Distribution, StandardNormal};

use crate::errors::{CovarianceNotPsdSnafu, InputError};
use crate::linalg::{Matrix3, Vector3};
use crate::utils::{is_positive_semi_definite, PSD_TOLERANCE};
use snafu::{ensure, OptionExt};

/// A multivariate normal distribution over the three log-ratio Windkessel parameters.
///
/// Draws the ensemble prior and the random-walk process noise of the ensemble filter.
#[derive(Clone, Debug, PartialEq)]
pub struct MultivariateNormal {
    /// The mean of the multivariate normal distribution
    pub mean: Vector3<f64>,
    /// The product V·√S of the SVD of the covariance, such that (V·√S)(V·√S)ᵀ is the covariance
    pub sqrt_s_v: Matrix3<f64>,
}

impl MultivariateNormal {
    /// Creates a new distribution from a mean and a covariance.
    /// The covariance must be positive semi definite. The algorithm is the one from numpy
    /// <https://github.com/numpy/numpy/blob/6c16f23c30fe490422959d30c2e22345211a2fe3/numpy/random/mtrand.pyx#L3979>
    pub fn new(mean: Vector3<f64>, cov: Matrix3<f64>) -> Result<Self, InputError> {
        ensure!(
            is_positive_semi_definite(&cov, PSD_TOLERANCE),
            CovarianceNotPsdSnafu {
                what: "multivariate normal"
            }
        );

        let svd = cov.svd_unordered(false, true);
        let v_t = svd.v_t.context(CovarianceNotPsdSnafu {
            what: "multivariate normal",
        })?;

        let sqrt_s = svd.singular_values.map(|x| x.sqrt());
        let mut sqrt_s_v = v_t.transpose();
        for (i, mut col) in sqrt_s_v.column_iter_mut().enumerate() {
            col *= sqrt_s[i];
        }

        Ok(Self { mean, sqrt_s_v })
    }

    /// Same as `new` but with a zero mean
    pub fn zero_mean(cov: Matrix3<f64>) -> Result<Self, InputError> {
        Self::new(Vector3::zeros(), cov)
    }

    /// Same as `zero_mean` with a diagonal covariance
    pub fn from_variances(variances: [f64; 3]) -> Result<Self, InputError> {
        Self::zero_mean(Matrix3::from_diagonal(&Vector3::from(variances)))
    }
}

impl Distribution<Vector3<f64>> for MultivariateNormal {
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Vector3<f64> {
        let x_rng = Vector3::from_fn(|_, _| StandardNormal.sample(rng));
        self.sqrt_s_v * x_rng + self.mean
    }
}
