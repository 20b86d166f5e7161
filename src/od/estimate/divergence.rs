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

use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Which quantity had to be regularized.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DivergenceKind {
    /// The innovation (predicted observation) variance fell below the floor and was raised to it.
    InnovationVariance,
    /// The state covariance was not positive definite and its eigenvalues were clamped to the floor.
    StateCovariance,
}

/// A recoverable numerical breakdown, reported alongside the degraded estimate rather than raised.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterDivergence {
    pub step: usize,
    pub kind: DivergenceKind,
    /// Offending value: the raw innovation variance, or the smallest eigenvalue of the state covariance
    pub value: f64,
    /// Value it was regularized to
    pub floor: f64,
}

impl fmt::Display for FilterDivergence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let what = match self.kind {
            DivergenceKind::InnovationVariance => "innovation variance",
            DivergenceKind::StateCovariance => "state covariance eigenvalue",
        };
        write!(
            f,
            "step #{}: {} {:e} regularized to {:e}",
            self.step, what, self.value, self.floor
        )
    }
}
