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

use super::WindkesselParams;
use crate::errors::{DomainError, InputError, InvalidParameterSnafu, NonPositiveTimeConstantSnafu};
use crate::waveform::FlowPair;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;

/// Three-element Windkessel discretized with a fixed time step.
///
/// The pressure relaxes towards the distal steady state with time constant τ = Rd·C:
///
/// p_next = p_prev·(1 − Δt/τ) + Rp·(Q_curr − Q_prev) + Q_curr·(Rd + Rp)·Δt/τ
///
/// This is both the data generator of the synthetic experiments and the process model of every filter.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Windkessel {
    /// Sampling period Δt in seconds, constant over a run.
    pub step: f64,
}

impl Windkessel {
    pub fn new(step: f64) -> Result<Self, InputError> {
        ensure!(
            step > 0.0 && step.is_finite(),
            InvalidParameterSnafu {
                param: "time step",
                value: step
            }
        );
        Ok(Self { step })
    }

    /// Advances the pressure by one step under the provided flow pair.
    pub fn step_pressure(
        &self,
        p_prev: f64,
        flow: FlowPair,
        params: &WindkesselParams,
    ) -> Result<f64, DomainError> {
        let tau = params.tau();
        ensure!(
            tau > 0.0 && tau.is_finite(),
            NonPositiveTimeConstantSnafu { tau }
        );
        let ratio = self.step / tau;
        Ok(p_prev * (1.0 - ratio)
            + params.rp * (flow.curr - flow.prev)
            + flow.curr * (params.rd + params.rp) * ratio)
    }

    /// Folds [`Self::step_pressure`] over a whole flow series starting from `p0`.
    ///
    /// The first sample has no predecessor and uses itself as previous flow (zero initial flow derivative).
    pub fn simulate_series(
        &self,
        flow: &[f64],
        params: &WindkesselParams,
        p0: f64,
    ) -> Result<Vec<f64>, DomainError> {
        let mut pressures = Vec::with_capacity(flow.len());
        let mut p = p0;
        for (index, curr) in flow.iter().enumerate() {
            let prev = if index == 0 { *curr } else { flow[index - 1] };
            p = self.step_pressure(p, FlowPair::new(prev, *curr), params)?;
            pressures.push(p);
        }
        Ok(pressures)
    }
}

/// Single step of the discretized Windkessel, see [`Windkessel::step_pressure`].
#[allow(clippy::too_many_arguments)]
pub fn step_pressure(
    p_prev: f64,
    flow_prev: f64,
    flow_curr: f64,
    dt: f64,
    rp: f64,
    c: f64,
    rd: f64,
) -> Result<f64, DomainError> {
    Windkessel { step: dt }.step_pressure(
        p_prev,
        FlowPair::new(flow_prev, flow_curr),
        &WindkesselParams::new(rp, c, rd),
    )
}

/// Pressure trajectory of a whole flow series, see [`Windkessel::simulate_series`].
pub fn simulate_series(
    flow: &[f64],
    dt: f64,
    rp: f64,
    c: f64,
    rd: f64,
    p0: f64,
) -> Result<Vec<f64>, DomainError> {
    Windkessel { step: dt }.simulate_series(flow, &WindkesselParams::new(rp, c, rd), p0)
}
