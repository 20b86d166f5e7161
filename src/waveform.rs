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

use crate::errors::{
    InputError, InvalidParameterSnafu, LengthMismatchSnafu, NonUniformStepSnafu, TooFewSamplesSnafu,
};
use approx::relative_eq;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use typed_builder::TypedBuilder;

/// Relative tolerance on the spacing of consecutive time samples.
const STEP_TOLERANCE: f64 = 1e-6;

/// Inflow at the previous and at the current sample of a step.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowPair {
    pub prev: f64,
    pub curr: f64,
}

impl FlowPair {
    pub fn new(prev: f64, curr: f64) -> Self {
        Self { prev, curr }
    }

    /// Returns the flow pair of sample `index` of the series, or None past its end.
    ///
    /// The first sample has no predecessor: it is its own previous flow, i.e. the initial flow derivative is zero.
    pub fn at(series: &[f64], index: usize) -> Option<Self> {
        let curr = *series.get(index)?;
        let prev = match index {
            0 => curr,
            _ => series[index - 1],
        };
        Some(Self { prev, curr })
    }
}

/// A flow-rate forcing signal, uniformly sampled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    /// Sample times in seconds
    pub time: Vec<f64>,
    /// Volumetric flow rate at each sample time
    pub flow: Vec<f64>,
}

impl Waveform {
    pub fn new(time: Vec<f64>, flow: Vec<f64>) -> Result<Self, InputError> {
        ensure!(
            time.len() == flow.len(),
            LengthMismatchSnafu {
                what: "flow series",
                expected: time.len(),
                got: flow.len()
            }
        );
        Ok(Self { time, flow })
    }

    pub fn len(&self) -> usize {
        self.flow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flow.is_empty()
    }

    /// Returns the sampling period, ensuring that every pair of consecutive samples is spaced by it.
    pub fn step(&self) -> Result<f64, InputError> {
        ensure!(
            self.time.len() >= 2,
            TooFewSamplesSnafu {
                what: "sampling period",
                need: 2_usize,
                got: self.time.len()
            }
        );
        let expected = self.time[1] - self.time[0];
        ensure!(
            expected > 0.0,
            InvalidParameterSnafu {
                param: "time step",
                value: expected
            }
        );
        for (index, pair) in self.time.windows(2).enumerate().skip(1) {
            let step = pair[1] - pair[0];
            ensure!(
                relative_eq!(step, expected, max_relative = STEP_TOLERANCE),
                NonUniformStepSnafu {
                    index,
                    step,
                    expected
                }
            );
        }
        Ok(expected)
    }

    /// Flow pair driving step `index`, see [`FlowPair::at`].
    pub fn flow_pair(&self, index: usize) -> Option<FlowPair> {
        FlowPair::at(&self.flow, index)
    }
}

/// Repeats one period of feature points over `cycles` periods, without cycle to cycle variability.
///
/// The k-th output time is `n·period + time_features[k mod len]` where `n` is the cycle index of sample k.
pub fn tile_waveform(
    time_features: &[f64],
    value_features: &[f64],
    cycles: usize,
    period: f64,
) -> Result<Waveform, InputError> {
    ensure!(
        time_features.len() == value_features.len(),
        LengthMismatchSnafu {
            what: "value features",
            expected: time_features.len(),
            got: value_features.len()
        }
    );
    ensure!(
        !time_features.is_empty(),
        TooFewSamplesSnafu {
            what: "waveform features",
            need: 1_usize,
            got: 0_usize
        }
    );
    ensure!(
        cycles > 0,
        TooFewSamplesSnafu {
            what: "cycle count",
            need: 1_usize,
            got: cycles
        }
    );
    ensure!(
        period > 0.0 && period.is_finite(),
        InvalidParameterSnafu {
            param: "period",
            value: period
        }
    );

    let time = (0..cycles)
        .flat_map(|n| time_features.iter().map(move |t| n as f64 * period + t))
        .collect();
    let flow = value_features.repeat(cycles);

    Ok(Waveform { time, flow })
}

/// A Gaussian flow pulse on top of a constant offset: `offset + amplitude·exp(−(t−μ)²/(2σ²))`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct GaussianPulse {
    #[builder(default = 10.0)]
    pub amplitude: f64,
    #[builder(default = 5.0)]
    pub offset: f64,
    /// Time of peak flow within the period, in seconds
    #[builder(default = 0.35)]
    pub mu: f64,
    /// Pulse width, in seconds
    #[builder(default = 0.05)]
    pub sigma: f64,
}

impl Default for GaussianPulse {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GaussianPulse {
    pub fn value(&self, t: f64) -> f64 {
        self.offset + self.amplitude * (-(t - self.mu).powi(2) / (2.0 * self.sigma.powi(2))).exp()
    }

    /// Samples one period at `t = 0, Δt, 2Δt, …` strictly before `period`, returning (time, value) features.
    pub fn features(&self, period: f64, step: f64) -> Result<(Vec<f64>, Vec<f64>), InputError> {
        ensure!(
            step > 0.0 && step.is_finite(),
            InvalidParameterSnafu {
                param: "time step",
                value: step
            }
        );
        ensure!(
            period >= step && period.is_finite(),
            InvalidParameterSnafu {
                param: "period",
                value: period
            }
        );
        let ratio = period / step;
        // Guard against the quotient landing a hair above an integer
        let count = if relative_eq!(ratio, ratio.round(), max_relative = 1e-9) {
            ratio.round() as usize
        } else {
            ratio.ceil() as usize
        };

        let time: Vec<f64> = (0..count).map(|k| k as f64 * step).collect();
        let values = time.iter().map(|t| self.value(*t)).collect();
        Ok((time, values))
    }
}
