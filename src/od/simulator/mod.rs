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
use typed_builder::TypedBuilder;

use crate::dynamics::{Windkessel, WindkesselParams};
use crate::errors::{EstimationError, InputError};
use crate::mc::rng_from_seed;
use crate::od::noise::{ObservationNoise, WhiteNoise};
use crate::waveform::{tile_waveform, GaussianPulse, Waveform};

/// Reference experiment: a Gaussian inflow pulse tiled over several cycles drives the forward model with known
/// parameters, and the resulting pressure trace is corrupted by white noise.
///
/// The defaults reproduce the reference case, where the filters start from Rp = 1000, C = 1e-5, Rd = 12000.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct SyntheticScenario {
    /// Parameters generating the clean pressure trace
    #[builder(default = WindkesselParams::new(1_600.0, 2.5e-5, 13_000.0))]
    pub truth: WindkesselParams,
    /// Pressure before the first sample (dyne/cm²)
    #[builder(default = 80_000.0)]
    pub initial_pressure: f64,
    #[builder(default)]
    pub pulse: GaussianPulse,
    /// Cardiac period, in seconds
    #[builder(default = 0.8)]
    pub period: f64,
    /// Sampling period, in seconds
    #[builder(default = 0.005)]
    pub step: f64,
    #[builder(default = 10)]
    pub cycles: usize,
    /// One-sigma of the additive measurement noise (dyne/cm²)
    #[builder(default = 1_600.0)]
    pub noise_sigma: f64,
}

impl Default for SyntheticScenario {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Clean and noisy pressure traces of a [`SyntheticScenario`].
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticData {
    pub waveform: Waveform,
    pub model: Windkessel,
    /// Parameters which generated `truth`
    pub params: WindkesselParams,
    /// Clean pressure at each sample
    pub truth: Vec<f64>,
    /// Noisy pressure at each sample
    pub measurements: Vec<f64>,
}

impl SyntheticScenario {
    /// Tiled inflow waveform of the scenario.
    pub fn waveform(&self) -> Result<Waveform, InputError> {
        let (time, values) = self.pulse.features(self.period, self.step)?;
        tile_waveform(&time, &values, self.cycles, self.period)
    }

    pub fn model(&self) -> Result<Windkessel, InputError> {
        Windkessel::new(self.step)
    }

    /// Simulates the clean trace and draws its measurements.
    pub fn generate(&self, seed: Option<u64>) -> Result<SyntheticData, EstimationError> {
        let waveform = self.waveform()?;
        let model = self.model()?;
        let truth = model.simulate_series(&waveform.flow, &self.truth, self.initial_pressure)?;

        let noise = WhiteNoise::constant_white_noise(self.noise_sigma);
        let mut rng = rng_from_seed(seed);
        let measurements = truth.iter().map(|p| p + noise.sample(&mut rng)).collect();

        info!(
            "Generated {} samples with {} (noise sigma {})",
            truth.len(),
            self.truth,
            self.noise_sigma
        );

        Ok(SyntheticData {
            waveform,
            model,
            params: self.truth,
            truth,
            measurements,
        })
    }
}

impl SyntheticData {
    pub fn len(&self) -> usize {
        self.truth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.truth.is_empty()
    }

    /// Observation noise sized as a fraction of the clean pressure at each step.
    ///
    /// This is only available in a synthetic setting, where the clean trace is known.
    pub fn reference_noise(&self, fraction: f64) -> ObservationNoise {
        ObservationNoise::Supplied {
            sigmas: self.truth.iter().map(|p| fraction * p.abs()).collect(),
        }
    }
}
