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

use rand_distr::Distribution;
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;
use typed_builder::TypedBuilder;

use super::Filter;
use crate::dynamics::{Baseline, Windkessel};
use crate::errors::{
    DomainError, EnsembleTooSmallSnafu, EstimationError, InputError, InvalidParameterSnafu,
};
use crate::linalg::{Matrix3, Vector3};
use crate::mc::{rng_from_seed, MultivariateNormal, Pcg64Mcg};
use crate::od::estimate::{DivergenceKind, FilterDivergence, FilterKind, Prediction, StepEstimate};
use crate::od::noise::{ObservationNoise, WhiteNoise};
use crate::utils::{
    mean, mean_vector, population_std, population_variance, sample_covariance, sample_variance,
    VARIANCE_FLOOR,
};
use crate::waveform::FlowPair;

/// Configuration of the ensemble Kalman filter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct EnsembleConfig {
    /// Number of ensemble members, at least two
    #[builder(default = 100)]
    pub size: usize,
    /// Diagonal of the prior covariance of the log-ratio parameters
    #[builder(default = [0.25; 3])]
    pub init_spread: [f64; 3],
    /// Diagonal of the covariance of the parameter random walk, per step
    #[builder(default = [1e-4; 3])]
    pub process_noise: [f64; 3],
    /// How the observation perturbations are sized
    pub observation_noise: ObservationNoise,
    /// Pressure shared by all members before the first step, defaults to the baseline pressure
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub initial_pressure: Option<f64>,
    /// Seed of the filter's generator, drawn from system entropy if unset
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Members propagated by the latest time update, awaiting their measurement.
#[derive(Clone, Debug)]
struct Forecast {
    step: usize,
    pressures: Vec<f64>,
}

/// Stochastic ensemble Kalman filter over the log-ratio Windkessel parameters.
///
/// Each member carries its own parameters and pressure. The parameters follow a random walk and the pressure is
/// propagated through the forward model. The measurement update uses perturbed observations: every member is
/// corrected against its own noisy copy of the measurement, which keeps the posterior spread unbiased.
#[derive(Clone, Debug)]
pub struct EnsembleKF {
    baseline: Baseline,
    model: Windkessel,
    observation_noise: ObservationNoise,
    process_noise: MultivariateNormal,
    members: Vec<Vector3<f64>>,
    pressures: Vec<f64>,
    forecast: Option<Forecast>,
    steps: usize,
    rng: Pcg64Mcg,
}

impl EnsembleKF {
    /// Draws the initial ensemble about the baseline (θ = 0) with the configured prior spread.
    pub fn new(
        baseline: Baseline,
        model: Windkessel,
        config: EnsembleConfig,
    ) -> Result<Self, InputError> {
        baseline.validate()?;
        ensure!(config.size >= 2, EnsembleTooSmallSnafu { size: config.size });
        config.observation_noise.validate(None)?;

        let initial_pressure = config.initial_pressure.unwrap_or(baseline.pressure);
        ensure!(
            initial_pressure.is_finite(),
            InvalidParameterSnafu {
                param: "initial pressure",
                value: initial_pressure
            }
        );

        let prior = MultivariateNormal::from_variances(config.init_spread)?;
        let process_noise = MultivariateNormal::from_variances(config.process_noise)?;

        let mut rng = rng_from_seed(config.seed);
        let members = (0..config.size)
            .map(|_| prior.sample(&mut rng))
            .collect::<Vec<_>>();

        info!(
            "EnKF with {} members about {} (prior log2 variances {:?})",
            config.size,
            baseline.params(),
            config.init_spread
        );

        Ok(Self {
            baseline,
            model,
            observation_noise: config.observation_noise,
            process_noise,
            members,
            pressures: vec![initial_pressure; config.size],
            forecast: None,
            steps: 0,
            rng,
        })
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Log-ratio parameters of each member.
    pub fn members(&self) -> &[Vector3<f64>] {
        &self.members
    }

    /// Latest pressure of each member.
    pub fn pressures(&self) -> &[f64] {
        &self.pressures
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn theta_mean(&self) -> Vector3<f64> {
        mean_vector(&self.members)
    }

    /// Spread of the ensemble (population variance), as published in the estimates.
    pub fn theta_var(&self) -> Vector3<f64> {
        population_variance(&self.members, &self.theta_mean())
    }

    /// Unbiased sample covariance of the member parameters.
    pub fn theta_covar(&self) -> Matrix3<f64> {
        sample_covariance(&self.members, &self.theta_mean())
    }
}

impl Filter for EnsembleKF {
    fn kind(&self) -> FilterKind {
        FilterKind::Ensemble
    }

    fn model(&self) -> &Windkessel {
        &self.model
    }

    fn steps_completed(&self) -> usize {
        self.steps
    }

    fn validate_run(&self, steps: usize) -> Result<(), InputError> {
        self.observation_noise.validate(Some(steps))
    }

    fn predict(&mut self, flow: FlowPair) -> Result<Prediction, EstimationError> {
        // Random walk, drawn sequentially so that the generator sequence does not depend on the thread count.
        let members = self
            .members
            .iter()
            .map(|theta| theta + self.process_noise.sample(&mut self.rng))
            .collect::<Vec<_>>();

        let model = self.model;
        let baseline = self.baseline;
        let pressures = self
            .pressures
            .par_iter()
            .zip(members.par_iter())
            .map(|(p_prev, theta)| model.step_pressure(*p_prev, flow, &baseline.to_params(theta)))
            .collect::<Result<Vec<f64>, DomainError>>()?;

        self.members = members;
        self.pressures = pressures.clone();
        self.forecast = Some(Forecast {
            step: self.steps,
            pressures,
        });

        let theta = self.theta_mean();
        let y_mean = mean(&self.pressures);
        Ok(Prediction {
            step: self.steps,
            pressure: y_mean,
            pressure_std: population_std(&self.pressures, y_mean),
            theta,
            theta_var: population_variance(&self.members, &theta),
        })
    }

    fn update(&mut self, measurement: f64) -> Result<StepEstimate, EstimationError> {
        let step = self.steps;
        if !(measurement > 0.0 && measurement.is_finite()) {
            return Err(InputError::InvalidMeasurement {
                step,
                value: measurement,
            }
            .into());
        }
        let sigma = self.observation_noise.sigma(step, measurement)?;
        let forecast = self
            .forecast
            .take()
            .ok_or(EstimationError::PredictionRequired)?;
        debug_assert_eq!(forecast.step, step);

        let size = self.members.len();
        let dof = (size - 1) as f64;
        let y = &forecast.pressures;

        let noise = WhiteNoise::constant_white_noise(sigma);
        let perturbations = (0..size)
            .map(|_| noise.sample(&mut self.rng))
            .collect::<Vec<f64>>();
        // Second moment about zero, the perturbations being zero mean by construction.
        let obs_var = sample_variance(&perturbations, 0.0);

        let theta_mean = self.theta_mean();
        let y_mean = mean(y);

        let cross_covar = self
            .members
            .iter()
            .zip(y)
            .fold(Vector3::zeros(), |acc, (theta, y_j)| {
                acc + (theta - theta_mean) * (y_j - y_mean)
            })
            / dof;
        let raw_innovation_var = sample_variance(y, y_mean) + obs_var;

        let mut divergences = Vec::new();
        let innovation_var = if raw_innovation_var >= VARIANCE_FLOOR {
            raw_innovation_var
        } else {
            let divergence = FilterDivergence {
                step,
                kind: DivergenceKind::InnovationVariance,
                value: raw_innovation_var,
                floor: VARIANCE_FLOOR,
            };
            warn!("EnKF {divergence}");
            divergences.push(divergence);
            VARIANCE_FLOOR
        };

        let gain = cross_covar / innovation_var;
        for ((theta, y_j), e_j) in self.members.iter_mut().zip(y).zip(&perturbations) {
            *theta += gain * (measurement + e_j - y_j);
        }

        self.steps += 1;

        let theta = self.theta_mean();
        let estimate = StepEstimate {
            step,
            kind: FilterKind::Ensemble,
            baseline: self.baseline,
            theta,
            theta_var: population_variance(&self.members, &theta),
            pressure: y_mean,
            pressure_std: population_std(y, y_mean),
            measurement,
            prefit: measurement - y_mean,
            innovation_var,
            divergences,
        }
        .ensure_finite()?;

        debug!(
            "EnKF #{step}: {} | prefit {:.3} | P_yy {:e}",
            estimate.params(),
            estimate.prefit,
            innovation_var
        );

        Ok(estimate)
    }
}

impl fmt::Display for EnsembleKF {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "EnKF of {} members after {} steps: {}",
            self.size(),
            self.steps,
            self.baseline.to_params(&self.theta_mean())
        )
    }
}
