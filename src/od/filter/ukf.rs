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

use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::f64::consts::LN_2;
use std::fmt;
use typed_builder::TypedBuilder;

use super::Filter;
use crate::dynamics::{Baseline, Windkessel};
use crate::errors::{DomainError, EstimationError, InputError, InvalidParameterSnafu};
use crate::linalg::{Matrix4, Vector3, Vector4};
use crate::od::estimate::{DivergenceKind, FilterDivergence, FilterKind, Prediction, StepEstimate};
use crate::utils::{clamp_eigenvalues, min_eigenvalue, psd_sqrt, symmetrize, VARIANCE_FLOOR};
use crate::waveform::FlowPair;

/// Dimension of the state: pressure log-ratio followed by the Rp, C and Rd log-ratios.
const STATE_DIM: usize = 4;

/// Smallest eigenvalue a state covariance is clamped to when it cannot be factorized.
pub const COVAR_FLOOR: f64 = 1e-10;

/// Configuration of the unscented Kalman filter, in log2-ratio units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct UnscentedConfig {
    /// Spread of the sigma points about the mean
    #[builder(default = 1e-2)]
    pub alpha: f64,
    /// Prior knowledge of the distribution, 2 is optimal for Gaussians
    #[builder(default = 2.0)]
    pub beta: f64,
    /// Secondary scaling
    #[builder(default = 0.0)]
    pub kappa: f64,
    /// Diagonal of the initial state covariance (pressure, Rp, C, Rd)
    #[builder(default = [1.0; 4])]
    pub init_covar: [f64; 4],
    /// Diagonal of the process noise covariance, per step
    #[builder(default = [1e-4; 4])]
    pub process_noise: [f64; 4],
    /// Variance of the pressure log-ratio measurement
    #[builder(default = 1e-2)]
    pub measurement_noise: f64,
    /// Initial pressure, defaults to the baseline pressure
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub initial_pressure: Option<f64>,
}

impl Default for UnscentedConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Merwe scaled sigma-point weights.
#[derive(Clone, Debug, PartialEq)]
pub struct SigmaWeights {
    /// λ = α²(n + κ) − n
    pub lambda: f64,
    pub mean: Vec<f64>,
    pub covar: Vec<f64>,
}

impl SigmaWeights {
    /// Computes the 2n + 1 weights of an `n` dimensional state.
    ///
    /// The mean weights sum to one. The covariance weights sum to `1 + (1 − α² + β)` since the center point carries
    /// the extra prior-knowledge term.
    pub fn new(n: usize, alpha: f64, beta: f64, kappa: f64) -> Result<Self, InputError> {
        ensure!(
            alpha > 0.0 && alpha.is_finite(),
            InvalidParameterSnafu {
                param: "sigma point alpha",
                value: alpha
            }
        );
        ensure!(
            beta.is_finite(),
            InvalidParameterSnafu {
                param: "sigma point beta",
                value: beta
            }
        );
        let n_kappa = n as f64 + kappa;
        ensure!(
            n_kappa > 0.0 && kappa.is_finite(),
            InvalidParameterSnafu {
                param: "sigma point kappa",
                value: kappa
            }
        );

        let lambda = alpha.powi(2) * n_kappa - n as f64;
        let scale = n as f64 + lambda;
        let w_0 = lambda / scale;
        let w_k = 1.0 / (2.0 * scale);

        let mut mean = vec![w_k; 2 * n + 1];
        let mut covar = mean.clone();
        mean[0] = w_0;
        covar[0] = w_0 + (1.0 - alpha.powi(2) + beta);

        Ok(Self {
            lambda,
            mean,
            covar,
        })
    }

    /// Number of sigma points.
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Scale (n + λ) of the covariance whose square root spreads the sigma points.
    pub fn scale(&self) -> f64 {
        (self.len() / 2) as f64 + self.lambda
    }
}

/// Sigma points propagated by the latest time update, awaiting their measurement.
#[derive(Clone, Debug)]
struct SigmaForecast {
    step: usize,
    points: Vec<Vector4<f64>>,
    divergences: Vec<FilterDivergence>,
}

/// Unscented Kalman filter over the pressure and the Windkessel parameters, all as log2 ratios to a baseline.
///
/// The parameters follow a random walk and the pressure component is propagated through the forward model.
/// The measurement is the pressure log-ratio, so the observation function extracts the first component of the
/// predicted sigma points.
#[derive(Clone, Debug)]
pub struct UnscentedKF {
    baseline: Baseline,
    model: Windkessel,
    weights: SigmaWeights,
    process_noise: Matrix4<f64>,
    measurement_noise: f64,
    state: Vector4<f64>,
    covar: Matrix4<f64>,
    forecast: Option<SigmaForecast>,
    steps: usize,
}

impl UnscentedKF {
    pub fn new(
        baseline: Baseline,
        model: Windkessel,
        config: UnscentedConfig,
    ) -> Result<Self, InputError> {
        baseline.validate()?;
        let weights = SigmaWeights::new(STATE_DIM, config.alpha, config.beta, config.kappa)?;

        for (param, values) in [
            ("initial covariance", config.init_covar),
            ("process noise", config.process_noise),
        ] {
            if let Some(value) = values.iter().find(|v| !(**v >= 0.0 && v.is_finite())) {
                return InvalidParameterSnafu {
                    param,
                    value: *value,
                }
                .fail();
            }
        }
        ensure!(
            config.measurement_noise >= 0.0 && config.measurement_noise.is_finite(),
            InvalidParameterSnafu {
                param: "measurement noise",
                value: config.measurement_noise
            }
        );

        let initial_pressure = config.initial_pressure.unwrap_or(baseline.pressure);
        let pressure_ratio = baseline.pressure_log_ratio(initial_pressure).map_err(|_| {
            InputError::InvalidParameter {
                param: "initial pressure",
                value: initial_pressure,
            }
        })?;

        info!(
            "UKF about {} (alpha = {}, beta = {}, kappa = {})",
            baseline.params(),
            config.alpha,
            config.beta,
            config.kappa
        );

        Ok(Self {
            baseline,
            model,
            weights,
            process_noise: Matrix4::from_diagonal(&Vector4::from(config.process_noise)),
            measurement_noise: config.measurement_noise,
            state: Vector4::new(pressure_ratio, 0.0, 0.0, 0.0),
            covar: Matrix4::from_diagonal(&Vector4::from(config.init_covar)),
            forecast: None,
            steps: 0,
        })
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Current state: predicted after `predict`, posterior after `update`.
    pub fn state(&self) -> &Vector4<f64> {
        &self.state
    }

    /// Current state covariance: predicted after `predict`, posterior after `update`.
    pub fn covar(&self) -> &Matrix4<f64> {
        &self.covar
    }

    pub fn weights(&self) -> &SigmaWeights {
        &self.weights
    }

    /// Generates the sigma points of the current state.
    ///
    /// The spread is the lower Cholesky factor of (n + λ)Σ. If Σ cannot be factorized, its eigenvalues are first
    /// clamped to [`COVAR_FLOOR`] and the regularization is reported.
    pub fn sigma_points(&mut self) -> (Vec<Vector4<f64>>, Option<FilterDivergence>) {
        let scale = self.weights.scale();
        let (spread, divergence) = match (self.covar * scale).cholesky() {
            Some(chol) => (chol.l(), None),
            None => {
                let divergence = FilterDivergence {
                    step: self.steps,
                    kind: DivergenceKind::StateCovariance,
                    value: min_eigenvalue(&self.covar),
                    floor: COVAR_FLOOR,
                };
                warn!("UKF {divergence}");
                self.covar = clamp_eigenvalues(&self.covar, COVAR_FLOOR);
                (psd_sqrt(&(self.covar * scale)), Some(divergence))
            }
        };

        let mut points = Vec::with_capacity(self.weights.len());
        points.push(self.state);
        for col in spread.column_iter() {
            points.push(self.state + col);
        }
        for col in spread.column_iter() {
            points.push(self.state - col);
        }
        (points, divergence)
    }

    /// Advances one sigma point through the forward model.
    fn propagate(
        model: &Windkessel,
        baseline: &Baseline,
        flow: FlowPair,
        point: &Vector4<f64>,
    ) -> Result<Vector4<f64>, DomainError> {
        let theta = Vector3::new(point[1], point[2], point[3]);
        let p_prev = baseline.pressure_from_log_ratio(point[0]);
        let p_next = model.step_pressure(p_prev, flow, &baseline.to_params(&theta))?;
        let mut next = *point;
        next[0] = baseline.pressure_log_ratio(p_next)?;
        Ok(next)
    }

    fn weighted_mean(&self, points: &[Vector4<f64>]) -> Vector4<f64> {
        points
            .iter()
            .zip(&self.weights.mean)
            .fold(Vector4::zeros(), |acc, (point, w)| acc + point * *w)
    }

    /// Physical pressure and its first order one-sigma, from the pressure log-ratio and its variance.
    fn pressure_moments(&self, ratio: f64, variance: f64) -> (f64, f64) {
        let pressure = self.baseline.pressure_from_log_ratio(ratio);
        (pressure, pressure * LN_2 * variance.max(0.0).sqrt())
    }

    fn theta(state: &Vector4<f64>) -> Vector3<f64> {
        Vector3::new(state[1], state[2], state[3])
    }

    fn theta_var(covar: &Matrix4<f64>) -> Vector3<f64> {
        Vector3::new(covar[(1, 1)], covar[(2, 2)], covar[(3, 3)])
    }
}

impl Filter for UnscentedKF {
    fn kind(&self) -> FilterKind {
        FilterKind::Unscented
    }

    fn model(&self) -> &Windkessel {
        &self.model
    }

    fn steps_completed(&self) -> usize {
        self.steps
    }

    fn predict(&mut self, flow: FlowPair) -> Result<Prediction, EstimationError> {
        let (points, divergence) = self.sigma_points();

        let model = self.model;
        let baseline = self.baseline;
        let points = points
            .par_iter()
            .map(|point| Self::propagate(&model, &baseline, flow, point))
            .collect::<Result<Vec<_>, DomainError>>()?;

        let mean = self.weighted_mean(&points);
        let covar = points
            .iter()
            .zip(&self.weights.covar)
            .fold(Matrix4::zeros(), |acc, (point, w)| {
                let dev = point - mean;
                acc + dev * dev.transpose() * *w
            })
            + self.process_noise;

        self.state = mean;
        self.covar = symmetrize(&covar);
        trace!("UKF #{} sigma points {:?}", self.steps, points);

        let mut divergences = Vec::new();
        if let Some(prior) = self.forecast.take() {
            divergences.extend(prior.divergences);
        }
        divergences.extend(divergence);
        self.forecast = Some(SigmaForecast {
            step: self.steps,
            points,
            divergences,
        });

        let (pressure, pressure_std) = self.pressure_moments(mean[0], self.covar[(0, 0)]);
        Ok(Prediction {
            step: self.steps,
            pressure,
            pressure_std,
            theta: Self::theta(&self.state),
            theta_var: Self::theta_var(&self.covar),
        })
    }

    fn update(&mut self, measurement: f64) -> Result<StepEstimate, EstimationError> {
        let step = self.steps;
        let observed = self.baseline.pressure_log_ratio(measurement).map_err(|_| {
            InputError::InvalidMeasurement {
                step,
                value: measurement,
            }
        })?;
        let forecast = self
            .forecast
            .take()
            .ok_or(EstimationError::PredictionRequired)?;
        debug_assert_eq!(forecast.step, step);
        let mut divergences = forecast.divergences;

        // The observation function extracts the pressure component of each predicted point.
        let obs_mean = forecast
            .points
            .iter()
            .zip(&self.weights.mean)
            .map(|(point, w)| w * point[0])
            .sum::<f64>();

        let mut raw_innovation_var = self.measurement_noise;
        let mut cross_covar = Vector4::zeros();
        for (point, w) in forecast.points.iter().zip(&self.weights.covar) {
            let dy = point[0] - obs_mean;
            raw_innovation_var += w * dy * dy;
            cross_covar += (point - self.state) * (w * dy);
        }

        let innovation_var = if raw_innovation_var >= VARIANCE_FLOOR {
            raw_innovation_var
        } else {
            let divergence = FilterDivergence {
                step,
                kind: DivergenceKind::InnovationVariance,
                value: raw_innovation_var,
                floor: VARIANCE_FLOOR,
            };
            warn!("UKF {divergence}");
            divergences.push(divergence);
            VARIANCE_FLOOR
        };

        let gain = cross_covar / innovation_var;
        let prefit = observed - obs_mean;
        self.state += gain * prefit;
        self.covar = symmetrize(&(self.covar - gain * gain.transpose() * innovation_var));
        self.steps += 1;

        let (pressure, pressure_std) = self.pressure_moments(self.state[0], self.covar[(0, 0)]);
        let estimate = StepEstimate {
            step,
            kind: FilterKind::Unscented,
            baseline: self.baseline,
            theta: Self::theta(&self.state),
            theta_var: Self::theta_var(&self.covar),
            pressure,
            pressure_std,
            measurement,
            prefit,
            innovation_var,
            divergences,
        }
        .ensure_finite()?;

        debug!(
            "UKF #{step}: {} | prefit {:.3e} | S {:e}",
            estimate.params(),
            prefit,
            innovation_var
        );

        Ok(estimate)
    }
}

impl fmt::Display for UnscentedKF {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "UKF after {} steps: {}",
            self.steps,
            self.baseline.to_params(&Self::theta(&self.state))
        )
    }
}
