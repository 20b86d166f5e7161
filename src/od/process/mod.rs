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

use approx::relative_eq;
use snafu::ensure;

use crate::errors::{EstimationError, InputError, LengthMismatchSnafu, StepMismatchSnafu};
use crate::od::estimate::StepEstimate;
use crate::od::filter::Filter;
use crate::waveform::{FlowPair, Waveform};

/// Relative tolerance between the sampling period of the waveform and the step of the model.
const STEP_TOLERANCE: f64 = 1e-6;

/// Drives a filter across a flow waveform and its pressure measurements, one step at a time.
///
/// This is a finite iterator of per-step estimates: each `next` runs the time update of the step's flow pair and
/// the measurement update of its measurement. The first error is yielded once and ends the iteration.
/// The process resumes from the number of steps the filter already completed, so a filter can be driven over
/// consecutive portions of a run.
pub struct EstimationProcess<'a, F: Filter> {
    filter: F,
    flow: &'a [f64],
    measurements: &'a [f64],
    next: usize,
    failed: bool,
}

impl<'a, F: Filter> EstimationProcess<'a, F> {
    /// Validates the inputs of the run: one measurement per flow sample, a uniform sampling period, a period
    /// equal to the step of the filter's model, and filter inputs (e.g. supplied noise) covering every step.
    pub fn new(
        filter: F,
        waveform: &'a Waveform,
        measurements: &'a [f64],
    ) -> Result<Self, InputError> {
        ensure!(
            measurements.len() == waveform.len(),
            LengthMismatchSnafu {
                what: "measurement series",
                expected: waveform.len(),
                got: measurements.len()
            }
        );
        let step = waveform.step()?;
        let model_step = filter.model().step;
        ensure!(
            relative_eq!(step, model_step, max_relative = STEP_TOLERANCE),
            StepMismatchSnafu {
                waveform: step,
                model: model_step
            }
        );
        let next = filter.steps_completed();
        ensure!(
            next <= waveform.len(),
            LengthMismatchSnafu {
                what: "filter history",
                expected: waveform.len(),
                got: next
            }
        );
        filter.validate_run(waveform.len())?;

        info!(
            "{} process over {} measurements every {} s, starting at #{}",
            filter.kind(),
            measurements.len(),
            step,
            next
        );

        Ok(Self {
            filter,
            flow: &waveform.flow,
            measurements,
            next,
            failed: false,
        })
    }

    /// The filter being driven.
    pub fn kf(&self) -> &F {
        &self.filter
    }

    pub fn into_filter(self) -> F {
        self.filter
    }

    /// Number of steps left to process.
    pub fn remaining(&self) -> usize {
        if self.failed {
            0
        } else {
            self.measurements.len() - self.next
        }
    }

    /// Processes all remaining steps and returns their estimates, or the first error.
    pub fn run(&mut self) -> Result<Vec<StepEstimate>, EstimationError> {
        let estimates = self.by_ref().collect::<Result<Vec<_>, _>>()?;
        if let Some(last) = estimates.last() {
            info!("{} process done: {}", last.kind, last.params());
        }
        Ok(estimates)
    }
}

impl<'a, F: Filter> Iterator for EstimationProcess<'a, F> {
    type Item = Result<StepEstimate, EstimationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let index = self.next;
        let flow = FlowPair::at(self.flow, index)?;
        let measurement = self.measurements[index];

        match self.filter.step(flow, measurement) {
            Ok(estimate) => {
                self.next += 1;
                Some(Ok(estimate))
            }
            Err(e) => {
                error!("{} failed at step #{index}: {e}", self.filter.kind());
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

/// Root mean square of the prefit residuals of the estimates, in the filters' observation space.
pub fn rms_prefit(estimates: &[StepEstimate]) -> f64 {
    if estimates.is_empty() {
        return 0.0;
    }
    let sum = estimates.iter().map(|e| e.prefit.powi(2)).sum::<f64>();
    (sum / estimates.len() as f64).sqrt()
}
