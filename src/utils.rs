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

use crate::linalg::{DMatrix, SMatrix, SVector};

/// Innovation variances below this floor are considered singular and are regularized.
pub const VARIANCE_FLOOR: f64 = 1e-12;

/// Absolute tolerance on negative eigenvalues and asymmetry when checking covariances.
pub const PSD_TOLERANCE: f64 = 1e-9;

/// Arithmetic mean, accumulated in slice order.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Unbiased sample variance (denominator N − 1) about the provided mean.
pub fn sample_variance(values: &[f64], mean: f64) -> f64 {
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Population standard deviation (denominator N) about the provided mean.
pub fn population_std(values: &[f64], mean: f64) -> f64 {
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Component-wise mean of a set of vectors, accumulated in slice order.
pub fn mean_vector<const D: usize>(vectors: &[SVector<f64, D>]) -> SVector<f64, D> {
    vectors
        .iter()
        .fold(SVector::<f64, D>::zeros(), |acc, v| acc + v)
        / vectors.len() as f64
}

/// Component-wise population variance (denominator N) of a set of vectors about the provided mean.
pub fn population_variance<const D: usize>(
    vectors: &[SVector<f64, D>],
    mean: &SVector<f64, D>,
) -> SVector<f64, D> {
    vectors.iter().fold(SVector::<f64, D>::zeros(), |acc, v| {
        let dev = v - mean;
        acc + dev.component_mul(&dev)
    }) / vectors.len() as f64
}

/// Unbiased sample covariance (denominator N − 1) of a set of vectors about the provided mean.
pub fn sample_covariance<const D: usize>(
    vectors: &[SVector<f64, D>],
    mean: &SVector<f64, D>,
) -> SMatrix<f64, D, D> {
    vectors.iter().fold(SMatrix::<f64, D, D>::zeros(), |acc, v| {
        let dev = v - mean;
        acc + dev * dev.transpose()
    }) / (vectors.len() - 1) as f64
}

/// Returns the symmetric part of the matrix, removing round-off asymmetry after a covariance update.
pub fn symmetrize<const D: usize>(m: &SMatrix<f64, D, D>) -> SMatrix<f64, D, D> {
    (m + m.transpose()) * 0.5
}

/// Smallest eigenvalue of the symmetric part of the matrix.
pub fn min_eigenvalue<const D: usize>(m: &SMatrix<f64, D, D>) -> f64 {
    let sym = symmetrize(m);
    DMatrix::from_column_slice(D, D, sym.as_slice())
        .symmetric_eigenvalues()
        .min()
}

/// Returns whether the matrix is symmetric and positive semi-definite, up to the provided tolerance.
pub fn is_positive_semi_definite<const D: usize>(m: &SMatrix<f64, D, D>, tolerance: f64) -> bool {
    if m.iter().any(|v| !v.is_finite()) {
        return false;
    }
    if (m - m.transpose()).amax() > tolerance {
        return false;
    }
    min_eigenvalue(m) >= -tolerance
}

/// Rebuilds the symmetric part of the matrix with all its eigenvalues raised to at least `floor`.
pub fn clamp_eigenvalues<const D: usize>(m: &SMatrix<f64, D, D>, floor: f64) -> SMatrix<f64, D, D> {
    let sym = symmetrize(m);
    let mut eig = DMatrix::from_column_slice(D, D, sym.as_slice()).symmetric_eigen();
    eig.eigenvalues.apply(|v| *v = v.max(floor));
    let rebuilt = eig.recompose();
    symmetrize(&SMatrix::<f64, D, D>::from_iterator(rebuilt.iter().cloned()))
}

/// Symmetric square root `V·√D·Vᵀ` of the symmetric part of the matrix, with negative eigenvalues treated as zero.
pub fn psd_sqrt<const D: usize>(m: &SMatrix<f64, D, D>) -> SMatrix<f64, D, D> {
    let sym = symmetrize(m);
    let mut eig = DMatrix::from_column_slice(D, D, sym.as_slice()).symmetric_eigen();
    eig.eigenvalues.apply(|v| *v = v.max(0.0).sqrt());
    let rebuilt = eig.recompose();
    SMatrix::<f64, D, D>::from_iterator(rebuilt.iter().cloned())
}
