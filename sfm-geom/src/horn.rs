use crate::similarity::{degenerate, Centered};
use crate::{SimilarityEstimator, SimilaritySettings};
use core::cmp::Reverse;
use float_ord::FloatOrd;
use log::*;
use sfm_core::{
    nalgebra::{Matrix3, Matrix4, Point3, Quaternion},
    Error, Result, Rotation, Similarity,
};

/// Estimates a similarity with the closed-form quaternion solution to absolute orientation
/// by Berthold K. P. Horn in
/// ["Closed-form solution of absolute orientation using unit quaternions"](https://doi.org/10.1364/JOSAA.4.000629).
///
/// The rotation is the eigenvector of the largest eigenvalue of a 4x4 symmetric matrix built
/// from the cross-covariance of the centered points. It minimizes the same objective as
/// [`OrthoProcrustes`](crate::OrthoProcrustes), so for the same inputs both agree up to
/// floating point error. The scale is the least-squares scale given that rotation, which
/// is the same scale that Umeyama's method produces.
///
/// If the two largest eigenvalues are (nearly) equal, the best rotation is not unique. This
/// happens when the correspondences are collinear, or when they only fit with a reflection
/// and the two smallest singular values of the cross-covariance are tied. Both cases are
/// rejected with [`Error::NumericalDegeneracy`].
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct HornQuaternion {
    epsilon: f64,
    max_iterations: usize,
    minimum_conditioning: f64,
}

impl HornQuaternion {
    /// Creates a `HornQuaternion` with default values.
    ///
    /// Same as calling [`Default::default`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the epsilon used in the symmetric eigen solver.
    ///
    /// Default is `1e-12`.
    #[must_use]
    pub fn epsilon(self, epsilon: f64) -> Self {
        Self { epsilon, ..self }
    }

    /// Set the maximum number of iterations for the symmetric eigen solver.
    ///
    /// Default is `1000`.
    #[must_use]
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    /// Set the smallest accepted gap between the two largest eigenvalues, relative to the
    /// largest eigenvalue.
    ///
    /// Default is `1e-9`.
    #[must_use]
    pub fn minimum_conditioning(self, minimum_conditioning: f64) -> Self {
        Self {
            minimum_conditioning,
            ..self
        }
    }
}

impl Default for HornQuaternion {
    fn default() -> Self {
        SimilaritySettings::default().into()
    }
}

impl From<SimilaritySettings> for HornQuaternion {
    fn from(settings: SimilaritySettings) -> Self {
        Self {
            epsilon: settings.epsilon,
            max_iterations: settings.max_iterations,
            minimum_conditioning: settings.minimum_conditioning,
        }
    }
}

/// Builds the symmetric matrix whose dominant eigenvector is the quaternion `(w, i, j, k)`
/// of the rotation taking `from` to `to`, where `m = sum(from[i] * transpose(to[i]))`.
#[rustfmt::skip]
fn horn_matrix(m: &Matrix3<f64>) -> Matrix4<f64> {
    let (sxx, sxy, sxz) = (m.m11, m.m12, m.m13);
    let (syx, syy, syz) = (m.m21, m.m22, m.m23);
    let (szx, szy, szz) = (m.m31, m.m32, m.m33);
    Matrix4::new(
        sxx + syy + szz, syz - szy,        szx - sxz,        sxy - syx,
        syz - szy,       sxx - syy - szz,  sxy + syx,        szx + sxz,
        szx - sxz,       sxy + syx,       -sxx + syy - szz,  syz + szy,
        sxy - syx,       szx + sxz,        syz + szy,       -sxx - syy + szz,
    )
}

impl SimilarityEstimator for HornQuaternion {
    fn estimate(&self, from: &[Point3<f64>], to: &[Point3<f64>]) -> Result<Similarity> {
        let centered = Centered::new(from, to, Self::MIN_SAMPLES)?;
        centered.check_spread()?;

        let n = centered.len() as f64;
        let m = centered
            .from
            .iter()
            .zip(&centered.to)
            .fold(Matrix3::zeros(), |acc, (f, t)| acc + f * t.transpose())
            / n;

        let eigen = horn_matrix(&m)
            .try_symmetric_eigen(self.epsilon, self.max_iterations)
            .ok_or_else(|| {
                Error::NumericalDegeneracy(format!(
                    "symmetric eigen decomposition did not converge within {} iterations",
                    self.max_iterations
                ))
            })?;
        trace!("horn matrix eigenvalues: {:?}", eigen.eigenvalues.as_slice());

        let mut order = [0, 1, 2, 3];
        order.sort_unstable_by_key(|&ix| Reverse(FloatOrd(eigen.eigenvalues[ix])));
        let largest = eigen.eigenvalues[order[0]];
        let second = eigen.eigenvalues[order[1]];

        let conditioning = (largest - second) / largest;
        if !(conditioning >= self.minimum_conditioning) {
            debug!(
                "rejecting correspondences: eigenvalue gap {:e} is below {:e}",
                conditioning, self.minimum_conditioning
            );
            return Err(Error::NumericalDegeneracy(format!(
                "rotation is not uniquely determined (eigenvalue gap {:e} is below {:e})",
                conditioning, self.minimum_conditioning
            )));
        }

        let q = eigen.eigenvectors.column(order[0]);
        let rotation =
            Rotation::from_quaternion(Quaternion::new(q[0], q[1], q[2], q[3])).map_err(degenerate)?;
        let r = rotation.matrix();
        let scale = centered
            .to
            .iter()
            .zip(&centered.from)
            .map(|(t, f)| t.dot(&(r * f)))
            .sum::<f64>()
            / n
            / centered.from_variance;
        let translation = centered.translation(scale, r * centered.from_centroid);
        trace!("estimated scale {} and translation {:?}", scale, translation.as_slice());

        Similarity::new(scale, rotation, translation).map_err(degenerate)
    }
}
