use crate::similarity::{degenerate, Centered};
use crate::{SimilarityEstimator, SimilaritySettings};
use core::cmp::Reverse;
use float_ord::FloatOrd;
use log::*;
use sfm_core::{
    nalgebra::{Matrix3, Point3, Rotation3, Vector3},
    Error, Result, Rotation, Similarity,
};

/// Estimates a similarity with the closed-form solution to the orthogonal Procrustes problem
/// given by Shinji Umeyama in
/// ["Least-squares estimation of transformation parameters between two point patterns"](https://doi.org/10.1109/34.88573).
///
/// Both point sets are centered on their centroids and the cross-covariance matrix
/// `Σ = 1/n * sum((to[i] - μ_to) * transpose(from[i] - μ_from))` is decomposed with SVD into
/// `U * D * transpose(V)`. The rotation is `U * S * transpose(V)`, where `S` is the identity
/// except for the entry of the smallest singular value, which is `det(U) * det(V)`. This keeps
/// the determinant of the rotation at `+1` instead of producing a reflection. The scale is
/// `trace(D * S) / σ²_from` and the translation is `μ_to - scale * R * μ_from`.
///
/// When the second largest singular value of `Σ` is tiny compared to the largest,
/// the correspondences are (nearly) collinear, and any rotation about that line fits them
/// equally well. This case is rejected with [`Error::NumericalDegeneracy`]. The same happens
/// when the sign of a singular value has to be flipped and the two smallest singular values
/// are tied, since flipping either one gives a different rotation with the same error.
///
/// ```
/// use sfm_core::nalgebra::{Point3, Vector3};
/// use sfm_core::{Rotation, Similarity};
/// use sfm_geom::{OrthoProcrustes, SimilarityEstimator};
///
/// let truth = Similarity::new(
///     2.0,
///     Rotation::from_axis_angle(&Vector3::z(), std::f64::consts::FRAC_PI_2).unwrap(),
///     Vector3::new(1.0, 0.0, 0.0),
/// )
/// .unwrap();
/// let from = [
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(0.0, 0.0, 1.0),
/// ];
/// let to = truth.transform_points(&from);
/// let estimate = OrthoProcrustes::new().estimate(&from, &to).unwrap();
/// assert!((estimate.scale() - 2.0).abs() < 1e-9);
/// assert!(estimate.rotation().angle_to(&truth.rotation()) < 1e-9);
/// assert!((estimate.translation() - truth.translation()).norm() < 1e-9);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct OrthoProcrustes {
    epsilon: f64,
    max_iterations: usize,
    minimum_conditioning: f64,
}

impl OrthoProcrustes {
    /// Creates an `OrthoProcrustes` with default values.
    ///
    /// Same as calling [`Default::default`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the epsilon used in the singular value decomposition.
    ///
    /// Default is `1e-12`.
    #[must_use]
    pub fn epsilon(self, epsilon: f64) -> Self {
        Self { epsilon, ..self }
    }

    /// Set the maximum number of iterations for the singular value decomposition.
    ///
    /// Default is `1000`.
    #[must_use]
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    /// Set the smallest accepted ratio of the second largest to the largest singular
    /// value of the cross-covariance. When a reflection has to be removed, this is also the
    /// smallest accepted gap between the two smallest singular values, relative to the largest.
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

impl Default for OrthoProcrustes {
    fn default() -> Self {
        SimilaritySettings::default().into()
    }
}

impl From<SimilaritySettings> for OrthoProcrustes {
    fn from(settings: SimilaritySettings) -> Self {
        Self {
            epsilon: settings.epsilon,
            max_iterations: settings.max_iterations,
            minimum_conditioning: settings.minimum_conditioning,
        }
    }
}

impl SimilarityEstimator for OrthoProcrustes {
    fn estimate(&self, from: &[Point3<f64>], to: &[Point3<f64>]) -> Result<Similarity> {
        let centered = Centered::new(from, to, Self::MIN_SAMPLES)?;
        centered.check_spread()?;

        let n = centered.len() as f64;
        let covariance = centered
            .to
            .iter()
            .zip(&centered.from)
            .fold(Matrix3::zeros(), |acc, (t, f)| acc + t * f.transpose())
            / n;

        let svd = covariance
            .try_svd(true, true, self.epsilon, self.max_iterations)
            .ok_or_else(|| {
                Error::NumericalDegeneracy(format!(
                    "singular value decomposition did not converge within {} iterations",
                    self.max_iterations
                ))
            })?;
        let singular_values = svd.singular_values;
        let (u, v_t) = match (svd.u, svd.v_t) {
            (Some(u), Some(v_t)) => (u, v_t),
            _ => {
                return Err(Error::NumericalDegeneracy(
                    "singular value decomposition did not produce singular vectors".into(),
                ))
            }
        };
        trace!("cross-covariance singular values: {:?}", singular_values.as_slice());

        // The singular values are not guaranteed to be sorted.
        let mut order = [0, 1, 2];
        order.sort_unstable_by_key(|&ix| Reverse(FloatOrd(singular_values[ix])));
        let [largest, second, smallest] = order;

        let conditioning = singular_values[second] / singular_values[largest];
        if !(conditioning >= self.minimum_conditioning) {
            debug!(
                "rejecting correspondences: singular value ratio {:e} is below {:e}",
                conditioning, self.minimum_conditioning
            );
            return Err(Error::NumericalDegeneracy(format!(
                "correspondences are collinear (singular value ratio {:e} is below {:e})",
                conditioning, self.minimum_conditioning
            )));
        }

        let mut signs = Vector3::repeat(1.0);
        if u.determinant() * v_t.determinant() < 0.0 {
            // Flipping either of two tied singular values fits equally well.
            let gap = (singular_values[second] - singular_values[smallest])
                / singular_values[largest];
            if !(gap >= self.minimum_conditioning) {
                debug!(
                    "rejecting correspondences: reflected singular value gap {:e} is below {:e}",
                    gap, self.minimum_conditioning
                );
                return Err(Error::NumericalDegeneracy(format!(
                    "rotation is not uniquely determined (reflected singular value gap {:e} is below {:e})",
                    gap, self.minimum_conditioning
                )));
            }
            signs[smallest] = -1.0;
        }
        let rotation = u * Matrix3::from_diagonal(&signs) * v_t;
        let scale = singular_values.dot(&signs) / centered.from_variance;
        let translation = centered.translation(scale, rotation * centered.from_centroid);
        trace!("estimated scale {} and translation {:?}", scale, translation.as_slice());

        let rotation = Rotation::from(Rotation3::from_matrix_unchecked(rotation));
        Similarity::new(scale, rotation, translation).map_err(degenerate)
    }
}
