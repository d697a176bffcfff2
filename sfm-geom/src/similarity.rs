use log::*;
use sfm_core::{
    nalgebra::{Point3, Vector3},
    Error, Result, Similarity,
};

/// This trait is for algorithms which estimate the [`Similarity`] that best aligns one set of
/// 3d points with another.
///
/// Point `i` of `from` corresponds to point `i` of `to`. The estimate minimizes
/// `sum(|to[i] - (scale * R * from[i] + t)|^2)`.
///
/// Estimators never return a default transform on failure. An `Ok(Similarity::identity())`
/// always means the identity is the best fit.
pub trait SimilarityEstimator {
    /// The minimum number of correspondences needed to estimate a similarity.
    const MIN_SAMPLES: usize = 4;

    /// Estimates the similarity which maps `from` onto `to`.
    ///
    /// Fails with [`Error::InvalidArgument`] if the slices differ in length, contain fewer
    /// than [`SimilarityEstimator::MIN_SAMPLES`] points, or contain non-finite coordinates.
    /// Fails with [`Error::NumericalDegeneracy`] if the points are collinear (or coincident)
    /// or the decomposition does not converge.
    fn estimate(&self, from: &[Point3<f64>], to: &[Point3<f64>]) -> Result<Similarity>;
}

/// Both point sets with their centroids removed.
pub(crate) struct Centered {
    pub from_centroid: Vector3<f64>,
    pub to_centroid: Vector3<f64>,
    pub from: Vec<Vector3<f64>>,
    pub to: Vec<Vector3<f64>>,
    /// The mean squared distance of `from` to its centroid.
    pub from_variance: f64,
}

impl Centered {
    /// Validates the correspondences and centers them.
    pub fn new(from: &[Point3<f64>], to: &[Point3<f64>], min_samples: usize) -> Result<Self> {
        if from.len() != to.len() {
            return Err(Error::InvalidArgument(format!(
                "from and to sets for similarity estimation are not of equal size (from: {}, to: {})",
                from.len(),
                to.len()
            )));
        }
        if from.len() < min_samples {
            return Err(Error::InvalidArgument(format!(
                "at least {} point pairs must be given to estimate a similarity, given: {}",
                min_samples,
                from.len()
            )));
        }
        if !from
            .iter()
            .chain(to)
            .all(|p| p.coords.iter().all(|n| n.is_finite()))
        {
            return Err(Error::InvalidArgument(
                "correspondences contain non-finite coordinates".into(),
            ));
        }

        let (from_centroid, from, from_variance) = center(from);
        let (to_centroid, to, to_variance) = center(to);
        trace!(
            "centered {} correspondences with variances {:e} (from) and {:e} (to)",
            from.len(),
            from_variance,
            to_variance
        );
        let finite = from_variance.is_finite()
            && to_variance.is_finite()
            && from_centroid.iter().chain(to_centroid.iter()).all(|n| n.is_finite());
        if !finite {
            debug!("rejecting correspondences: centroid or variance overflowed");
            return Err(Error::NumericalDegeneracy(
                "correspondences overflowed while centering".into(),
            ));
        }
        Ok(Self {
            from_centroid,
            to_centroid,
            from,
            to,
            from_variance,
        })
    }

    pub fn len(&self) -> usize {
        self.from.len()
    }

    /// Fails if either point set has collapsed to a single point.
    pub fn check_spread(&self) -> Result<()> {
        for (name, points, centroid) in [
            ("from", &self.from, &self.from_centroid),
            ("to", &self.to, &self.to_centroid),
        ] {
            let variance = mean(points.iter().map(|v| v.norm_squared()));
            // Spread is relative to how far the points are from the origin.
            let magnitude = variance + centroid.norm_squared();
            if variance <= f64::EPSILON * magnitude {
                debug!(
                    "rejecting correspondences: {} points are coincident (variance {:e})",
                    name, variance
                );
                return Err(Error::NumericalDegeneracy(format!(
                    "all {} points are coincident",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Computes `scale * R * from_centroid` subtracted from `to_centroid`.
    pub fn translation(&self, scale: f64, rotated_from_centroid: Vector3<f64>) -> Vector3<f64> {
        self.to_centroid - rotated_from_centroid * scale
    }
}

fn center(points: &[Point3<f64>]) -> (Vector3<f64>, Vec<Vector3<f64>>, f64) {
    let centroid = mean_vector(points.iter().map(|p| p.coords));
    let centered: Vec<Vector3<f64>> = points.iter().map(|p| p.coords - centroid).collect();
    let variance = mean(centered.iter().map(|v| v.norm_squared()));
    (centroid, centered, variance)
}

fn mean_vector(vectors: impl ExactSizeIterator<Item = Vector3<f64>>) -> Vector3<f64> {
    let n = vectors.len() as f64;
    vectors.fold(Vector3::zeros(), |acc, v| acc + v) / n
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len() as f64;
    values.sum::<f64>() / n
}

/// Wraps a failure to construct the final transform as a degeneracy, since the inputs
/// were already validated.
pub(crate) fn degenerate(error: Error) -> Error {
    match error {
        Error::InvalidArgument(reason) => Error::NumericalDegeneracy(reason),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_named() {
        let from = vec![Point3::origin(); 5];
        let to = vec![Point3::origin(); 4];
        let Err(Error::InvalidArgument(reason)) = Centered::new(&from, &to, 4) else {
            panic!("mismatched sizes must be rejected");
        };
        assert!(reason.contains("from: 5"), "{}", reason);
        assert!(reason.contains("to: 4"), "{}", reason);
    }

    #[test]
    fn too_few_points() {
        let points = vec![Point3::new(1.0, 2.0, 3.0); 3];
        let Err(Error::InvalidArgument(reason)) = Centered::new(&points, &points, 4) else {
            panic!("three points must be rejected");
        };
        assert!(reason.contains("given: 3"), "{}", reason);
    }

    #[test]
    fn coincident_points() {
        let from = vec![Point3::new(1e3, -2e3, 5e2); 4];
        let to = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let centered = Centered::new(&from, &to, 4).unwrap();
        assert!(centered.check_spread().unwrap_err().is_numerical_degeneracy());
        let centered = Centered::new(&to, &from, 4).unwrap();
        assert!(centered.check_spread().unwrap_err().is_numerical_degeneracy());
    }

    #[test]
    fn huge_coordinates_overflow() {
        let huge = [
            Point3::new(1.5e308, 0.0, 0.0),
            Point3::new(1.5e308, 1.0, 0.0),
            Point3::new(1.5e308, 0.0, 1.0),
            Point3::new(1.6e308, 1.0, 1.0),
        ];
        let spread = [
            Point3::new(1e200, 0.0, 0.0),
            Point3::new(-1e200, 0.0, 0.0),
            Point3::new(0.0, 1e200, 0.0),
            Point3::new(0.0, -1e200, 0.0),
        ];
        let unit = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        for (from, to) in [(&huge, &unit), (&unit, &huge), (&spread, &unit), (&unit, &spread)] {
            let Err(Error::NumericalDegeneracy(reason)) = Centered::new(from, to, 4) else {
                panic!("overflowing correspondences must be rejected");
            };
            assert!(reason.contains("overflow"), "{}", reason);
        }
    }

    #[test]
    fn centroids_are_removed() {
        let from = [
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(3.0, 1.0, 1.0),
            Point3::new(1.0, 3.0, 1.0),
            Point3::new(3.0, 3.0, 1.0),
        ];
        let centered = Centered::new(&from, &from, 4).unwrap();
        assert_eq!(centered.from_centroid, Vector3::new(2.0, 2.0, 1.0));
        assert_eq!(centered.from_variance, 2.0);
        let sum = centered.from.iter().fold(Vector3::zeros(), |a, v| a + v);
        assert_eq!(sum, Vector3::zeros());
    }
}
