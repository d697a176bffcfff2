use crate::{Error, Result, Rotation};
use alloc::{format, vec::Vec};
use approx::{AbsDiffEq, RelativeEq};
use core::ops::Mul;
use nalgebra::{Matrix4, Point3, Similarity3, Translation3, Vector3};
#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A rigid transformation composed with a uniform scale.
///
/// Applying it to a point `p` gives `scale * R * p + t`. The scale is always finite and
/// strictly positive; use [`Similarity::new`] to construct one from parts.
///
/// This is the transform that relates two reconstructions of the same scene, since a
/// reconstruction from images alone is only known up to a similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Similarity {
    scale: f64,
    rotation: Rotation,
    translation: Vector3<f64>,
}

impl Similarity {
    /// Creates a similarity from its parts.
    ///
    /// Fails if `scale` is not finite and positive or if `translation` is not finite.
    pub fn new(scale: f64, rotation: Rotation, translation: Vector3<f64>) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::invalid(format!(
                "similarity scale must be finite and positive, got {}",
                scale
            )));
        }
        if !translation.iter().all(|n| n.is_finite()) {
            return Err(Error::invalid(format!(
                "similarity translation {:?} has non-finite components",
                translation.as_slice()
            )));
        }
        Ok(Self {
            scale,
            rotation,
            translation,
        })
    }

    /// The similarity which maps every point to itself.
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            rotation: Rotation::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.translation
    }

    /// Computes `scale * R * point + t`.
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.rotation.transform_point(point) * self.scale + self.translation
    }

    /// Computes `scale * R * vector`. Vectors are not affected by the translation.
    pub fn transform_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.transform_vector(vector) * self.scale
    }

    /// Transforms many points at once, converting the rotation to a matrix only once.
    pub fn transform_points(&self, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        let sr = self.rotation.matrix() * self.scale;
        points
            .iter()
            .map(|p| Point3::from(sr * p.coords + self.translation))
            .collect()
    }

    /// The inverse similarity, which maps the output of `self` back to its input.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let scale = 1.0 / self.scale;
        let rotation = self.rotation.inverse();
        let translation = -(rotation.transform_vector(&self.translation) * scale);
        Self {
            scale,
            rotation,
            translation,
        }
    }

    /// Composes two similarities. The result applies `rhs` first and then `self`.
    #[must_use]
    pub fn compose(&self, rhs: &Self) -> Self {
        Self {
            scale: self.scale * rhs.scale,
            rotation: self.rotation * rhs.rotation,
            translation: self.transform_vector(&rhs.translation) + self.translation,
        }
    }

    /// The 4x4 homogeneous matrix of the transform.
    pub fn matrix(&self) -> Matrix4<f64> {
        let mut matrix = (self.rotation.matrix() * self.scale).to_homogeneous();
        matrix.fixed_slice_mut::<3, 1>(0, 3).copy_from(&self.translation);
        matrix
    }
}

impl Default for Similarity {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Similarity> for Similarity3<f64> {
    fn from(similarity: Similarity) -> Self {
        Similarity3::from_parts(
            Translation3::from(similarity.translation),
            *similarity.rotation.quaternion(),
            similarity.scale,
        )
    }
}

impl Mul for Similarity {
    type Output = Similarity;

    fn mul(self, rhs: Similarity) -> Similarity {
        self.compose(&rhs)
    }
}

impl Mul<Point3<f64>> for Similarity {
    type Output = Point3<f64>;

    fn mul(self, rhs: Point3<f64>) -> Point3<f64> {
        self.transform_point(&rhs)
    }
}

impl AbsDiffEq for Similarity {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.scale.abs_diff_eq(&other.scale, epsilon)
            && self.rotation.abs_diff_eq(&other.rotation, epsilon)
            && self.translation.abs_diff_eq(&other.translation, epsilon)
    }
}

impl RelativeEq for Similarity {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.scale.relative_eq(&other.scale, epsilon, max_relative)
            && self
                .rotation
                .relative_eq(&other.rotation, epsilon, max_relative)
            && self
                .translation
                .relative_eq(&other.translation, epsilon, max_relative)
    }
}
