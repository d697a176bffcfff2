use crate::{Error, Result};
use alloc::{format, vec::Vec};
use approx::{AbsDiffEq, RelativeEq};
use core::fmt;
use core::ops::Mul;
use core::str::FromStr;
use derive_more::{AsRef, From, Into};
use nalgebra::{Matrix3, Point3, Quaternion, Rotation3, Unit, UnitQuaternion, Vector3, Vector4};
use num_traits::Float;
#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The largest Frobenius norm of `transpose(M) * M - I` for which `M` is accepted
/// as orthonormal by [`Rotation::from_matrix`].
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// A rotation in 3d space, stored as a unit quaternion.
///
/// Every constructor normalizes the quaternion, so the norm is always `1.0`.
/// The rotation can be converted losslessly (up to floating point rounding) to and from
/// rotation matrices, Rodrigues vectors (see [`Rotation::from_rodrigues`]) and
/// yaw, pitch and roll.
///
/// Two quaternions `q` and `-q` describe the same rotation. Equality takes this into
/// account: two rotations compare equal if their coefficients are equal or if they are
/// equal after negating one of them. The `approx` traits follow the same rule.
///
/// ```
/// use sfm_core::nalgebra::Vector3;
/// use sfm_core::Rotation;
///
/// let rotation = Rotation::from_axis_angle(&Vector3::z(), std::f64::consts::FRAC_PI_2).unwrap();
/// let rotated = rotation * Vector3::x();
/// assert!((rotated - Vector3::y()).norm() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, AsRef, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Rotation(UnitQuaternion<f64>);

impl Rotation {
    /// The rotation which leaves every vector unchanged.
    pub fn identity() -> Self {
        Self(UnitQuaternion::identity())
    }

    /// Creates a rotation from a quaternion, normalizing it.
    ///
    /// Fails if the quaternion has a non-finite component or a norm of zero.
    pub fn from_quaternion(quaternion: Quaternion<f64>) -> Result<Self> {
        if !all_finite(quaternion.coords.iter()) {
            return Err(Error::invalid(format!(
                "quaternion {:?} has non-finite coefficients",
                quaternion.coords.as_slice()
            )));
        }
        Unit::try_new(quaternion, f64::epsilon())
            .map(Self)
            .ok_or_else(|| Error::invalid("quaternion has a norm of zero"))
    }

    /// Creates a rotation from a 4-vector of quaternion coefficients ordered `(i, j, k, w)`,
    /// the same layout as `Quaternion::coords` in `nalgebra`.
    pub fn from_vector(coords: Vector4<f64>) -> Result<Self> {
        Self::from_quaternion(Quaternion::from_vector(coords))
    }

    /// Creates a rotation of `angle` radians about `axis`. The axis does not need to be normalized.
    ///
    /// An `angle` of exactly `0.0` produces the identity rotation regardless of the axis.
    /// Otherwise the axis must have a non-zero length.
    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Result<Self> {
        if !angle.is_finite() || !all_finite(axis.iter()) {
            return Err(Error::invalid(format!(
                "axis {:?} and angle {} must be finite",
                axis.as_slice(),
                angle
            )));
        }
        if angle == 0.0 {
            return Ok(Self::identity());
        }
        let axis = Unit::try_new(*axis, f64::epsilon())
            .ok_or_else(|| Error::invalid("rotation axis has a length of zero"))?;
        Ok(Self(UnitQuaternion::from_axis_angle(&axis, angle)))
    }

    /// Creates a rotation from a Rodrigues vector.
    ///
    /// A Rodrigues vector is a minimal parameterization of rotation where the direction of
    /// the vector is the axis of rotation and the magnitude of the vector is the angle of
    /// rotation in radians. It is the tangent space of the rotation group at the identity,
    /// so this is the exponential map.
    pub fn from_rodrigues(rvec: &Vector3<f64>) -> Result<Self> {
        if !all_finite(rvec.iter()) {
            return Err(Error::invalid(format!(
                "Rodrigues vector {:?} has non-finite components",
                rvec.as_slice()
            )));
        }
        Ok(Self::exp(*rvec))
    }

    /// Creates a rotation from yaw, pitch and roll in radians.
    ///
    /// The rotation is `Rz(yaw) * Ry(pitch) * Rx(roll)`, so roll is applied to a vector first
    /// and yaw last.
    pub fn from_yaw_pitch_roll(yaw: f64, pitch: f64, roll: f64) -> Result<Self> {
        if ![yaw, pitch, roll].iter().all(|n| n.is_finite()) {
            return Err(Error::invalid(format!(
                "yaw {}, pitch {} and roll {} must be finite",
                yaw, pitch, roll
            )));
        }
        Ok(Self(UnitQuaternion::from_euler_angles(roll, pitch, yaw)))
    }

    /// Creates a rotation from an orthonormal matrix with a determinant of `+1`.
    ///
    /// Matrices that are not orthonormal within [`ORTHONORMAL_TOLERANCE`] or that contain
    /// a reflection (negative determinant) are rejected.
    pub fn from_matrix(matrix: &Matrix3<f64>) -> Result<Self> {
        if !all_finite(matrix.iter()) {
            return Err(Error::invalid("rotation matrix has non-finite entries"));
        }
        let deviation = (matrix.transpose() * matrix - Matrix3::identity()).norm();
        if deviation > ORTHONORMAL_TOLERANCE {
            return Err(Error::invalid(format!(
                "matrix is not orthonormal (deviation from identity of transpose(M) * M is {:e})",
                deviation
            )));
        }
        let determinant = matrix.determinant();
        if determinant <= 0.0 {
            return Err(Error::invalid(format!(
                "matrix has determinant {} and is a reflection",
                determinant
            )));
        }
        Ok(Self(UnitQuaternion::from_rotation_matrix(
            &Rotation3::from_matrix_unchecked(*matrix),
        )))
    }

    /// This is the exponential map. The input must be finite.
    fn exp(w: Vector3<f64>) -> Self {
        // Avoid dividing by a near-zero angle by using the first order expansion.
        let theta2 = w.norm_squared();
        if theta2 <= f64::epsilon() {
            let half = w * 0.5;
            Self(UnitQuaternion::new_normalize(Quaternion::new(
                1.0, half.x, half.y, half.z,
            )))
        } else {
            let theta = theta2.sqrt();
            let axis = Unit::new_unchecked(w / theta);
            Self(UnitQuaternion::from_axis_angle(&axis, theta))
        }
    }

    /// The underlying unit quaternion.
    pub fn quaternion(&self) -> &UnitQuaternion<f64> {
        &self.0
    }

    /// The quaternion coefficients ordered `(i, j, k, w)`.
    pub fn coords(&self) -> Vector4<f64> {
        self.0.coords
    }

    /// The axis of rotation.
    ///
    /// The axis is undefined for the identity rotation, in which case the +Z axis is
    /// returned. Near a zero angle the direction of the axis is numerically unreliable.
    pub fn axis(&self) -> Unit<Vector3<f64>> {
        self.0.axis().unwrap_or_else(Vector3::z_axis)
    }

    /// The angle of rotation about [`Rotation::axis`] in radians, within `[0, π]`.
    pub fn angle(&self) -> f64 {
        self.0.angle()
    }

    /// The Rodrigues vector `axis() * angle()`. This is the log map.
    pub fn rodrigues(&self) -> Vector3<f64> {
        self.0.scaled_axis()
    }

    /// The orthonormal rotation matrix.
    pub fn matrix(&self) -> Matrix3<f64> {
        self.rotation3().into_inner()
    }

    /// The rotation as an `nalgebra` rotation matrix.
    pub fn rotation3(&self) -> Rotation3<f64> {
        self.0.to_rotation_matrix()
    }

    /// Returns `(yaw, pitch, roll)` in radians using the convention of
    /// [`Rotation::from_yaw_pitch_roll`].
    pub fn yaw_pitch_roll(&self) -> (f64, f64, f64) {
        let (roll, pitch, yaw) = self.0.euler_angles();
        (yaw, pitch, roll)
    }

    /// The inverse rotation.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }

    /// Composes two rotations. The result applies `rhs` first and then `self`.
    #[must_use]
    pub fn compose(&self, rhs: &Self) -> Self {
        Self(self.0 * rhs.0)
    }

    /// Rotates a vector.
    ///
    /// To rotate many vectors it is faster to retrieve [`Rotation::matrix`] once and
    /// multiply by the matrix.
    pub fn transform_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.0 * vector
    }

    /// Rotates a point about the origin.
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.0 * point
    }

    /// The angle in radians of the rotation that takes `self` to `other`.
    pub fn angle_to(&self, other: &Self) -> f64 {
        self.0.angle_to(&other.0)
    }
}

fn all_finite<'a>(mut values: impl Iterator<Item = &'a f64>) -> bool {
    values.all(|n| n.is_finite())
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Rotation3<f64>> for Rotation {
    fn from(rotation: Rotation3<f64>) -> Self {
        Self(UnitQuaternion::from_rotation_matrix(&rotation))
    }
}

impl From<Rotation> for Rotation3<f64> {
    fn from(rotation: Rotation) -> Self {
        rotation.rotation3()
    }
}

impl PartialEq for Rotation {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.0.coords, other.0.coords);
        a == b || a == -b
    }
}

impl AbsDiffEq for Rotation {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        let (a, b) = (self.0.coords, other.0.coords);
        a.abs_diff_eq(&b, epsilon) || a.abs_diff_eq(&-b, epsilon)
    }
}

impl RelativeEq for Rotation {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        let (a, b) = (self.0.coords, other.0.coords);
        a.relative_eq(&b, epsilon, max_relative) || a.relative_eq(&-b, epsilon, max_relative)
    }
}

impl Mul for Rotation {
    type Output = Rotation;

    fn mul(self, rhs: Rotation) -> Rotation {
        self.compose(&rhs)
    }
}

impl Mul<Vector3<f64>> for Rotation {
    type Output = Vector3<f64>;

    fn mul(self, rhs: Vector3<f64>) -> Vector3<f64> {
        self.transform_vector(&rhs)
    }
}

impl Mul<Point3<f64>> for Rotation {
    type Output = Point3<f64>;

    fn mul(self, rhs: Point3<f64>) -> Point3<f64> {
        self.transform_point(&rhs)
    }
}

/// Writes the quaternion coefficients as `i j k w`.
impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.0.coords;
        write!(f, "{} {} {} {}", c.x, c.y, c.z, c.w)
    }
}

/// Parses four whitespace separated quaternion coefficients ordered `i j k w`.
impl FromStr for Rotation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split_whitespace()
            .map(|value| {
                value.parse::<f64>().map_err(|e| {
                    Error::invalid(format!("rotation coefficient {:?}: {}", value, e))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        match *values.as_slice() {
            [i, j, k, w] => Self::from_quaternion(Quaternion::new(w, i, j, k)),
            _ => Err(Error::invalid(format!(
                "expected 4 rotation coefficients, found {}",
                values.len()
            ))),
        }
    }
}

/// Interpolates from `a` to `b` along the shortest arc of the rotation manifold.
///
/// `fraction` must lie in `[0, 1]`: `0.0` yields `a` and `1.0` yields `b`. Any other value
/// (including NaN) is rejected rather than clamped.
///
/// The result is `a * exp(fraction * log(inverse(a) * b))`. Since the log map returns an
/// angle within `[0, π]`, the path taken is always the shorter one.
pub fn interpolate(a: &Rotation, b: &Rotation, fraction: f64) -> Result<Rotation> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(Error::invalid(format!(
            "interpolation fraction {} is outside of [0, 1]",
            fraction
        )));
    }
    let delta = a.inverse().compose(b).rodrigues();
    Ok(a.compose(&Rotation::exp(delta * fraction)))
}

/// Generates `n` rotations evenly spaced between `a` and `b`, excluding `a` and `b` themselves.
///
/// The rotations are at fractions `i / (n + 1)` for `i` in `1..=n` and are returned in
/// order from `a` towards `b`. `n` must be at least `1`.
pub fn interpolated_rotations(a: &Rotation, b: &Rotation, n: usize) -> Result<Vec<Rotation>> {
    if n == 0 {
        return Err(Error::invalid(
            "at least one interpolated rotation must be requested",
        ));
    }
    let denominator = (n + 1) as f64;
    (1..=n)
        .map(|i| interpolate(a, b, i as f64 / denominator))
        .collect()
}
