use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::Point3;
use alloc::{boxed::Box, rc::Rc, sync::Arc};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A reconstructed 3d point in the world.
pub trait Landmark {
    /// The location of the landmark in world coordinates.
    fn location(&self) -> Point3<f64>;
}

/// A landmark that is only a location in "world" coordinates.
///
/// The real-world units of the reconstruction are typically unknown. If the whole world
/// is scaled by any factor (cameras included), every image observation stays the same.
/// Two reconstructions of the same scene are therefore related by a [`Similarity`](crate::Similarity),
/// which can be recovered from corresponding landmarks.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct LandmarkPoint(pub Point3<f64>);

impl LandmarkPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Point3::new(x, y, z))
    }
}

impl Landmark for LandmarkPoint {
    fn location(&self) -> Point3<f64> {
        self.0
    }
}

impl Landmark for Point3<f64> {
    fn location(&self) -> Point3<f64> {
        *self
    }
}

impl<L: Landmark + ?Sized> Landmark for &L {
    fn location(&self) -> Point3<f64> {
        (**self).location()
    }
}

impl<L: Landmark + ?Sized> Landmark for Box<L> {
    fn location(&self) -> Point3<f64> {
        (**self).location()
    }
}

impl<L: Landmark + ?Sized> Landmark for Rc<L> {
    fn location(&self) -> Point3<f64> {
        (**self).location()
    }
}

impl<L: Landmark + ?Sized> Landmark for Arc<L> {
    fn location(&self) -> Point3<f64> {
        (**self).location()
    }
}
