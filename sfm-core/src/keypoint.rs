use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::Point2;
use alloc::{boxed::Box, rc::Rc, sync::Arc};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Allows the retrieval of the point on the image the feature came from.
pub trait ImagePoint {
    /// Retrieves the point on the image
    fn image_point(&self) -> Point2<f64>;
}

/// A feature observed on an image frame, in pixel coordinates.
///
/// This means the location is neither undistorted nor normalized, and it can be compared
/// directly with the output of [`Camera::project`](crate::Camera::project).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Feature(pub Point2<f64>);

impl Feature {
    pub fn new(x: f64, y: f64) -> Self {
        Self(Point2::new(x, y))
    }
}

impl ImagePoint for Feature {
    fn image_point(&self) -> Point2<f64> {
        self.0
    }
}

impl ImagePoint for Point2<f64> {
    fn image_point(&self) -> Point2<f64> {
        *self
    }
}

impl<P: ImagePoint + ?Sized> ImagePoint for &P {
    fn image_point(&self) -> Point2<f64> {
        (**self).image_point()
    }
}

impl<P: ImagePoint + ?Sized> ImagePoint for Box<P> {
    fn image_point(&self) -> Point2<f64> {
        (**self).image_point()
    }
}

impl<P: ImagePoint + ?Sized> ImagePoint for Rc<P> {
    fn image_point(&self) -> Point2<f64> {
        (**self).image_point()
    }
}

impl<P: ImagePoint + ?Sized> ImagePoint for Arc<P> {
    fn image_point(&self) -> Point2<f64> {
        (**self).image_point()
    }
}
