use nalgebra::{Point2, Point3};
use alloc::{boxed::Box, rc::Rc, sync::Arc};

/// A camera which can project world points into its image.
///
/// The camera model itself (intrinsics, distortion, pose) belongs to the implementor.
/// Metrics in this ecosystem only ever need the projection.
pub trait Camera {
    /// Projects a point in world coordinates to a location on the image in pixels.
    ///
    /// The image point uses a coordinate frame where X is right and Y is down.
    fn project(&self, point: &Point3<f64>) -> Point2<f64>;
}

impl<C> Camera for &C
where
    C: Camera + ?Sized,
{
    fn project(&self, point: &Point3<f64>) -> Point2<f64> {
        (**self).project(point)
    }
}

impl<C> Camera for Box<C>
where
    C: Camera + ?Sized,
{
    fn project(&self, point: &Point3<f64>) -> Point2<f64> {
        (**self).project(point)
    }
}

impl<C> Camera for Rc<C>
where
    C: Camera + ?Sized,
{
    fn project(&self, point: &Point3<f64>) -> Point2<f64> {
        (**self).project(point)
    }
}

impl<C> Camera for Arc<C>
where
    C: Camera + ?Sized,
{
    fn project(&self, point: &Point3<f64>) -> Point2<f64> {
        (**self).project(point)
    }
}
