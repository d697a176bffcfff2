//! Reprojection error metrics.
//!
//! The reprojection error of an observation is the distance on the image between where
//! the camera projects the landmark and where the feature was actually observed. It is the
//! quantity bundle adjustment minimizes, and the usual way to score a reconstruction.
//!
//! The aggregate metrics take a snapshot of a reconstruction: cameras keyed by frame,
//! landmarks keyed by id, and the tracks. Reconstructions routinely leave some frames or
//! landmarks unreconstructed, so an observation is only included when both its camera and
//! its landmark are present. The others are skipped without error. If no observation at all
//! can be included, [`Error::NoObservations`] is returned.

use float_ord::FloatOrd;
use log::*;
use sfm_core::{
    nalgebra::Vector2, Camera, Error, FrameId, ImagePoint, Landmark, LandmarkId, Result, Track,
};
use std::collections::HashMap;
use std::hash::BuildHasher;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Computes the vector from the observed `feature` to the projection of `landmark` by
/// `camera`, in image coordinates.
pub fn reprojection_error_vector<C, L, F>(camera: &C, landmark: &L, feature: &F) -> Vector2<f64>
where
    C: Camera + ?Sized,
    L: Landmark + ?Sized,
    F: ImagePoint + ?Sized,
{
    camera.project(&landmark.location()) - feature.image_point()
}

/// Computes the squared distance between the projection of `landmark` by `camera` and the
/// observed `feature`.
pub fn reprojection_error_squared<C, L, F>(camera: &C, landmark: &L, feature: &F) -> f64
where
    C: Camera + ?Sized,
    L: Landmark + ?Sized,
    F: ImagePoint + ?Sized,
{
    reprojection_error_vector(camera, landmark, feature).norm_squared()
}

/// Computes the distance between the projection of `landmark` by `camera` and the
/// observed `feature`.
///
/// This is always the square root of [`reprojection_error_squared`].
pub fn reprojection_error<C, L, F>(camera: &C, landmark: &L, feature: &F) -> f64
where
    C: Camera + ?Sized,
    L: Landmark + ?Sized,
    F: ImagePoint + ?Sized,
{
    reprojection_error_squared(camera, landmark, feature).sqrt()
}

/// Running totals of the squared errors of included observations.
#[derive(Copy, Clone, Debug, Default)]
struct Accumulator {
    sum: f64,
    included: usize,
    skipped: usize,
}

impl Accumulator {
    fn merge(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            included: self.included + other.included,
            skipped: self.skipped + other.skipped,
        }
    }

    fn rmse(self) -> Result<f64> {
        debug!(
            "reprojection error over {} observations, skipped {} without a camera or landmark",
            self.included, self.skipped
        );
        if self.included == 0 {
            return Err(Error::NoObservations);
        }
        Ok((self.sum / self.included as f64).sqrt())
    }
}

/// Iterates the squared errors of the observations in `track` whose camera and landmark
/// are both present.
fn squared_errors<'a, C, L, F, S, T>(
    cameras: &'a HashMap<FrameId, C, S>,
    landmarks: &'a HashMap<LandmarkId, L, T>,
    track: &'a Track<F>,
) -> impl Iterator<Item = f64> + 'a
where
    C: Camera,
    L: Landmark,
    F: ImagePoint,
    S: BuildHasher,
    T: BuildHasher,
{
    let landmark = landmarks.get(&track.landmark());
    landmark
        .into_iter()
        .flat_map(move |landmark| {
            track.observations().filter_map(move |(frame, feature)| {
                cameras
                    .get(&frame)
                    .map(|camera| reprojection_error_squared(camera, landmark, feature))
            })
        })
}

fn accumulate_track<C, L, F, S, T>(
    cameras: &HashMap<FrameId, C, S>,
    landmarks: &HashMap<LandmarkId, L, T>,
    track: &Track<F>,
) -> Accumulator
where
    C: Camera,
    L: Landmark,
    F: ImagePoint,
    S: BuildHasher,
    T: BuildHasher,
{
    let (sum, included) = squared_errors(cameras, landmarks, track)
        .fold((0.0, 0), |(sum, included), e| (sum + e, included + 1));
    Accumulator {
        sum,
        included,
        skipped: track.len() - included,
    }
}

/// Computes the root-mean-square reprojection error over every observation in `tracks`
/// whose camera and landmark are in `cameras` and `landmarks`.
///
/// Fails with [`Error::NoObservations`] if no observation can be included.
pub fn reprojection_rmse<C, L, F, S, T>(
    cameras: &HashMap<FrameId, C, S>,
    landmarks: &HashMap<LandmarkId, L, T>,
    tracks: &[Track<F>],
) -> Result<f64>
where
    C: Camera,
    L: Landmark,
    F: ImagePoint,
    S: BuildHasher,
    T: BuildHasher,
{
    tracks
        .iter()
        .map(|track| accumulate_track(cameras, landmarks, track))
        .fold(Accumulator::default(), Accumulator::merge)
        .rmse()
}

/// The same as [`reprojection_rmse`], but the tracks are processed in parallel.
///
/// Partial sums are merged in an unspecified order, so the result may differ from
/// [`reprojection_rmse`] in the lowest bits.
#[cfg(feature = "rayon")]
pub fn par_reprojection_rmse<C, L, F, S, T>(
    cameras: &HashMap<FrameId, C, S>,
    landmarks: &HashMap<LandmarkId, L, T>,
    tracks: &[Track<F>],
) -> Result<f64>
where
    C: Camera + Sync,
    L: Landmark + Sync,
    F: ImagePoint + Sync,
    S: BuildHasher + Sync,
    T: BuildHasher + Sync,
{
    tracks
        .par_iter()
        .map(|track| accumulate_track(cameras, landmarks, track))
        .reduce(Accumulator::default, Accumulator::merge)
        .rmse()
}

/// Computes the reprojection error of every observation whose camera and landmark are present,
/// in track order and then frame order.
pub fn reprojection_errors<C, L, F, S, T>(
    cameras: &HashMap<FrameId, C, S>,
    landmarks: &HashMap<LandmarkId, L, T>,
    tracks: &[Track<F>],
) -> Vec<f64>
where
    C: Camera,
    L: Landmark,
    F: ImagePoint,
    S: BuildHasher,
    T: BuildHasher,
{
    tracks
        .iter()
        .flat_map(|track| squared_errors(cameras, landmarks, track))
        .map(f64::sqrt)
        .collect()
}

/// Computes the median reprojection error over the same observations as [`reprojection_rmse`].
///
/// With an even number of observations this is the mean of the two middle errors.
/// The median is much less sensitive to outlier observations than the RMSE.
pub fn reprojection_median_error<C, L, F, S, T>(
    cameras: &HashMap<FrameId, C, S>,
    landmarks: &HashMap<LandmarkId, L, T>,
    tracks: &[Track<F>],
) -> Result<f64>
where
    C: Camera,
    L: Landmark,
    F: ImagePoint,
    S: BuildHasher,
    T: BuildHasher,
{
    let mut errors = reprojection_errors(cameras, landmarks, tracks);
    if errors.is_empty() {
        return Err(Error::NoObservations);
    }
    errors.sort_unstable_by_key(|&e| FloatOrd(e));
    let middle = errors.len() / 2;
    if errors.len() % 2 == 0 {
        Ok((errors[middle - 1] + errors[middle]) / 2.0)
    } else {
        Ok(errors[middle])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sfm_core::{
        nalgebra::{Point2, Point3},
        Feature, LandmarkPoint,
    };
    use std::sync::Arc;

    /// Orthographic camera looking down -Z, shifted by an image offset.
    struct Orthographic(Vector2<f64>);

    impl Camera for Orthographic {
        fn project(&self, point: &Point3<f64>) -> Point2<f64> {
            point.xy() + self.0
        }
    }

    fn snapshot() -> (
        HashMap<FrameId, Orthographic>,
        HashMap<LandmarkId, LandmarkPoint>,
    ) {
        let cameras = [
            (FrameId(0), Orthographic(Vector2::new(0.0, 0.0))),
            (FrameId(1), Orthographic(Vector2::new(10.0, 0.0))),
        ]
        .into_iter()
        .collect();
        let landmarks = [
            (LandmarkId(0), LandmarkPoint::new(1.0, 2.0, 5.0)),
            (LandmarkId(1), LandmarkPoint::new(-1.0, 0.0, 3.0)),
        ]
        .into_iter()
        .collect();
        (cameras, landmarks)
    }

    #[test]
    fn error_vector_points_from_feature_to_projection() {
        let camera = Orthographic(Vector2::new(10.0, 0.0));
        let landmark = Point3::new(1.0, 2.0, 5.0);
        let feature = Feature::new(8.0, 6.0);
        let error = reprojection_error_vector(&camera, &landmark, &feature);
        assert_eq!(error, Vector2::new(3.0, -4.0));
        assert_eq!(reprojection_error_squared(&camera, &landmark, &feature), 25.0);
        assert_eq!(reprojection_error(&camera, &landmark, &feature), 5.0);
    }

    #[test]
    fn squared_error_is_square_of_error() {
        let camera = Orthographic(Vector2::new(0.3, -7.1));
        for (landmark, feature) in [
            (Point3::new(0.1, 0.2, 0.3), Point2::new(4.0, 1.0)),
            (Point3::new(-3.0, 2.5, 1.0), Point2::new(-2.5, -4.5)),
            (Point3::new(1e3, 1e-3, 0.0), Point2::new(0.0, 0.0)),
        ] {
            let error = reprojection_error(&camera, &landmark, &feature);
            assert_relative_eq!(
                reprojection_error_squared(&camera, &landmark, &feature),
                error * error,
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn exact_observation_has_zero_rmse() {
        let (cameras, landmarks) = snapshot();
        let track = Track::from_observations(LandmarkId(0), [(FrameId(1), Feature::new(11.0, 2.0))]);
        assert_eq!(reprojection_rmse(&cameras, &landmarks, &[track]).unwrap(), 0.0);
    }

    #[test]
    fn rmse_over_observations() {
        let (cameras, landmarks) = snapshot();
        let tracks = [
            // Errors of 3 and 4.
            Track::from_observations(
                LandmarkId(0),
                [
                    (FrameId(0), Feature::new(1.0, 5.0)),
                    (FrameId(1), Feature::new(15.0, 2.0)),
                ],
            ),
            // Error of 0 and an observation on a frame without a camera.
            Track::from_observations(
                LandmarkId(1),
                [
                    (FrameId(0), Feature::new(-1.0, 0.0)),
                    (FrameId(9), Feature::new(100.0, 100.0)),
                ],
            ),
        ];
        let rmse = reprojection_rmse(&cameras, &landmarks, &tracks).unwrap();
        assert_relative_eq!(rmse, (25.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        let errors = reprojection_errors(&cameras, &landmarks, &tracks);
        assert_eq!(errors, [3.0, 4.0, 0.0]);
        assert_eq!(reprojection_median_error(&cameras, &landmarks, &tracks).unwrap(), 3.0);
    }

    #[test]
    fn median_of_even_count() {
        let (cameras, landmarks) = snapshot();
        let tracks = [Track::from_observations(
            LandmarkId(0),
            [
                (FrameId(0), Feature::new(1.0, 5.0)),
                (FrameId(1), Feature::new(16.0, 2.0)),
            ],
        )];
        assert_eq!(reprojection_median_error(&cameras, &landmarks, &tracks).unwrap(), 4.0);
    }

    #[test]
    fn missing_landmarks_have_no_observations() {
        let (cameras, landmarks) = snapshot();
        let tracks = [
            Track::from_observations(LandmarkId(5), [(FrameId(0), Feature::new(0.0, 0.0))]),
            Track::from_observations(LandmarkId(6), [(FrameId(1), Feature::new(0.0, 0.0))]),
        ];
        assert_eq!(
            reprojection_rmse(&cameras, &landmarks, &tracks),
            Err(Error::NoObservations)
        );
        assert_eq!(
            reprojection_median_error(&cameras, &landmarks, &tracks),
            Err(Error::NoObservations)
        );
        assert!(reprojection_errors(&cameras, &landmarks, &tracks).is_empty());
    }

    #[test]
    fn no_tracks_have_no_observations() {
        let (cameras, landmarks) = snapshot();
        let tracks: [Track<Feature>; 0] = [];
        assert_eq!(
            reprojection_rmse(&cameras, &landmarks, &tracks),
            Err(Error::NoObservations)
        );
    }

    #[test]
    fn shared_pointers_can_be_used() {
        let cameras: HashMap<FrameId, Arc<dyn Camera>> =
            [(FrameId(3), Arc::new(Orthographic(Vector2::zeros())) as Arc<dyn Camera>)]
                .into_iter()
                .collect();
        let landmarks: HashMap<LandmarkId, Arc<LandmarkPoint>> =
            [(LandmarkId(2), Arc::new(LandmarkPoint::new(0.0, 3.0, 1.0)))]
                .into_iter()
                .collect();
        let tracks = [Track::from_observations(
            LandmarkId(2),
            [(FrameId(3), Point2::new(4.0, 0.0))],
        )];
        assert_eq!(reprojection_rmse(&cameras, &landmarks, &tracks).unwrap(), 5.0);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn parallel_matches_sequential() {
        let (cameras, landmarks) = snapshot();
        let tracks: Vec<_> = (0..100)
            .map(|i| {
                let offset = i as f64 * 0.01;
                Track::from_observations(
                    LandmarkId(i % 3),
                    [
                        (FrameId(0), Feature::new(1.0 + offset, 2.0)),
                        (FrameId(1), Feature::new(11.0, 2.0 - offset)),
                    ],
                )
            })
            .collect();
        let sequential = reprojection_rmse(&cameras, &landmarks, &tracks).unwrap();
        let parallel = par_reprojection_rmse(&cameras, &landmarks, &tracks).unwrap();
        assert_relative_eq!(sequential, parallel, max_relative = 1e-12);
    }
}
