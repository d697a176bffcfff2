use derive_more::{Display, From, Into};
use alloc::collections::BTreeMap;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Identifies a frame (and therefore the camera which captured it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FrameId(pub u64);

/// Identifies a landmark in a reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct LandmarkId(pub u64);

/// The observations of a single landmark across frames.
///
/// A track holds at most one observed feature per frame, and iterates its observations
/// in frame order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Track<F> {
    landmark: LandmarkId,
    observations: BTreeMap<FrameId, F>,
}

impl<F> Track<F> {
    /// Creates a track for `landmark` without any observations.
    pub fn new(landmark: LandmarkId) -> Self {
        Self {
            landmark,
            observations: BTreeMap::new(),
        }
    }

    /// Creates a track from `(frame, feature)` pairs.
    ///
    /// If a frame appears more than once, the last feature for it is kept.
    pub fn from_observations(
        landmark: LandmarkId,
        observations: impl IntoIterator<Item = (FrameId, F)>,
    ) -> Self {
        Self {
            landmark,
            observations: observations.into_iter().collect(),
        }
    }

    /// The landmark this track observes.
    pub fn landmark(&self) -> LandmarkId {
        self.landmark
    }

    /// Adds the observation of the landmark on `frame`, returning the feature it replaced.
    pub fn insert(&mut self, frame: FrameId, feature: F) -> Option<F> {
        self.observations.insert(frame, feature)
    }

    /// The feature observed on `frame`, if any.
    pub fn observation(&self, frame: FrameId) -> Option<&F> {
        self.observations.get(&frame)
    }

    /// Iterates over `(frame, feature)` in frame order.
    pub fn observations(&self) -> impl Iterator<Item = (FrameId, &F)> + Clone + '_ {
        self.observations.iter().map(|(&frame, feature)| (frame, feature))
    }

    /// Iterates over the frames with an observation in order.
    pub fn frames(&self) -> impl Iterator<Item = FrameId> + Clone + '_ {
        self.observations.keys().copied()
    }

    pub fn first_frame(&self) -> Option<FrameId> {
        self.observations.keys().next().copied()
    }

    pub fn last_frame(&self) -> Option<FrameId> {
        self.observations.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
