//! This crate contains the geometric algorithms that score and align structure-from-motion
//! reconstructions, built on the types from [`sfm_core`].
//!
//! ## Similarity estimation
//!
//! Two reconstructions of the same scene, or a reconstruction and surveyed ground truth, differ
//! by a [`Similarity`](sfm_core::Similarity). Given at least four corresponding points that
//! are not collinear, a [`SimilarityEstimator`] finds the similarity that minimizes
//! the sum of squared distances between `to` and the transformed `from`.
//!
//! - [`OrthoProcrustes`] solves it with a singular value decomposition
//! - [`HornQuaternion`] solves it with a symmetric eigen decomposition
//!
//! Both share [`SimilaritySettings`] and reach the same answer on the same inputs.
//!
//! ## Reprojection metrics
//!
//! A landmark `L` seen by camera `O` lands on the image at the projection `p`, but the feature
//! was observed at `f`. The distance between `p` and `f` on the image plane `@` is the
//! reprojection error.
//!
//! ```text
//!                 L
//!                / \
//!               /   \
//!   @@@@@@@@@@@p@@@@@f@@@@@@@
//!             /     /
//!            /    /
//!           /   /
//!          /  /
//!         / /
//!         O
//! ```
//!
//! [`reprojection_error`] scores one observation. [`reprojection_rmse`] and
//! [`reprojection_median_error`] summarize a whole reconstruction.

mod horn;
mod metrics;
mod procrustes;
mod settings;
mod similarity;

pub use horn::*;
pub use metrics::*;
pub use procrustes::*;
pub use settings::*;
pub use similarity::SimilarityEstimator;
