//! # SfM Core
//!
//! This library provides the common geometric types and abstractions for structure-from-motion
//! and photogrammetry in Rust. All the `sfm-*` crates that produce or consume orientations,
//! similarity transforms, or reconstructions depend on this crate, which keeps it small.
//! It re-exports [`nalgebra`], so that every crate in the ecosystem agrees on one version of
//! the vector and matrix types.
//!
//! ## Rotations
//!
//! A [`Rotation`] is stored as a unit quaternion. Rotation matrices, Rodrigues vectors
//! (axis times angle) and yaw/pitch/roll are all conversions in and out of it. Two rotations
//! can be composed with `*`, and [`interpolate`] walks the shortest arc between two of them.
//!
//! ## Similarities
//!
//! A reconstruction made only from images is known up to a rotation, a translation and a
//! uniform scale. A [`Similarity`] is exactly that transform, and it is what relates two
//! reconstructions of the same scene or a reconstruction and surveyed ground truth.
//!
//! ## Reconstructions
//!
//! The types a reconstruction is made of are defined by other crates. This crate only
//! specifies what the geometry needs from them:
//!
//! * a [`Camera`] projects a world point onto its image
//! * a [`Landmark`] has a location in the world
//! * a feature implements [`ImagePoint`] and has a location on the image
//! * a [`Track`] is the set of features observing one landmark, keyed by [`FrameId`]
//!
//! ```text
//!            landmark
//!               *
//!              / \
//!             /   \
//!   @@@@@@@@@f@@   @@f@@@@@@@@@   <- features on two frames
//!           /         \
//!          O           O          <- cameras
//! ```

#![no_std]

extern crate alloc;

mod camera;
mod error;
mod keypoint;
mod point;
mod rotation;
mod similarity;
mod track;

pub use camera::*;
pub use error::*;
pub use keypoint::*;
pub use nalgebra;
pub use point::*;
pub use rotation::*;
pub use similarity::*;
pub use track::*;
