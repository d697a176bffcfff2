use alloc::string::String;
use thiserror::Error;

/// The result type used by every fallible operation in the `sfm-*` crates.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Failures reported by the geometry core.
///
/// None of these are recovered internally. A caller that gets an [`Error`] back
/// must not treat the computation as having produced a value, in particular an
/// estimator failure is never reported as an identity transform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The inputs violate a precondition (mismatched or insufficient
    /// correspondences, malformed rotation inputs, out of range fractions).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The inputs are well-formed, but the problem they describe is rank deficient
    /// or the underlying decomposition failed to converge.
    #[error("numerical degeneracy: {0}")]
    NumericalDegeneracy(String),
    /// An aggregate metric was requested, but no observation had both its camera
    /// and its landmark present in the reconstruction.
    #[error("no observations had both a camera and a landmark in the reconstruction")]
    NoObservations,
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    /// Returns `true` if this is an [`Error::InvalidArgument`].
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Returns `true` if this is an [`Error::NumericalDegeneracy`].
    pub fn is_numerical_degeneracy(&self) -> bool {
        matches!(self, Self::NumericalDegeneracy(_))
    }
}
