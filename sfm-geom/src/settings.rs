#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The settings shared by the similarity estimators.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SimilaritySettings {
    /// The threshold by which the singular value or eigen decomposition is considered complete
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_epsilon"))]
    pub epsilon: f64,
    /// The maximum number of iterations the decomposition may run before it is considered failed
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_max_iterations"))]
    pub max_iterations: usize,
    /// The smallest relative conditioning of the correspondences that is accepted.
    /// Below this the correspondences are treated as collinear and the estimate fails.
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_minimum_conditioning")
    )]
    pub minimum_conditioning: f64,
}

impl Default for SimilaritySettings {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            max_iterations: default_max_iterations(),
            minimum_conditioning: default_minimum_conditioning(),
        }
    }
}

fn default_epsilon() -> f64 {
    1e-12
}

fn default_max_iterations() -> usize {
    1000
}

fn default_minimum_conditioning() -> f64 {
    1e-9
}

#[cfg(all(test, feature = "serde-serialize"))]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let settings: SimilaritySettings =
            serde_json::from_str(r#"{ "minimum_conditioning": 1e-6 }"#).unwrap();
        assert_eq!(
            settings,
            SimilaritySettings {
                minimum_conditioning: 1e-6,
                ..Default::default()
            }
        );
    }
}
