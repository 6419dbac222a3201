//! Per-source failure handling for fan-out aggregation

use serde::{Deserialize, Serialize};

/// What to do when one source query fails during a fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// The whole computation fails with the first upstream error.
    #[default]
    Abort,
    /// Failed sources contribute 0 and are listed in `sourceErrors`.
    Isolate,
}

impl FailurePolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "abort" => Some(Self::Abort),
            "isolate" => Some(Self::Isolate),
            _ => None,
        }
    }
}

/// A source that could not be read under [`FailurePolicy::Isolate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFailure {
    pub source_key: String,
    pub message: String,
}
