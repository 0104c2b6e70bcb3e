use serde::{Deserialize, Serialize};

/// Thresholds applied to the satisfied/applicable ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    /// Ratio at or above which a citizen counts as eligible.
    pub eligible_threshold: f64,
    /// Ratio at or above which a non-eligible scheme still makes the shortlist.
    pub shortlist_threshold: f64,
}

impl EligibilityPolicy {
    pub const fn standard() -> Self {
        Self {
            eligible_threshold: 0.7,
            shortlist_threshold: 0.5,
        }
    }
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
