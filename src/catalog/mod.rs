//! Static lookup tables: class labels, display names and treatment guidance.

pub mod classes;
pub mod guidance;

use serde::Serialize;

pub use classes::{display_name, CLASS_NAMES};
pub use guidance::{default_guidance, guidance_for, Guidance, Severity};

/// Coarse confidence bucket for a softmax score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// `> 0.8` is High, `> 0.5` is Medium, anything else Low.
    /// Exact boundary values fall into the lower tier.
    pub fn from_score(score: f64) -> ConfidenceTier {
        if score > 0.8 {
            ConfidenceTier::High
        } else if score > 0.5 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}
