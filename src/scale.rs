//! Dataset scale buckets
//!
//! Benchmarks bucket their inputs into six fixed scales. The label set is
//! closed: labels outside it are kept verbatim on records but are dropped
//! (with a warning) from any scale-ordered table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named dataset-size bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scale {
    Tiny,
    Small,
    Medium,
    Large,
    VeryLarge,
    Huge,
}

impl Scale {
    /// All scales, smallest first
    pub const ALL: [Scale; 6] = [
        Scale::Tiny,
        Scale::Small,
        Scale::Medium,
        Scale::Large,
        Scale::VeryLarge,
        Scale::Huge,
    ];

    /// Canonical label as it appears in benchmark CSVs
    pub fn label(self) -> &'static str {
        match self {
            Scale::Tiny => "Tiny",
            Scale::Small => "Small",
            Scale::Medium => "Medium",
            Scale::Large => "Large",
            Scale::VeryLarge => "VeryLarge",
            Scale::Huge => "Huge",
        }
    }

    /// Parse a canonical label (exact match)
    pub fn from_label(label: &str) -> Option<Scale> {
        Scale::ALL.into_iter().find(|s| s.label() == label)
    }

    /// Parse a label case-insensitively, accepting the short `vlarge` alias
    pub fn from_alias(label: &str) -> Option<Scale> {
        match label.to_ascii_lowercase().as_str() {
            "tiny" => Some(Scale::Tiny),
            "small" => Some(Scale::Small),
            "medium" => Some(Scale::Medium),
            "large" => Some(Scale::Large),
            "vlarge" | "verylarge" | "very_large" => Some(Scale::VeryLarge),
            "huge" => Some(Scale::Huge),
            _ => None,
        }
    }

    /// Approximate number of sequences in the bucket
    pub fn num_sequences(self) -> u64 {
        10u64.pow(self.log10())
    }

    /// Order of magnitude of the sequence count (Tiny = 2 ... Huge = 7)
    pub fn log10(self) -> u32 {
        match self {
            Scale::Tiny => 2,
            Scale::Small => 3,
            Scale::Medium => 4,
            Scale::Large => 5,
            Scale::VeryLarge => 6,
            Scale::Huge => 7,
        }
    }

    /// Canonical labels in order, for use as a pivot axis
    pub fn labels() -> Vec<String> {
        Scale::ALL.iter().map(|s| s.label().to_string()).collect()
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
