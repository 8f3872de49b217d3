//! JSON output format for the generic speedup report

use crate::aggregate::Summary;
use crate::baseline::Confidence;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Baseline predicate as it appears in JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonBaseline {
    pub field: String,
    pub value: String,
}

/// One derived row
#[derive(Debug, Clone, Serialize)]
pub struct JsonDerivedRow {
    /// Group key values, in `group_by` order
    pub key: Vec<String>,
    /// Value of the summarize-by dimension
    pub label: String,
    pub is_baseline: bool,
    pub value: f64,
    pub ratio: f64,
    /// Present only when the ratio is not a plain measurement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<Confidence>,
}

/// Ratio summary for one summarize-by value
#[derive(Debug, Clone, Serialize)]
pub struct JsonGroupSummary {
    pub label: String,
    pub summary: Summary,
    /// Group key of the row with the highest ratio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best: Option<String>,
}

/// Complete speedup report
#[derive(Debug, Clone, Serialize)]
pub struct JsonSpeedupReport {
    pub input: String,
    pub group_by: Vec<String>,
    pub baseline: JsonBaseline,
    pub metric: String,
    pub rows: Vec<JsonDerivedRow>,
    pub summaries: Vec<JsonGroupSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Pretty-printed JSON with a trailing newline
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut text = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    text.push('\n');
    Ok(text)
}
