//! Baseline joiner
//!
//! Partitions records into comparison groups and derives ratios against the
//! designated baseline record of each group.
//!
//! Conventions:
//! - the first record matching the baseline predicate wins
//! - a group without a baseline gets neutral 1.0 ratios and one warning
//! - a zero baseline value yields 0.0, flagged as low confidence
//! - the baseline's own ratio is exactly 1.0

use crate::loader::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Tuple of dimension values identifying a comparison group
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey(pub Vec<String>);

impl GroupKey {
    /// Build the key of `record` over `fields` (absent fields become "")
    pub fn of<R: Record>(record: &R, fields: &[String]) -> Self {
        GroupKey(
            fields
                .iter()
                .map(|f| record.dimension(f).unwrap_or_default().to_string())
                .collect(),
        )
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Which records are comparable and which one of them is the reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineSpec {
    /// Ordered dimension names forming the group key
    pub group_by: Vec<String>,
    /// Dimension that identifies the baseline
    pub field: String,
    /// Value of `field` that marks the baseline record
    pub value: String,
}

impl BaselineSpec {
    pub fn new(group_by: &[&str], field: &str, value: &str) -> Self {
        Self {
            group_by: group_by.iter().map(|s| s.to_string()).collect(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Parse a `field=value` predicate
    pub fn parse_predicate(predicate: &str) -> Option<(String, String)> {
        let (field, value) = predicate.split_once('=')?;
        let (field, value) = (field.trim(), value.trim());
        if field.is_empty() || value.is_empty() {
            return None;
        }
        Some((field.to_string(), value.to_string()))
    }

    pub fn is_baseline<R: Record>(&self, record: &R) -> bool {
        record.dimension(&self.field) == Some(self.value.as_str())
    }
}

/// How much a derived ratio can be trusted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Ratio of two real measurements
    #[default]
    Measured,
    /// Denominator was exactly zero; ratio defined as 0.0
    ZeroBaseline,
    /// Group has no baseline; ratio defined as 1.0
    NoBaseline,
}

impl Confidence {
    pub fn is_flagged(self) -> bool {
        self != Confidence::Measured
    }

    pub fn marker(self) -> &'static str {
        match self {
            Confidence::Measured => "",
            Confidence::ZeroBaseline => "zero-baseline",
            Confidence::NoBaseline => "no-baseline",
        }
    }

    /// The first flagged confidence among `ratios`, else `Measured`
    pub fn of_all<'a>(ratios: impl IntoIterator<Item = &'a Ratio>) -> Confidence {
        ratios
            .into_iter()
            .map(|r| r.confidence)
            .find(|c| c.is_flagged())
            .unwrap_or(Confidence::Measured)
    }
}

/// A derived ratio with its confidence flag
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ratio {
    pub value: f64,
    pub confidence: Confidence,
}

impl Ratio {
    pub const IDENTITY: Ratio = Ratio {
        value: 1.0,
        confidence: Confidence::Measured,
    };

    pub const NEUTRAL: Ratio = Ratio {
        value: 1.0,
        confidence: Confidence::NoBaseline,
    };

    /// `numerator / denominator`, or 0.0 (flagged) when the denominator is zero
    pub fn of(numerator: f64, denominator: f64) -> Ratio {
        if denominator == 0.0 {
            Ratio {
                value: 0.0,
                confidence: Confidence::ZeroBaseline,
            }
        } else {
            Ratio {
                value: numerator / denominator,
                confidence: Confidence::Measured,
            }
        }
    }
}

/// A comparison group lacked its reference configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoBaselineWarning {
    pub key: GroupKey,
    pub field: String,
    pub value: String,
}

impl fmt::Display for NoBaselineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "No {}={} baseline for group {}",
            self.field, self.value, self.key
        )
    }
}

/// Members of one comparison group, as indices into the input slice
#[derive(Debug, Clone)]
pub struct Group {
    pub key: GroupKey,
    pub members: Vec<usize>,
    pub baseline: Option<usize>,
}

/// Partition `records` into groups in first-occurrence order
///
/// Emits one `NoBaselineWarning` per group without a baseline.
pub fn index_groups<R: Record>(
    records: &[R],
    spec: &BaselineSpec,
) -> (Vec<Group>, Vec<NoBaselineWarning>) {
    let mut groups: Vec<Group> = Vec::new();
    let mut positions: HashMap<GroupKey, usize> = HashMap::new();

    for (idx, record) in records.iter().enumerate() {
        let key = GroupKey::of(record, &spec.group_by);
        let slot = *positions.entry(key.clone()).or_insert_with(|| {
            groups.push(Group {
                key,
                members: Vec::new(),
                baseline: None,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.members.push(idx);
        if group.baseline.is_none() && spec.is_baseline(record) {
            group.baseline = Some(idx);
        }
    }

    let warnings: Vec<NoBaselineWarning> = groups
        .iter()
        .filter(|g| g.baseline.is_none())
        .map(|g| NoBaselineWarning {
            key: g.key.clone(),
            field: spec.field.clone(),
            value: spec.value.clone(),
        })
        .collect();
    for w in &warnings {
        warn!("{w}");
    }

    (groups, warnings)
}

/// One record with its ratio against the group baseline
#[derive(Debug, Clone)]
pub struct Derived<'a, R> {
    pub record: &'a R,
    pub key: GroupKey,
    pub is_baseline: bool,
    pub ratio: Ratio,
}

/// Output of a baseline join
#[derive(Debug, Clone)]
pub struct Joined<'a, R> {
    /// Derived rows in input order
    pub rows: Vec<Derived<'a, R>>,
    pub warnings: Vec<NoBaselineWarning>,
}

/// Derive `metric(record) / metric(baseline)` for every record
pub fn join<'a, R, F>(records: &'a [R], spec: &BaselineSpec, metric: F) -> Joined<'a, R>
where
    R: Record,
    F: Fn(&R) -> f64,
{
    let (groups, warnings) = index_groups(records, spec);

    let mut slots: Vec<Option<Derived<'a, R>>> = (0..records.len()).map(|_| None).collect();
    for group in &groups {
        for &idx in &group.members {
            let record = &records[idx];
            let is_baseline = group.baseline == Some(idx);
            let ratio = match group.baseline {
                None => Ratio::NEUTRAL,
                Some(_) if is_baseline => Ratio::IDENTITY,
                Some(b) => Ratio::of(metric(record), metric(&records[b])),
            };
            slots[idx] = Some(Derived {
                record,
                key: group.key.clone(),
                is_baseline,
                ratio,
            });
        }
    }

    Joined {
        rows: slots.into_iter().flatten().collect(),
        warnings,
    }
}
