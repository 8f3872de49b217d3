//! Aggregator: dimensional grouping, summaries, best-row selection, pivots

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use tracing::warn;

/// Summary statistics of one metric over a group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0.0 for a single value
    pub std_dev: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    /// Summarize `values`; `None` when empty
    pub fn from_values(values: &[f64]) -> Option<Summary> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std_dev = if count > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let median = if count % 2 == 1 {
            sorted[count / 2]
        } else {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        };

        Some(Summary {
            count,
            mean,
            std_dev,
            median,
            min: sorted[0],
            max: sorted[count - 1],
        })
    }

    /// Summarize a metric over a slice of items
    pub fn of<T>(items: &[T], metric: impl Fn(&T) -> f64) -> Option<Summary> {
        let values: Vec<f64> = items.iter().map(metric).collect();
        Summary::from_values(&values)
    }
}

/// Arithmetic mean, `None` when empty
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Group items by key, preserving first-occurrence order of keys and input
/// order within each group
pub fn group_by<'a, T, K, F>(items: &'a [T], key: F) -> Vec<(K, Vec<&'a T>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut groups: Vec<(K, Vec<&'a T>)> = Vec::new();
    let mut positions: HashMap<K, usize> = HashMap::new();
    for item in items {
        let k = key(item);
        match positions.get(&k) {
            Some(&slot) => groups[slot].1.push(item),
            None => {
                positions.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }
    groups
}

/// Comparison direction for best-row selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Larger metric is better
    Max,
    /// Smaller metric is better
    Min,
}

/// Pick the best item by `metric`; the first item wins ties, NaN never wins
pub fn best_by<'a, T: 'a, I, F>(items: I, metric: F, direction: Direction) -> Option<&'a T>
where
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> f64,
{
    let mut best: Option<(&'a T, f64)> = None;
    for item in items {
        let value = metric(item);
        if value.is_nan() {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, current)) => match direction {
                Direction::Max => value > current,
                Direction::Min => value < current,
            },
        };
        if better {
            best = Some((item, value));
        }
    }
    best.map(|(item, _)| item)
}

/// One pivot cell: mean of the values that fell into it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub mean: f64,
    pub count: usize,
}

/// Two-key grouping with explicit, caller-supplied axis orderings
///
/// Keys outside either ordering are dropped and counted in `dropped`; a
/// warning names each unknown category once.
#[derive(Debug, Clone)]
pub struct Pivot {
    pub rows: Vec<String>,
    pub cols: Vec<String>,
    cells: HashMap<(usize, usize), Cell>,
    pub dropped: usize,
}

impl Pivot {
    pub fn build<T>(
        items: &[T],
        row_key: impl Fn(&T) -> String,
        col_key: impl Fn(&T) -> String,
        value: impl Fn(&T) -> f64,
        row_order: &[String],
        col_order: &[String],
    ) -> Pivot {
        let mut sums: HashMap<(usize, usize), (f64, usize)> = HashMap::new();
        let mut dropped = 0;
        let mut unknown: Vec<String> = Vec::new();

        for item in items {
            let (r, c) = (row_key(item), col_key(item));
            let ri = row_order.iter().position(|k| *k == r);
            let ci = col_order.iter().position(|k| *k == c);
            match (ri, ci) {
                (Some(ri), Some(ci)) => {
                    let entry = sums.entry((ri, ci)).or_insert((0.0, 0));
                    entry.0 += value(item);
                    entry.1 += 1;
                }
                _ => {
                    dropped += 1;
                    for (key, found) in [(r, ri.is_some()), (c, ci.is_some())] {
                        if !found && !unknown.contains(&key) {
                            unknown.push(key);
                        }
                    }
                }
            }
        }

        for key in &unknown {
            warn!(category = %key, "category outside the fixed pivot ordering; rows dropped");
        }

        let cells = sums
            .into_iter()
            .map(|(pos, (sum, count))| {
                (
                    pos,
                    Cell {
                        mean: sum / count as f64,
                        count,
                    },
                )
            })
            .collect();

        Pivot {
            rows: row_order.to_vec(),
            cols: col_order.to_vec(),
            cells,
            dropped,
        }
    }

    /// Cell at (row, col) by key
    pub fn get(&self, row: &str, col: &str) -> Option<Cell> {
        let ri = self.rows.iter().position(|k| k == row)?;
        let ci = self.cols.iter().position(|k| k == col)?;
        self.cells.get(&(ri, ci)).copied()
    }

    /// Row keys that hold at least one cell, in axis order
    pub fn populated_rows(&self) -> Vec<&str> {
        (0..self.rows.len())
            .filter(|ri| (0..self.cols.len()).any(|ci| self.cells.contains_key(&(*ri, ci))))
            .map(|ri| self.rows[ri].as_str())
            .collect()
    }

    /// Column keys that hold at least one cell, in axis order
    pub fn populated_cols(&self) -> Vec<&str> {
        (0..self.cols.len())
            .filter(|ci| (0..self.rows.len()).any(|ri| self.cells.contains_key(&(ri, *ci))))
            .map(|ci| self.cols[ci].as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Sorted, de-duplicated labels, for axes with no natural order
pub fn sorted_unique<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = labels.into_iter().map(str::to_string).collect();
    out.sort();
    out.dedup();
    out
}
