//! Seeded, stratified train/validation/test splitting
//!
//! The splitter carves the test set first and then splits the remainder
//! into train and validation, re-stratifying on the remainder's labels.
//! Per-class holdout sizes follow the largest-remainder rule and every class
//! keeps at least one row on each side of a cut.
//!
//! The training partition is handed out as a [`TrainPartition`], the only type
//! preprocessing can be fitted on.

use crate::config::SplitSection;
use crate::error::{AuditError, Result};
use crate::table::Table;
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::ops::Deref;
use tracing::{debug, info};

/// Targets with at most this many distinct values are split stratified
pub const MAX_STRATIFY_CLASSES: usize = 20;

/// Split fractions and seed
#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    pub seed: u64,
    pub valid_size: f64,
    pub test_size: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            valid_size: 0.2,
            test_size: 0.2,
        }
    }
}

impl From<&SplitSection> for SplitConfig {
    fn from(section: &SplitSection) -> Self {
        Self {
            seed: section.seed,
            valid_size: section.valid_size,
            test_size: section.test_size,
        }
    }
}

impl SplitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_valid_size(mut self, valid_size: f64) -> Self {
        self.valid_size = valid_size;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [("valid_size", self.valid_size), ("test_size", self.test_size)] {
            if !(value > 0.0 && value < 1.0) {
                return Err(AuditError::InvalidParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                    reason: "must be within (0, 1)".to_string(),
                });
            }
        }
        if self.valid_size + self.test_size >= 1.0 {
            return Err(AuditError::InvalidParameter {
                name: "valid_size + test_size".to_string(),
                value: (self.valid_size + self.test_size).to_string(),
                reason: "must be below 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Rows of one split: features, labels and their positions in the source table
#[derive(Debug, Clone)]
pub struct Partition {
    pub features: Table,
    pub target: Array1<f64>,
    /// Row positions in the table that was split, ascending
    pub row_indices: Vec<usize>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.row_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_indices.is_empty()
    }

    /// Rows at the given positions of this partition
    pub fn subset(&self, positions: &[usize]) -> Result<Partition> {
        let features = self.features.take_rows(positions)?;
        let target = positions.iter().map(|&p| self.target[p]).collect();
        let row_indices = positions.iter().map(|&p| self.row_indices[p]).collect();
        Ok(Partition {
            features,
            target,
            row_indices,
        })
    }
}

/// The training partition.
///
/// Only the splitter can create one, so statistics fitted on it never see
/// validation or test rows.
#[derive(Debug, Clone)]
pub struct TrainPartition(Partition);

impl TrainPartition {
    pub(crate) fn new(partition: Partition) -> Self {
        Self(partition)
    }

    /// A cross-validation fold carved from the training rows
    pub fn fold(&self, positions: &[usize]) -> Result<TrainPartition> {
        Ok(TrainPartition(self.0.subset(positions)?))
    }

    pub fn into_inner(self) -> Partition {
        self.0
    }
}

impl Deref for TrainPartition {
    type Target = Partition;

    fn deref(&self) -> &Partition {
        &self.0
    }
}

/// Disjoint train, validation and test partitions
#[derive(Debug, Clone)]
pub struct Split {
    pub train: TrainPartition,
    pub valid: Partition,
    pub test: Partition,
}

/// Split `table` on `target` into train, validation and test partitions
pub fn stratified_split(table: &Table, target: &str, config: &SplitConfig) -> Result<Split> {
    config.validate()?;

    let labels = table
        .numeric_values(target)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(x) if !x.is_nan() => Ok(x),
            _ => Err(AuditError::DataError(format!(
                "target '{}' is missing at row {}",
                target, row
            ))),
        })
        .collect::<Result<Vec<f64>>>()?;
    let features = table.without_column(target)?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let all_rows: Vec<usize> = (0..labels.len()).collect();

    let (rest, test_rows) = holdout(&all_rows, &labels, config.test_size, &mut rng)?;
    let relative_valid = config.valid_size / (1.0 - config.test_size);
    let (train_rows, valid_rows) = holdout(&rest, &labels, relative_valid, &mut rng)?;

    info!(
        train = train_rows.len(),
        valid = valid_rows.len(),
        test = test_rows.len(),
        seed = config.seed,
        "Split dataset"
    );

    let make = |rows: Vec<usize>| -> Result<Partition> {
        Ok(Partition {
            features: features.take_rows(&rows)?,
            target: rows.iter().map(|&r| labels[r]).collect(),
            row_indices: rows,
        })
    };

    Ok(Split {
        train: TrainPartition::new(make(train_rows)?),
        valid: make(valid_rows)?,
        test: make(test_rows)?,
    })
}

/// Cut `ceil(fraction * n)` rows out of `rows`; returns `(kept, held_out)`
fn holdout(
    rows: &[usize],
    labels: &[f64],
    fraction: f64,
    rng: &mut ChaCha8Rng,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let n = rows.len();
    let n_holdout = (fraction * n as f64).ceil() as usize;
    let n_keep = n.saturating_sub(n_holdout);
    if n_holdout == 0 || n_keep == 0 {
        return Err(AuditError::InsufficientData(format!(
            "cannot split {} rows with fraction {}",
            n, fraction
        )));
    }

    let classes = group_by_class(rows, labels);
    let (mut kept, mut held) = if classes.len() <= MAX_STRATIFY_CLASSES {
        stratified_cut(classes, n, n_holdout, rng)?
    } else {
        debug!(classes = classes.len(), "Too many target values, splitting without stratification");
        let mut shuffled = rows.to_vec();
        shuffled.shuffle(rng);
        let kept = shuffled.split_off(n_holdout);
        (kept, shuffled)
    };

    kept.sort_unstable();
    held.sort_unstable();
    Ok((kept, held))
}

/// Rows per distinct label, classes in ascending label order
fn group_by_class(rows: &[usize], labels: &[f64]) -> Vec<(f64, Vec<usize>)> {
    // -0.0 and 0.0 share a class
    let mut by_bits: HashMap<u64, Vec<usize>> = HashMap::new();
    for &row in rows {
        by_bits.entry((labels[row] + 0.0).to_bits()).or_default().push(row);
    }
    let mut classes: Vec<(f64, Vec<usize>)> = by_bits
        .into_iter()
        .map(|(bits, members)| (f64::from_bits(bits), members))
        .collect();
    classes.sort_by(|a, b| a.0.total_cmp(&b.0));
    classes
}

fn stratified_cut(
    mut classes: Vec<(f64, Vec<usize>)>,
    n: usize,
    n_holdout: usize,
    rng: &mut ChaCha8Rng,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let k = classes.len();
    if let Some((label, members)) = classes.iter().find(|(_, m)| m.len() < 2) {
        return Err(AuditError::InsufficientData(format!(
            "class {} has {} member(s); stratification needs at least 2",
            label,
            members.len()
        )));
    }
    if n_holdout < k || n - n_holdout < k {
        return Err(AuditError::InsufficientData(format!(
            "cannot place {} classes on both sides of a {}/{} cut",
            k,
            n - n_holdout,
            n_holdout
        )));
    }

    let counts: Vec<usize> = classes.iter().map(|(_, m)| m.len()).collect();
    let alloc = allocate(&counts, n, n_holdout);

    let mut kept = Vec::with_capacity(n - n_holdout);
    let mut held = Vec::with_capacity(n_holdout);
    for ((_, members), take) in classes.iter_mut().zip(alloc) {
        members.shuffle(rng);
        held.extend_from_slice(&members[..take]);
        kept.extend_from_slice(&members[take..]);
    }
    Ok((kept, held))
}

/// Largest-remainder allocation of `n_holdout` rows across classes, with
/// every class keeping between 1 and `count - 1` rows in the holdout.
/// Ties go to the earlier class.
fn allocate(counts: &[usize], n: usize, n_holdout: usize) -> Vec<usize> {
    let mut alloc: Vec<usize> = counts.iter().map(|&c| n_holdout * c / n).collect();
    let mut order: Vec<usize> = (0..counts.len()).collect();
    // stable sort keeps class order among equal remainders
    order.sort_by_key(|&i| Reverse(n_holdout * counts[i] % n));

    let assigned: usize = alloc.iter().sum();
    for &i in order.iter().take(n_holdout - assigned) {
        alloc[i] += 1;
    }

    for (a, &c) in alloc.iter_mut().zip(counts) {
        *a = (*a).clamp(1, c - 1);
    }

    // signed distance from the exact quota, scaled by n
    let deviation = |alloc: &[usize], i: usize| alloc[i] as i64 * n as i64 - (n_holdout * counts[i]) as i64;

    let mut total: usize = alloc.iter().sum();
    while total > n_holdout {
        let Some(i) = (0..counts.len())
            .filter(|&i| alloc[i] > 1)
            .max_by_key(|&i| (deviation(&alloc, i), Reverse(i)))
        else {
            break;
        };
        alloc[i] -= 1;
        total -= 1;
    }
    while total < n_holdout {
        let Some(i) = (0..counts.len())
            .filter(|&i| alloc[i] + 1 < counts[i])
            .max_by_key(|&i| (-deviation(&alloc, i), Reverse(i)))
        else {
            break;
        };
        alloc[i] += 1;
        total += 1;
    }
    alloc
}
