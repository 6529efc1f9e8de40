//! Partition agreement scores.
//!
//! Adjusted Rand Index (ARI) and Normalized Mutual Information (NMI) between
//! two labellings of the same items, used to compare a recovered blocking
//! with a reference partition.

use std::collections::HashMap;

use thiserror::Error;

/// Errors raised while scoring partition agreement.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum PartitionError {
    /// The two labellings cover different numbers of items.
    #[error("label length mismatch: left={left}, right={right}")]
    LabelLengthMismatch { left: usize, right: usize },
}

/// ARI and NMI computed from two labellings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartitionAgreement {
    /// Adjusted Rand Index in `[-1.0, 1.0]`.
    pub ari: f64,
    /// Normalized Mutual Information in `[0.0, 1.0]`.
    pub nmi: f64,
}

struct Contingency {
    items: usize,
    left_sizes: HashMap<usize, usize>,
    right_sizes: HashMap<usize, usize>,
    cells: HashMap<(usize, usize), usize>,
}

impl Contingency {
    fn build(left: &[usize], right: &[usize]) -> Result<Self, PartitionError> {
        if left.len() != right.len() {
            return Err(PartitionError::LabelLengthMismatch {
                left: left.len(),
                right: right.len(),
            });
        }
        let mut table = Self {
            items: left.len(),
            left_sizes: HashMap::new(),
            right_sizes: HashMap::new(),
            cells: HashMap::new(),
        };
        for (&a, &b) in left.iter().zip(right) {
            *table.left_sizes.entry(a).or_insert(0) += 1;
            *table.right_sizes.entry(b).or_insert(0) += 1;
            *table.cells.entry((a, b)).or_insert(0) += 1;
        }
        Ok(table)
    }

    fn adjusted_rand_index(&self) -> f64 {
        fn comb2(count: usize) -> f64 {
            let count = count as f64;
            count * (count - 1.0) / 2.0
        }

        let total_pairs = comb2(self.items);
        if total_pairs == 0.0 {
            return 1.0;
        }
        let cell_pairs: f64 = self.cells.values().copied().map(comb2).sum();
        let left_pairs: f64 = self.left_sizes.values().copied().map(comb2).sum();
        let right_pairs: f64 = self.right_sizes.values().copied().map(comb2).sum();
        let expected = left_pairs * right_pairs / total_pairs;
        let maximum = 0.5 * (left_pairs + right_pairs);
        if maximum == expected {
            1.0
        } else {
            (cell_pairs - expected) / (maximum - expected)
        }
    }

    fn entropy(sizes: &HashMap<usize, usize>, items: f64) -> f64 {
        sizes
            .values()
            .map(|&size| {
                let p = size as f64 / items;
                -p * p.ln()
            })
            .sum()
    }

    fn normalized_mutual_information(&self) -> f64 {
        if self.items == 0 {
            return 1.0;
        }
        let items = self.items as f64;
        let mut mutual = 0.0_f64;
        for (&(a, b), &count) in &self.cells {
            let joint = count as f64 / items;
            let left = self.left_sizes[&a] as f64 / items;
            let right = self.right_sizes[&b] as f64 / items;
            mutual += joint * (joint / (left * right)).ln();
        }
        let left_entropy = Self::entropy(&self.left_sizes, items);
        let right_entropy = Self::entropy(&self.right_sizes, items);
        if left_entropy == 0.0 && right_entropy == 0.0 {
            1.0
        } else if left_entropy == 0.0 || right_entropy == 0.0 {
            0.0
        } else {
            mutual / (left_entropy * right_entropy).sqrt()
        }
    }
}

/// Computes the Adjusted Rand Index of two labellings.
///
/// # Errors
/// Returns [`PartitionError::LabelLengthMismatch`] when the slices differ in
/// length.
pub fn adjusted_rand_index(left: &[usize], right: &[usize]) -> Result<f64, PartitionError> {
    Ok(Contingency::build(left, right)?.adjusted_rand_index())
}

/// Computes the Normalized Mutual Information of two labellings.
///
/// # Errors
/// Returns [`PartitionError::LabelLengthMismatch`] when the slices differ in
/// length.
pub fn normalized_mutual_information(
    left: &[usize],
    right: &[usize],
) -> Result<f64, PartitionError> {
    Ok(Contingency::build(left, right)?.normalized_mutual_information())
}

/// Computes ARI and NMI over a single contingency pass.
///
/// # Errors
/// Returns [`PartitionError::LabelLengthMismatch`] when the slices differ in
/// length.
pub fn partition_agreement(
    left: &[usize],
    right: &[usize],
) -> Result<PartitionAgreement, PartitionError> {
    let table = Contingency::build(left, right)?;
    Ok(PartitionAgreement {
        ari: table.adjusted_rand_index(),
        nmi: table.normalized_mutual_information(),
    })
}
