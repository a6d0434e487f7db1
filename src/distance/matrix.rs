//! Condensed pairwise distance matrix, whole or in partitions.
//!
//! Only the upper triangle (i < j) is stored; the diagonal is implicitly
//! zero and lookups with swapped indices read the same cell. The triangle
//! can also be computed in independent partitions (for fan-out to worker
//! processes) and merged back into a matrix that is bit-identical to a
//! single-pass computation.

use crate::distance::{DistanceMetric, FrameToken};
use crate::utils::error::MatrixError;
use log::debug;
use rayon::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Flat index of cell (i, j), i < j, in the condensed upper triangle.
///
/// Row i starts at ((h²-h) - (l²-l))/2 with h = n, l = n - i, and holds
/// its n-1-i cells back to back, so the whole triangle is exactly
/// `pair_count(n)` entries with no gaps.
fn triangle_position(n: usize, i: usize, j: usize) -> usize {
    let h = n;
    let l = n - i;
    ((h * h - h) - (l * l - l)) / 2 + j - i - 1
}

/// Number of cells in the condensed triangle for n sequences
fn pair_count(n: usize) -> usize {
    n * (n - 1) / 2
}

/// Fingerprint of the input sequences; partitions computed against
/// different inputs refuse to merge.
fn sequences_checksum(sequences: &[Vec<FrameToken>]) -> u64 {
    let mut hasher = DefaultHasher::new();
    sequences.hash(&mut hasher);
    hasher.finish()
}

/// Pairwise distances between n sequences under one metric
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    /// Number of rows stored (always n - 1)
    m: usize,
    /// Number of sequences compared
    n: usize,
    metric: DistanceMetric,
    /// Condensed upper triangle, row-major
    data: Vec<f32>,
}

impl DistanceMatrix {
    /// Compare every pair of sequences in one pass.
    ///
    /// Needs at least two sequences; anything pairwise-comparable has been
    /// reduced to tokens by the caller, so this is variant-agnostic.
    pub fn new(
        sequences: &[Vec<FrameToken>],
        metric: DistanceMetric,
    ) -> Result<Self, MatrixError> {
        let n = sequences.len();
        if n < 2 {
            return Err(MatrixError::TooFewSequences(n));
        }

        debug!("Computing {}x{} distance matrix ({:?})", n - 1, n, metric);

        let mut data = vec![0.0f32; pair_count(n)];
        for i in 0..n - 1 {
            for j in i + 1..n {
                data[triangle_position(n, i, j)] = metric.distance(&sequences[i], &sequences[j]);
            }
        }

        Ok(DistanceMatrix {
            m: n - 1,
            n,
            metric,
            data,
        })
    }

    /// Number of sequences the matrix was built over
    pub fn sequence_count(&self) -> usize {
        self.n
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Distance between sequences i and j.
    ///
    /// Symmetric lookup; the diagonal is 0.0. Panics when an index is out
    /// of bounds, like slice indexing would.
    pub fn get(&self, i: usize, j: usize) -> f32 {
        assert!(i < self.n && j < self.n, "matrix index out of bounds");
        if i == j {
            return 0.0;
        }
        let (i, j) = if i > j { (j, i) } else { (i, j) };
        self.data[triangle_position(self.n, i, j)]
    }
}

/// One contiguous slice of the condensed triangle, computable on its own
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixPart {
    /// Row count of the full matrix this part belongs to
    m: usize,
    /// Sequence count of the full matrix this part belongs to
    n: usize,
    /// Row of the first cell
    m_begin: usize,
    /// Column of the first cell
    n_begin: usize,
    /// Number of cells in this part
    len: usize,
    metric: DistanceMetric,
    /// Filled in by [`MatrixPart::compute`]
    data: Option<Vec<f32>>,
    /// Input fingerprint, set at compute time
    checksum: u64,
}

impl MatrixPart {
    fn new(
        n: usize,
        m_begin: usize,
        n_begin: usize,
        len: usize,
        metric: DistanceMetric,
    ) -> Self {
        MatrixPart {
            m: n - 1,
            n,
            m_begin,
            n_begin,
            len,
            metric,
            data: None,
            checksum: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_computed(&self) -> bool {
        self.data.is_some()
    }

    /// Flat triangle index of the first cell of this part
    fn start_position(&self) -> usize {
        triangle_position(self.n, self.m_begin, self.n_begin)
    }

    /// Compute the distances this part is responsible for.
    ///
    /// `sequences` must be the same set (same order) for every part of the
    /// partitioning; the checksum recorded here enforces that at merge
    /// time.
    pub fn compute(&mut self, sequences: &[Vec<FrameToken>]) -> Result<(), MatrixError> {
        if sequences.len() != self.n {
            return Err(MatrixError::WrongSequenceCount {
                expected: self.n,
                got: sequences.len(),
            });
        }

        let mut data = Vec::with_capacity(self.len);
        let mut i = self.m_begin;
        let mut j = self.n_begin;

        for _ in 0..self.len {
            data.push(self.metric.distance(&sequences[i], &sequences[j]));

            // advance to the next cell, wrapping to the next row
            j += 1;
            if j >= self.n {
                i += 1;
                j = i + 1;
            }
        }

        self.checksum = sequences_checksum(sequences);
        self.data = Some(data);
        Ok(())
    }
}

/// Splits the condensed triangle into contiguous parts of near-equal size
pub struct MatrixPartitioner;

impl MatrixPartitioner {
    /// Create up to `parts` partitions covering an n-sequence matrix.
    ///
    /// When `parts` exceeds the number of cell pairs, only as many parts as
    /// there are pairs are returned; every returned part is non-empty.
    pub fn create(
        sequence_count: usize,
        parts: usize,
        metric: DistanceMetric,
    ) -> Result<Vec<MatrixPart>, MatrixError> {
        let n = sequence_count;
        if n < 2 {
            return Err(MatrixError::TooFewSequences(n));
        }
        if parts == 0 {
            return Err(MatrixError::ZeroPartitions);
        }

        let total = pair_count(n);
        let part_count = parts.min(total);
        let base_len = total / part_count;
        let remainder = total % part_count;

        debug!(
            "Partitioning {} matrix cells into {} parts",
            total, part_count
        );

        let mut result = Vec::with_capacity(part_count);
        let mut i = 0usize;
        let mut j = 1usize;

        for k in 0..part_count {
            // earlier parts absorb the division remainder
            let len = base_len + usize::from(k < remainder);
            result.push(MatrixPart::new(n, i, j, len, metric));

            for _ in 0..len {
                j += 1;
                if j >= n {
                    i += 1;
                    j = i + 1;
                }
            }
        }

        Ok(result)
    }
}

/// Compute all parts against the same sequences, in parallel
pub fn compute_all_parts(
    parts: &mut [MatrixPart],
    sequences: &[Vec<FrameToken>],
) -> Result<(), MatrixError> {
    parts
        .par_iter_mut()
        .map(|part| part.compute(sequences))
        .collect::<Result<(), MatrixError>>()
}

/// Reassemble a full matrix from computed parts, in any order.
///
/// All parts must come from the same partitioning run: same sequence
/// count, same metric, computed against the same inputs, and together
/// covering every cell exactly once. The result is bit-identical to
/// [`DistanceMatrix::new`] over the same sequences.
pub fn merge_parts(parts: &[MatrixPart]) -> Result<DistanceMatrix, MatrixError> {
    let first = parts.first().ok_or(MatrixError::NoParts)?;
    let n = first.n;
    let metric = first.metric;
    let checksum = first.checksum;
    let total = pair_count(n);

    let mut data = vec![0.0f32; total];
    let mut filled = vec![false; total];
    let mut got = 0usize;

    for part in parts {
        let part_data = part.data.as_ref().ok_or(MatrixError::PartNotComputed)?;
        if part.n != n {
            return Err(MatrixError::MismatchedParts("sequence count"));
        }
        if part.metric != metric {
            return Err(MatrixError::MismatchedParts("distance metric"));
        }
        if part.checksum != checksum {
            return Err(MatrixError::MismatchedParts("input sequences"));
        }
        if part_data.len() != part.len {
            return Err(MatrixError::MismatchedParts("cell count"));
        }

        let start = part.start_position();
        for (offset, &value) in part_data.iter().enumerate() {
            let pos = start + offset;
            if pos >= total || filled[pos] {
                return Err(MatrixError::MismatchedParts("cell ranges"));
            }
            data[pos] = value;
            filled[pos] = true;
        }
        got += part.len;
    }

    if got != total {
        return Err(MatrixError::IncompleteCoverage {
            expected: total,
            got,
        });
    }

    Ok(DistanceMatrix {
        m: n - 1,
        n,
        metric,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequences() -> Vec<Vec<FrameToken>> {
        [
            vec!["f1", "f2", "f3"],
            vec!["f1", "f4", "f5"],
            vec!["f9", "f8"],
            vec!["f1", "f2", "f3", "f4"],
            vec!["main"],
        ]
        .iter()
        .map(|names| names.iter().map(|n| FrameToken::new(*n, None)).collect())
        .collect()
    }

    #[test]
    fn test_triangle_layout_is_dense_and_ordered() {
        // every (i, j) pair maps to exactly one in-bounds slot, in flat
        // row-major order with no gaps
        for n in 2..8 {
            let mut expected = 0usize;
            for i in 0..n - 1 {
                for j in i + 1..n {
                    assert_eq!(triangle_position(n, i, j), expected, "n={} i={} j={}", n, i, j);
                    expected += 1;
                }
            }
            assert_eq!(expected, pair_count(n));
        }
    }

    #[test]
    fn test_three_sequence_matrix_stays_in_bounds() {
        let seqs: Vec<Vec<FrameToken>> = [
            vec!["f1", "f2"],
            vec!["f1", "f3"],
            vec!["g1"],
        ]
        .iter()
        .map(|names| names.iter().map(|n| FrameToken::new(*n, None)).collect())
        .collect();

        let matrix = DistanceMatrix::new(&seqs, DistanceMetric::Levenshtein).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let d = matrix.get(i, j);
                assert!((0.0..=1.0).contains(&d));
            }
        }
        assert_eq!(matrix.get(2, 0), matrix.get(0, 2));
    }

    #[test]
    fn test_matrix_diagonal_and_symmetry() {
        let seqs = sequences();
        let matrix = DistanceMatrix::new(&seqs, DistanceMetric::Levenshtein).unwrap();
        for i in 0..seqs.len() {
            assert_eq!(matrix.get(i, i), 0.0);
            for j in 0..seqs.len() {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
    }

    #[test]
    fn test_matrix_matches_direct_metric() {
        let seqs = sequences();
        let matrix = DistanceMatrix::new(&seqs, DistanceMetric::Jaccard).unwrap();
        for i in 0..seqs.len() {
            for j in i + 1..seqs.len() {
                let direct = DistanceMetric::Jaccard.distance(&seqs[i], &seqs[j]);
                assert_eq!(matrix.get(i, j), direct);
            }
        }
    }

    #[test]
    fn test_matrix_needs_two_sequences() {
        let one = vec![vec![FrameToken::new("f1", None)]];
        assert!(matches!(
            DistanceMatrix::new(&one, DistanceMetric::Levenshtein),
            Err(MatrixError::TooFewSequences(1))
        ));
    }

    #[test]
    fn test_partition_counts() {
        // 5 sequences = 10 pairs
        let parts = MatrixPartitioner::create(5, 3, DistanceMetric::Levenshtein).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.iter().map(MatrixPart::len).sum::<usize>(), 10);

        // more parts than pairs collapses to one part per pair
        let parts = MatrixPartitioner::create(5, 100, DistanceMetric::Levenshtein).unwrap();
        assert_eq!(parts.len(), 10);
        assert!(parts.iter().all(|p| p.len() == 1));
    }

    #[test]
    fn test_partition_zero_parts_rejected() {
        assert!(matches!(
            MatrixPartitioner::create(5, 0, DistanceMetric::Levenshtein),
            Err(MatrixError::ZeroPartitions)
        ));
    }

    #[test]
    fn test_merge_equals_single_pass() {
        let seqs = sequences();
        let whole = DistanceMatrix::new(&seqs, DistanceMetric::DamerauLevenshtein).unwrap();

        for part_request in [1, 2, 3, 7, 10, 50] {
            let mut parts = MatrixPartitioner::create(
                seqs.len(),
                part_request,
                DistanceMetric::DamerauLevenshtein,
            )
            .unwrap();
            for part in &mut parts {
                part.compute(&seqs).unwrap();
            }
            // merge order must not matter
            parts.reverse();
            let merged = merge_parts(&parts).unwrap();
            assert_eq!(whole, merged, "mismatch for {} parts", part_request);
        }
    }

    #[test]
    fn test_merge_parallel_compute() {
        let seqs = sequences();
        let whole = DistanceMatrix::new(&seqs, DistanceMetric::JaroWinkler).unwrap();
        let mut parts =
            MatrixPartitioner::create(seqs.len(), 4, DistanceMetric::JaroWinkler).unwrap();
        compute_all_parts(&mut parts, &seqs).unwrap();
        assert_eq!(whole, merge_parts(&parts).unwrap());
    }

    #[test]
    fn test_merge_rejects_uncomputed_part() {
        let parts = MatrixPartitioner::create(5, 2, DistanceMetric::Levenshtein).unwrap();
        assert!(matches!(
            merge_parts(&parts),
            Err(MatrixError::PartNotComputed)
        ));
    }

    #[test]
    fn test_merge_rejects_missing_part() {
        let seqs = sequences();
        let mut parts =
            MatrixPartitioner::create(seqs.len(), 3, DistanceMetric::Levenshtein).unwrap();
        compute_all_parts(&mut parts, &seqs).unwrap();
        parts.pop();
        assert!(matches!(
            merge_parts(&parts),
            Err(MatrixError::IncompleteCoverage { .. })
        ));
    }

    #[test]
    fn test_merge_rejects_different_inputs() {
        let seqs = sequences();
        let mut other = sequences();
        other[0].push(FrameToken::new("extra", None));

        let mut parts =
            MatrixPartitioner::create(seqs.len(), 2, DistanceMetric::Levenshtein).unwrap();
        parts[0].compute(&seqs).unwrap();
        parts[1].compute(&other).unwrap();
        assert!(matches!(
            merge_parts(&parts),
            Err(MatrixError::MismatchedParts("input sequences"))
        ));
    }

    #[test]
    fn test_compute_rejects_wrong_sequence_count() {
        let seqs = sequences();
        let mut parts =
            MatrixPartitioner::create(seqs.len(), 2, DistanceMetric::Levenshtein).unwrap();
        let truncated = &seqs[..3];
        assert!(matches!(
            parts[0].compute(truncated),
            Err(MatrixError::WrongSequenceCount {
                expected: 5,
                got: 3
            })
        ));
    }
}
