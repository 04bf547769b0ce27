//! Co-association consensus structure.
//!
//! The co-association matrix is the ensemble's agreement structure: entry
//! (i, k) is the fraction of ALL members that put host i and host k in the
//! same cluster. The denominator is the ensemble size M, not the number of
//! members covering the pair, so thin coverage reads as weak evidence.
//! Sentinel labels never count as agreement.
use super::containers::{HostLabelMatrix, SENTINEL};
use ndarray::{s, Array1, Array2, Zip};
use rayon::prelude::*;

/// Builds the N×N co-association matrix from the reconciled label matrix.
///
/// Each row is compared against the remaining row block in one vectorized
/// sweep (equality + sentinel mask, reduced along the member axis), and the
/// upper triangle is mirrored. Row sweeps run on the rayon pool.
pub fn coassociation(matrix: &HostLabelMatrix) -> Array2<f64> {
    let n = matrix.n_hosts();
    let m = matrix.n_members();
    debug_assert!(m > 0, "co-association needs at least one ensemble member");

    let labels = &matrix.labels;
    let scale = 1.0 / m as f64;

    let triangles: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let row = labels.row(i);
            let block = labels.slice(s![i + 1.., ..]);
            let mut counts = Array1::<f64>::zeros(block.nrows());
            Zip::from(block.rows()).and(&mut counts).for_each(|other, count| {
                *count = row
                    .iter()
                    .zip(other.iter())
                    .filter(|(a, b)| **a != SENTINEL && a == b)
                    .count() as f64;
            });
            counts.into_raw_vec()
        })
        .collect();

    let mut co = Array2::<f64>::zeros((n, n));
    for (i, counts) in triangles.into_iter().enumerate() {
        co[[i, i]] = 1.0;
        for (offset, count) in counts.into_iter().enumerate() {
            let k = i + 1 + offset;
            let value = count * scale;
            co[[i, k]] = value;
            co[[k, i]] = value;
        }
    }
    co
}

/// Condenses a symmetric distance matrix to its upper-triangular vector,
/// row-major, the form the linkage step consumes.
pub fn condense(distance: &Array2<f64>) -> Vec<f64> {
    let n = distance.nrows();
    let mut condensed = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for k in (i + 1)..n {
            condensed.push(distance[[i, k]]);
        }
    }
    condensed
}
