//! Relational fuzzy c-means: the fuzzy-relational partitioning strategy.
//!
//! Works on the pairwise squared-distance matrix instead of raw coordinates
//! (Hathaway & Bezdek's RFCM). Cluster "prototypes" are membership-weighted
//! vectors over the samples, and the relational distance from sample j to
//! cluster c is
//!
//!   d²(c, j) = (R v_c)_j − v_cᵀ R v_c / 2
//!
//! Memberships are sharpened each round by the usual inverse-distance update
//! until the membership matrix moves less than `epsilon`. Labels are the
//! argmax membership; the assigned relational distance doubles as the
//! outlier evidence.
use super::{check_input, sq_dist, PartitionOutcome, Partitioner};
use crate::config::{RfcmParams, RunConfig};
use crate::error::PartitionError;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct RelationalFuzzyCMeans {
    params: RfcmParams,
    seed: u64,
}

pub fn construct(config: &RunConfig, seed: u64) -> Box<dyn Partitioner> {
    Box::new(RelationalFuzzyCMeans { params: config.rfcm.clone(), seed })
}

fn relation_matrix(tensor: &Array2<f64>) -> Array2<f64> {
    let n = tensor.nrows();
    let mut relation = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let dist = sq_dist(tensor.row(i), tensor.row(j));
            relation[[i, j]] = dist;
            relation[[j, i]] = dist;
        }
    }
    relation
}

impl Partitioner for RelationalFuzzyCMeans {
    fn name(&self) -> &'static str {
        "rfcm"
    }

    fn fit(&mut self, tensor: &Array2<f64>, k: usize) -> Result<PartitionOutcome, PartitionError> {
        check_input(tensor, k)?;
        if self.params.fuzzifier <= 1.0 {
            return Err(PartitionError::BadParameter("rfcm fuzzifier must be > 1".into()));
        }

        let n = tensor.nrows();
        let relation = relation_matrix(tensor);
        let sharpen = 1.0 / (self.params.fuzzifier - 1.0);
        let mut rng = StdRng::seed_from_u64(self.seed);

        // Random memberships, each column normalized to sum 1.
        let mut membership = Array2::<f64>::zeros((k, n));
        for j in 0..n {
            let column: Vec<f64> = (0..k).map(|_| rng.gen_range(0.01..1.0)).collect();
            let total: f64 = column.iter().sum();
            for (c, value) in column.iter().enumerate() {
                membership[[c, j]] = value / total;
            }
        }

        let mut rel_dist = Array2::<f64>::zeros((k, n));
        for _ in 0..self.params.max_iter.max(1) {
            // Relational distances against membership-weighted prototypes.
            for c in 0..k {
                let weighted = membership.row(c).mapv(|u| u.powf(self.params.fuzzifier));
                let total = weighted.sum();
                let prototype: Array1<f64> = if total > 0.0 { weighted / total } else { Array1::from_elem(n, 1.0 / n as f64) };
                let pulls = relation.dot(&prototype);
                let offset = prototype.dot(&pulls) / 2.0;
                for j in 0..n {
                    rel_dist[[c, j]] = (pulls[j] - offset).max(0.0);
                }
            }

            // Inverse-distance membership update.
            let mut drift = 0.0f64;
            for j in 0..n {
                let zeroed: Vec<usize> = (0..k).filter(|&c| rel_dist[[c, j]] <= f64::EPSILON).collect();
                for c in 0..k {
                    let updated = if !zeroed.is_empty() {
                        // Sample sits on a prototype: crisp membership there.
                        if c == zeroed[0] { 1.0 } else { 0.0 }
                    } else {
                        let mut total = 0.0;
                        for l in 0..k {
                            total += (rel_dist[[c, j]] / rel_dist[[l, j]]).powf(sharpen);
                        }
                        1.0 / total
                    };
                    drift = drift.max((updated - membership[[c, j]]).abs());
                    membership[[c, j]] = updated;
                }
            }

            if drift < self.params.epsilon {
                break;
            }
        }

        let mut labels = Vec::with_capacity(n);
        let mut distances = Vec::with_capacity(n);
        for j in 0..n {
            let assigned = (0..k)
                .max_by(|&a, &b| membership[[a, j]].total_cmp(&membership[[b, j]]))
                .unwrap_or(0);
            labels.push(assigned as i64);
            distances.push(rel_dist[[assigned, j]].sqrt());
        }

        Ok(PartitionOutcome { labels, distances })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn two_blobs() -> Array2<f64> {
        let rows = vec![
            [0.0, 0.0], [0.2, 0.1], [0.1, 0.3], [0.3, 0.2],
            [10.0, 10.0], [10.2, 9.9], [9.8, 10.1], [10.1, 10.2],
        ];
        Array2::from_shape_vec((8, 2), rows.into_iter().flatten().collect()).unwrap()
    }

    fn params() -> RfcmParams {
        RfcmParams { fuzzifier: 2.0, max_iter: 50, epsilon: 1e-4 }
    }

    #[test]
    fn separates_two_blobs() {
        let mut model = RelationalFuzzyCMeans { params: params(), seed: 5 };
        let outcome = model.fit(&two_blobs(), 2).unwrap();

        let first = &outcome.labels[..4];
        let second = &outcome.labels[4..];
        assert!(first.iter().all(|&l| l == first[0]));
        assert!(second.iter().all(|&l| l == second[0]));
        assert_ne!(first[0], second[0]);
    }

    #[test]
    fn distances_are_non_negative() {
        let mut model = RelationalFuzzyCMeans { params: params(), seed: 5 };
        let outcome = model.fit(&two_blobs(), 3).unwrap();
        assert!(outcome.distances.iter().all(|&d| d >= 0.0 && d.is_finite()));
    }

    #[test]
    fn rejects_bad_fuzzifier() {
        let mut model = RelationalFuzzyCMeans {
            params: RfcmParams { fuzzifier: 1.0, ..params() },
            seed: 0,
        };
        assert!(model.fit(&two_blobs(), 2).is_err());
    }
}
