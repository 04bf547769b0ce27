//! Kernel k-means: the kernel-based partitioning strategy.
//!
//! Lloyd-style assignment in RBF feature space. The squared distance from a
//! point to a cluster mean never needs explicit feature-space coordinates:
//!
//!   d²(x, C) = K(x,x) − 2/|C| Σ_{j∈C} K(x,j) + 1/|C|² Σ_{j,l∈C} K(j,l)
//!
//! Iterates until assignments settle (or the changed fraction drops under
//! `tol`), then reports sqrt of the feature-space distance to the assigned
//! cluster as the outlier evidence for that row.
use super::{check_input, sq_dist, PartitionOutcome, Partitioner};
use crate::config::{KernelKMeansParams, RunConfig};
use crate::error::PartitionError;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct KernelKMeans {
    params: KernelKMeansParams,
    seed: u64,
}

pub fn construct(config: &RunConfig, seed: u64) -> Box<dyn Partitioner> {
    Box::new(KernelKMeans { params: config.kkmeans.clone(), seed })
}

impl KernelKMeans {
    fn kernel_matrix(&self, tensor: &Array2<f64>) -> Array2<f64> {
        let n = tensor.nrows();
        let gamma = 1.0 / (2.0 * self.params.sigma * self.params.sigma);
        let mut kernel = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            kernel[[i, i]] = 1.0;
            for j in (i + 1)..n {
                let value = (-gamma * sq_dist(tensor.row(i), tensor.row(j))).exp();
                kernel[[i, j]] = value;
                kernel[[j, i]] = value;
            }
        }
        kernel
    }
}

impl Partitioner for KernelKMeans {
    fn name(&self) -> &'static str {
        "kkmeans"
    }

    fn fit(&mut self, tensor: &Array2<f64>, k: usize) -> Result<PartitionOutcome, PartitionError> {
        check_input(tensor, k)?;
        if self.params.sigma <= 0.0 {
            return Err(PartitionError::BadParameter("kkmeans sigma must be > 0".into()));
        }

        let n = tensor.nrows();
        let kernel = self.kernel_matrix(tensor);
        let mut rng = StdRng::seed_from_u64(self.seed);

        // Farthest-point seeding: one random seed row, then greedily the row
        // with the largest min-distance to the seeds picked so far.
        let mut seeds: Vec<usize> = vec![rng.gen_range(0..n)];
        while seeds.len() < k {
            let next = (0..n)
                .filter(|i| !seeds.contains(i))
                .max_by(|&a, &b| {
                    let da = seeds.iter().map(|&s| sq_dist(tensor.row(a), tensor.row(s))).fold(f64::INFINITY, f64::min);
                    let db = seeds.iter().map(|&s| sq_dist(tensor.row(b), tensor.row(s))).fold(f64::INFINITY, f64::min);
                    da.total_cmp(&db)
                })
                .unwrap_or(0);
            seeds.push(next);
        }
        let mut labels: Vec<usize> = (0..n)
            .map(|i| {
                (0..k)
                    .min_by(|&a, &b| {
                        sq_dist(tensor.row(i), tensor.row(seeds[a]))
                            .total_cmp(&sq_dist(tensor.row(i), tensor.row(seeds[b])))
                    })
                    .unwrap_or(0)
            })
            .collect();
        let mut assigned_dist = vec![0.0f64; n];

        for iteration in 0..self.params.max_iter.max(1) {
            // Per-cluster constants for this round of assignments.
            let mut sizes = vec![0usize; k];
            for &label in &labels {
                sizes[label] += 1;
            }
            let mut self_sim = Array1::<f64>::zeros(k);
            for c in 0..k {
                let mut total = 0.0;
                for i in 0..n {
                    if labels[i] != c {
                        continue;
                    }
                    for j in 0..n {
                        if labels[j] == c {
                            total += kernel[[i, j]];
                        }
                    }
                }
                let size = sizes[c].max(1) as f64;
                self_sim[c] = total / (size * size);
            }

            let mut changed = 0usize;
            for i in 0..n {
                let mut best = labels[i];
                let mut best_dist = f64::INFINITY;
                for c in 0..k {
                    if sizes[c] == 0 {
                        continue;
                    }
                    let mut cross = 0.0;
                    for j in 0..n {
                        if labels[j] == c {
                            cross += kernel[[i, j]];
                        }
                    }
                    let dist = kernel[[i, i]] - 2.0 * cross / sizes[c] as f64 + self_sim[c];
                    if dist < best_dist {
                        best_dist = dist;
                        best = c;
                    }
                }
                if best != labels[i] {
                    labels[i] = best;
                    changed += 1;
                }
                assigned_dist[i] = best_dist.max(0.0).sqrt();
            }

            // Re-seed any cluster that starved, with the farthest point.
            for c in 0..k {
                if !labels.contains(&c) {
                    let farthest = assigned_dist
                        .iter()
                        .enumerate()
                        .max_by(|a, b| a.1.total_cmp(b.1))
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                    labels[farthest] = c;
                    assigned_dist[farthest] = 0.0;
                    changed += 1;
                }
            }

            if changed == 0 || (changed as f64) < self.params.tol * n as f64 {
                log::debug!("kkmeans settled after {} iterations", iteration + 1);
                break;
            }
        }

        Ok(PartitionOutcome {
            labels: labels.into_iter().map(|l| l as i64).collect(),
            distances: assigned_dist,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn two_blobs() -> Array2<f64> {
        // Four points near the origin, four near (10, 10).
        let rows = vec![
            [0.0, 0.0], [0.2, 0.1], [0.1, 0.3], [0.3, 0.2],
            [10.0, 10.0], [10.2, 9.9], [9.8, 10.1], [10.1, 10.2],
        ];
        Array2::from_shape_vec((8, 2), rows.into_iter().flatten().collect()).unwrap()
    }

    #[test]
    fn separates_two_blobs() {
        let config = RunConfig::default();
        let mut model = KernelKMeans { params: config.kkmeans.clone(), seed: 7 };
        let outcome = model.fit(&two_blobs(), 2).unwrap();

        let first = &outcome.labels[..4];
        let second = &outcome.labels[4..];
        assert!(first.iter().all(|&l| l == first[0]));
        assert!(second.iter().all(|&l| l == second[0]));
        assert_ne!(first[0], second[0]);
    }

    #[test]
    fn distances_are_non_negative() {
        let config = RunConfig::default();
        let mut model = KernelKMeans { params: config.kkmeans.clone(), seed: 7 };
        let outcome = model.fit(&two_blobs(), 2).unwrap();
        assert!(outcome.distances.iter().all(|&d| d >= 0.0));
    }

    #[test]
    fn same_seed_same_partition() {
        let config = RunConfig::default();
        let data = two_blobs();
        let mut a = KernelKMeans { params: config.kkmeans.clone(), seed: 42 };
        let mut b = KernelKMeans { params: config.kkmeans.clone(), seed: 42 };
        assert_eq!(a.fit(&data, 3).unwrap().labels, b.fit(&data, 3).unwrap().labels);
    }

    #[test]
    fn rejects_k_above_n() {
        let config = RunConfig::default();
        let mut model = KernelKMeans { params: config.kkmeans.clone(), seed: 0 };
        assert!(model.fit(&two_blobs(), 9).is_err());
    }
}
