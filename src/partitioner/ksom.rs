//! Linear self-organizing map: the map-based partitioning strategy.
//!
//! A 1×k neuron chain trained online. Each step pulls the best-matching unit
//! (and, weighted by a gaussian neighborhood over chain position, its
//! neighbors) toward a randomly drawn sample, with learning rate and
//! neighborhood width decaying asymptotically over the run. A row's label is
//! its best-matching unit after training, and the euclidean distance to that
//! unit's weight vector is its outlier evidence.
use super::{check_input, sq_dist, PartitionOutcome, Partitioner};
use crate::config::{RunConfig, SomParams};
use crate::error::PartitionError;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct LinearSom {
    params: SomParams,
    seed: u64,
}

pub fn construct(config: &RunConfig, seed: u64) -> Box<dyn Partitioner> {
    Box::new(LinearSom { params: config.ksom.clone(), seed })
}

fn best_matching_unit(weights: &Array2<f64>, sample: ndarray::ArrayView1<f64>) -> (usize, f64) {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (unit, row) in weights.rows().into_iter().enumerate() {
        let dist = sq_dist(row, sample);
        if dist < best_dist {
            best_dist = dist;
            best = unit;
        }
    }
    (best, best_dist)
}

impl Partitioner for LinearSom {
    fn name(&self) -> &'static str {
        "ksom"
    }

    fn fit(&mut self, tensor: &Array2<f64>, k: usize) -> Result<PartitionOutcome, PartitionError> {
        check_input(tensor, k)?;
        if self.params.learning_rate <= 0.0 || self.params.sigma <= 0.0 {
            return Err(PartitionError::BadParameter(
                "ksom learning_rate and sigma must be > 0".into(),
            ));
        }

        let n = tensor.nrows();
        let dims = tensor.ncols();
        let mut rng = StdRng::seed_from_u64(self.seed);

        // Initialize each unit on a distinct data row.
        let init_rows = rand::seq::index::sample(&mut rng, n, k);
        let mut weights = Array2::<f64>::zeros((k, dims));
        for (unit, row) in init_rows.into_iter().enumerate() {
            weights.row_mut(unit).assign(&tensor.row(row));
        }

        let total = self.params.n_iter.max(1);
        let half = (total as f64) / 2.0;
        for step in 0..total {
            let sample = tensor.row(rng.gen_range(0..n));
            let (bmu, _) = best_matching_unit(&weights, sample);

            let decay = 1.0 / (1.0 + step as f64 / half);
            let rate = self.params.learning_rate * decay;
            let width = (self.params.sigma * decay).max(1e-3);

            for unit in 0..k {
                let span = unit as f64 - bmu as f64;
                let pull = rate * (-(span * span) / (2.0 * width * width)).exp();
                if pull < 1e-12 {
                    continue;
                }
                for (weight, &value) in weights.row_mut(unit).iter_mut().zip(sample.iter()) {
                    *weight += pull * (value - *weight);
                }
            }
        }

        let mut labels = Vec::with_capacity(n);
        let mut distances = Vec::with_capacity(n);
        for row in tensor.rows() {
            let (bmu, dist) = best_matching_unit(&weights, row);
            labels.push(bmu as i64);
            distances.push(dist.max(0.0).sqrt());
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

    fn quick_params() -> SomParams {
        SomParams { sigma: 0.3, learning_rate: 0.1, n_iter: 2_000 }
    }

    #[test]
    fn separates_two_blobs() {
        let mut model = LinearSom { params: quick_params(), seed: 3 };
        let outcome = model.fit(&two_blobs(), 2).unwrap();

        let first = &outcome.labels[..4];
        let second = &outcome.labels[4..];
        assert!(first.iter().all(|&l| l == first[0]));
        assert!(second.iter().all(|&l| l == second[0]));
        assert_ne!(first[0], second[0]);
    }

    #[test]
    fn labels_stay_in_range() {
        let mut model = LinearSom { params: quick_params(), seed: 3 };
        let outcome = model.fit(&two_blobs(), 3).unwrap();
        assert!(outcome.labels.iter().all(|&l| (0..3).contains(&l)));
        assert!(outcome.distances.iter().all(|&d| d >= 0.0));
    }

    #[test]
    fn reproducible_for_a_seed() {
        let data = two_blobs();
        let mut a = LinearSom { params: quick_params(), seed: 11 };
        let mut b = LinearSom { params: quick_params(), seed: 11 };
        assert_eq!(a.fit(&data, 2).unwrap().labels, b.fit(&data, 2).unwrap().labels);
    }

    #[test]
    fn rejects_empty_input() {
        let mut model = LinearSom { params: quick_params(), seed: 0 };
        let empty = Array2::<f64>::zeros((0, 0));
        assert!(matches!(model.fit(&empty, 2), Err(PartitionError::EmptyInput)));
    }
}
