//! Base partitioner capability.
//!
//! The EAC engine treats clustering itself as an opaque capability: give a
//! strategy a feature tensor and a target cluster count, get back per-row
//! labels and distances to the assigned centroid. Strategies are selected by
//! name through a registry so the ensemble driver never knows which concrete
//! algorithm it is running, and every invocation gets a fresh instance so no
//! state leaks between runs.
pub mod kkmeans;
pub mod ksom;
pub mod rfcm;

use crate::config::RunConfig;
use crate::error::{EacError, PartitionError};
use lazy_static::lazy_static;
use ndarray::Array2;
use std::collections::HashMap;

/// Result of one partitioner invocation: a cluster label and a non-negative
/// distance-to-centroid per tensor row.
#[derive(Debug, Clone)]
pub struct PartitionOutcome {
    pub labels: Vec<i64>,
    pub distances: Vec<f64>,
}

pub trait Partitioner {
    fn name(&self) -> &'static str;

    /// Partitions the tensor rows into `k` clusters.
    fn fit(&mut self, tensor: &Array2<f64>, k: usize) -> Result<PartitionOutcome, PartitionError>;
}

type Constructor = fn(&RunConfig, u64) -> Box<dyn Partitioner>;

lazy_static! {
    static ref REGISTRY: HashMap<&'static str, Constructor> = {
        let mut m: HashMap<&'static str, Constructor> = HashMap::new();
        m.insert("kkmeans", kkmeans::construct);
        m.insert("ksom", ksom::construct);
        m.insert("rfcm", rfcm::construct);
        m
    };
}

/// Builds a fresh partitioner for one invocation.
///
/// `seed` should vary per (level, k) combination so ensemble members explore
/// different initializations while staying reproducible across runs.
pub fn create(config: &RunConfig, seed: u64) -> Result<Box<dyn Partitioner>, EacError> {
    match REGISTRY.get(config.strategy.as_str()) {
        Some(constructor) => Ok(constructor(config, seed)),
        None => Err(EacError::UnknownStrategy(config.strategy.clone())),
    }
}

/// Strategy names the registry knows about, for CLI help and error messages.
pub fn known_strategies() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = REGISTRY.keys().copied().collect();
    names.sort_unstable();
    names
}

pub(crate) fn check_input(tensor: &Array2<f64>, k: usize) -> Result<(), PartitionError> {
    let n = tensor.nrows();
    if n == 0 || tensor.ncols() == 0 {
        return Err(PartitionError::EmptyInput);
    }
    if k > n {
        return Err(PartitionError::TooFewSamples { k, n });
    }
    Ok(())
}

/// Squared euclidean distance between two rows.
pub(crate) fn sq_dist(a: ndarray::ArrayView1<f64>, b: ndarray::ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn registry_knows_all_strategies() {
        assert_eq!(known_strategies(), vec!["kkmeans", "ksom", "rfcm"]);
    }

    #[test]
    fn unknown_strategy_is_an_error() {
        let config = RunConfig { strategy: "dbscan".into(), ..Default::default() };
        assert!(matches!(create(&config, 0), Err(EacError::UnknownStrategy(_))));
    }

    #[test]
    fn create_yields_named_strategy() {
        let config = RunConfig { strategy: "kkmeans".into(), ..Default::default() };
        let partitioner = create(&config, 0).unwrap();
        assert_eq!(partitioner.name(), "kkmeans");
    }

    #[test]
    fn check_input_rejects_oversized_k() {
        let tensor = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(matches!(
            check_input(&tensor, 3),
            Err(PartitionError::TooFewSamples { k: 3, n: 2 })
        ));
        assert!(check_input(&tensor, 2).is_ok());
    }
}
