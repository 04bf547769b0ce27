//! Run configuration for the EAC pipeline.
//!
//! Everything the pipeline needs is carried in one immutable [`RunConfig`]
//! that gets threaded through constructors. A config can come from a JSON
//! file (`--config`), with individual fields overridable from the command
//! line; defaults match the values the pipeline was tuned with.
use crate::error::EacError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Granularity levels as network prefix widths, host level last.
/// 32 = host, 24/16/8 = progressively coarser subnets.
pub const DEFAULT_MASKS: [u8; 4] = [32, 24, 16, 8];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Prefix widths to build ensemble members at. Must contain the host
    /// width (the largest entry), which fixes the canonical unit ordering.
    pub masks: Vec<u8>,
    /// Center cluster count k₀. Members are generated for every k in
    /// [k₀ - k_spread, k₀ + k_spread] with k >= 2.
    pub base_clusters: usize,
    pub k_spread: usize,
    /// Which base partitioner strategy to run ("kkmeans", "ksom", "rfcm").
    pub strategy: String,
    /// Seed for partitioner initialization. Same seed, same ensemble.
    pub seed: u64,
    pub kkmeans: KernelKMeansParams,
    pub ksom: SomParams,
    pub rfcm: RfcmParams,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KernelKMeansParams {
    /// RBF kernel bandwidth.
    pub sigma: f64,
    pub max_iter: usize,
    pub tol: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SomParams {
    /// Neighborhood width at the start of training.
    pub sigma: f64,
    pub learning_rate: f64,
    pub n_iter: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RfcmParams {
    /// Fuzzifier exponent m > 1.
    pub fuzzifier: f64,
    pub max_iter: usize,
    /// Convergence threshold on the membership matrix.
    pub epsilon: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            masks: DEFAULT_MASKS.to_vec(),
            base_clusters: 20,
            k_spread: 1,
            strategy: String::from("rfcm"),
            seed: 10,
            kkmeans: KernelKMeansParams::default(),
            ksom: SomParams::default(),
            rfcm: RfcmParams::default(),
        }
    }
}

impl Default for KernelKMeansParams {
    fn default() -> Self {
        Self { sigma: 1.0, max_iter: 10, tol: 1e-3 }
    }
}

impl Default for SomParams {
    fn default() -> Self {
        Self { sigma: 0.3, learning_rate: 0.1, n_iter: 50_000 }
    }
}

impl Default for RfcmParams {
    fn default() -> Self {
        Self { fuzzifier: 2.0, max_iter: 10, epsilon: 1e-3 }
    }
}

impl RunConfig {
    /// Loads a config from a JSON file. Missing fields fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, EacError> {
        let raw = fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// The host-level prefix width, which defines the canonical unit list.
    pub fn finest_mask(&self) -> u8 {
        self.masks.iter().copied().max().unwrap_or(32)
    }

    /// The cluster counts each granularity level is partitioned at.
    /// Values below 2 are dropped; one cluster is not a partition.
    pub fn cluster_counts(&self) -> Vec<usize> {
        let lo = self.base_clusters.saturating_sub(self.k_spread);
        (lo..=self.base_clusters + self.k_spread)
            .filter(|&k| k >= 2)
            .collect()
    }

    pub fn validate(&self) -> Result<(), EacError> {
        if self.masks.is_empty() {
            return Err(EacError::Config("at least one granularity mask is required".into()));
        }
        if let Some(&bad) = self.masks.iter().find(|&&m| m == 0 || m > 32) {
            return Err(EacError::Config(format!("prefix width {bad} is out of range (1-32)")));
        }
        if self.base_clusters < 2 {
            return Err(EacError::Config(format!(
                "base cluster count must be at least 2, got {}",
                self.base_clusters
            )));
        }
        if self.rfcm.fuzzifier <= 1.0 {
            return Err(EacError::Config("rfcm fuzzifier must be > 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn cluster_counts_center_on_base() {
        let config = RunConfig { base_clusters: 20, k_spread: 1, ..Default::default() };
        assert_eq!(config.cluster_counts(), vec![19, 20, 21]);
    }

    #[test]
    fn cluster_counts_drop_degenerate_k() {
        let config = RunConfig { base_clusters: 2, k_spread: 1, ..Default::default() };
        assert_eq!(config.cluster_counts(), vec![2, 3]);
    }

    #[test]
    fn rejects_zero_mask() {
        let config = RunConfig { masks: vec![32, 0], ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn finest_mask_is_largest() {
        let config = RunConfig { masks: vec![8, 24, 32, 16], ..Default::default() };
        assert_eq!(config.finest_mask(), 32);
    }
}
