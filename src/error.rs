//! Failure taxonomy for the EAC pipeline.
//!
//! Per-level and per-member problems (missing feature data, a single failed
//! partitioner run, a host without coverage) are handled locally with
//! skip-and-continue and never show up here. Only whole-ensemble or
//! whole-matrix failures are worth aborting a run for.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EacError {
    /// Zero ensemble members survived generation. Nothing downstream can run.
    #[error("no ensemble members were produced; every (level, k) run failed or was skipped")]
    EmptyEnsemble,

    /// The consensus distance matrix cannot be fed to the linkage step.
    #[error("consensus matrix unsuitable for linkage: {0}")]
    ConsensusDegenerate(String),

    /// The level that fixes the canonical unit ordering has no feature data.
    /// Coarser levels are skippable; this one is not.
    #[error("host-level feature data (/{0}) is required to fix the canonical unit ordering")]
    MissingHostLevel(u8),

    #[error("partitioner failure: {0}")]
    Partitioner(#[from] PartitionError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown partitioner strategy `{0}`")]
    UnknownStrategy(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Errors raised by a single base partitioner invocation. The ensemble driver
/// treats any of these as "drop this member and keep going".
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("empty feature tensor")]
    EmptyInput,

    #[error("cannot form {k} clusters from {n} samples")]
    TooFewSamples { k: usize, n: usize },

    #[error("invalid hyperparameter: {0}")]
    BadParameter(String),
}
