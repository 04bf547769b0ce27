//! End-to-end evidence accumulation run.
//!
//! Ties the stages together: generate the ensemble, reconcile every member
//! onto the canonical host list while accumulating outlier evidence, build
//! the co-association matrix, and finalize a consensus partition by cutting
//! the average-linkage tree. Each stage hands an explicit result to the
//! next; once generation is done everything downstream is a pure function
//! of its inputs.
use super::consensus::{self, coassociation};
use super::containers::{HostLabelMatrix, RankedHost};
use super::driver;
use super::linkage;
use super::reconcile::{accumulate_outlier, reconcile};
use crate::config::RunConfig;
use crate::error::EacError;
use crate::store::FeatureStore;
use ndarray::Array2;
use std::path::Path;

/// Terminal artifact of the engine: the ranked table plus a little context
/// about the ensemble that produced it.
#[derive(Debug)]
pub struct EacOutcome {
    /// (host, consensus label, outlier score), sorted by score descending.
    pub table: Vec<RankedHost>,
    pub n_members: usize,
}

/// Runs the whole pipeline against a feature store.
pub fn run(
    config: &RunConfig,
    store: &dyn FeatureStore,
    artifact_dir: Option<&Path>,
) -> Result<EacOutcome, EacError> {
    config.validate()?;

    let ensemble = driver::generate(config, store, artifact_dir)?;
    if ensemble.members.is_empty() {
        return Err(EacError::EmptyEnsemble);
    }

    // Reconcile members onto hosts; outlier evidence accumulates as we go.
    let mut outlier = vec![0.0f64; ensemble.hosts.len()];
    let columns: Vec<Vec<i64>> = ensemble
        .members
        .iter()
        .map(|member| {
            let column = reconcile(member, &ensemble.hosts);
            accumulate_outlier(&mut outlier, &column);
            column.labels
        })
        .collect();

    let matrix = HostLabelMatrix::from_columns(ensemble.hosts, &columns);
    log::info!(
        "Label matrix built: {} hosts x {} members",
        matrix.n_hosts(),
        matrix.n_members()
    );

    let co = coassociation(&matrix);
    let table = finalize(&co, &outlier, &matrix.hosts, config.base_clusters)?;

    Ok(EacOutcome { table, n_members: matrix.n_members() })
}

/// Consensus finalizer: 1−C distances, condensed form, average-linkage tree
/// cut to `k_target`, ranked output.
///
/// Refuses to call the linkage routine on degenerate input: fewer than two
/// hosts, or a distance matrix that is all zeros (every member agreed on
/// everything, so there is no structure to cut).
pub fn finalize(
    co: &Array2<f64>,
    outlier: &[f64],
    hosts: &[String],
    k_target: usize,
) -> Result<Vec<RankedHost>, EacError> {
    let n = co.nrows();
    if n < 2 {
        return Err(EacError::ConsensusDegenerate(format!(
            "{n} host(s); need at least 2 to cluster"
        )));
    }

    let mut distance = co.mapv(|c| 1.0 - c);
    for i in 0..n {
        // The diagonal is exactly 0 by definition; don't let float noise in.
        distance[[i, i]] = 0.0;
    }

    let condensed = consensus::condense(&distance);
    if condensed.iter().all(|&d| d.abs() <= 1e-12) {
        return Err(EacError::ConsensusDegenerate(
            "all pairwise distances are zero".into(),
        ));
    }

    let merges = linkage::average_linkage(&condensed, n);
    let labels = linkage::cut(&merges, n, k_target);

    let mut table: Vec<RankedHost> = hosts
        .iter()
        .zip(labels.iter())
        .zip(outlier.iter())
        .map(|((host, &label), &score)| RankedHost { host: host.clone(), label, score })
        .collect();
    table.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.host.cmp(&b.host)));

    Ok(table)
}
