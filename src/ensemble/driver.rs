//! Ensemble generation.
//!
//! Walks the configured granularity levels, partitions each level's feature
//! tensor at every cluster count in the perturbation window, and collects one
//! [`EnsembleMember`] per successful run. Failures stay local: a level with
//! no feature data is skipped with a warning, a failed partitioner run drops
//! that one member. Members are collected in (level, k) configuration order
//! so downstream matrix columns are reproducible run to run.
use super::containers::{EnsembleMember, MemberRecord};
use crate::config::RunConfig;
use crate::error::EacError;
use crate::partitioner;
use crate::store::{FeatureSet, FeatureStore};
use std::fs;
use std::path::Path;

/// Generation output: the canonical host list (fixed by the finest level's
/// unit ordering) plus every member that survived.
#[derive(Debug)]
pub struct Ensemble {
    pub hosts: Vec<String>,
    pub members: Vec<EnsembleMember>,
}

/// Runs the base partitioner over every (level, k) combination.
///
/// When `artifact_dir` is set, each member is persisted as JSON keyed by
/// (level, k), and an existing record is reloaded instead of re-fitting, so
/// an interrupted ensemble resumes where it stopped.
pub fn generate(
    config: &RunConfig,
    store: &dyn FeatureStore,
    artifact_dir: Option<&Path>,
) -> Result<Ensemble, EacError> {
    let finest = config.finest_mask();
    let cluster_counts = config.cluster_counts();
    let mut hosts: Option<Vec<String>> = None;
    let mut members = Vec::new();

    for &mask in &config.masks {
        let set = match store.load(mask) {
            Ok(Some(set)) => set,
            Ok(None) => {
                log::warn!("No feature data for /{mask}; level skipped");
                continue;
            }
            Err(e) => {
                log::warn!("Failed to load /{mask} features ({e}); level skipped");
                continue;
            }
        };

        if mask == finest {
            hosts = Some(set.units.clone());
        }

        for &k in &cluster_counts {
            match obtain_member(config, &set, k, artifact_dir) {
                Ok(member) => members.push(member),
                Err(e) => {
                    log::error!("Partitioner failed for /{mask} k={k}: {e}; member dropped");
                }
            }
        }
    }

    let hosts = hosts.ok_or(EacError::MissingHostLevel(finest))?;
    log::info!(
        "Ensemble generated: {} members over {} hosts",
        members.len(),
        hosts.len()
    );
    Ok(Ensemble { hosts, members })
}

fn obtain_member(
    config: &RunConfig,
    set: &FeatureSet,
    k: usize,
    artifact_dir: Option<&Path>,
) -> Result<EnsembleMember, EacError> {
    let record_path = artifact_dir.map(|dir| dir.join(format!("member_{}_{}.json", set.mask, k)));

    // Resume path: an already-persisted member is evidence we can reuse.
    if let Some(path) = record_path.as_deref() {
        if path.exists() {
            match read_record(path) {
                Ok(record) if record.mask == set.mask && record.k == k => {
                    log::info!("Reusing persisted member /{} k={}", set.mask, k);
                    return Ok(record.into_member());
                }
                Ok(record) => {
                    log::warn!(
                        "Persisted member at {} is keyed /{} k={}, expected /{} k={}; re-fitting",
                        path.display(),
                        record.mask,
                        record.k,
                        set.mask,
                        k
                    );
                }
                Err(e) => {
                    log::warn!("Could not reload member record {}: {e}; re-fitting", path.display());
                }
            }
        }
    }

    // Fresh partitioner per invocation, seeded per (level, k) so members
    // explore different initializations but reruns are identical.
    let seed = config.seed ^ ((set.mask as u64) << 32) ^ (k as u64);
    let mut model = partitioner::create(config, seed)?;
    let outcome = model.fit(&set.tensor, k)?;
    let member = EnsembleMember::from_outcome(set.mask, k, &set.units, &outcome);

    if let Some(path) = record_path.as_deref() {
        if let Err(e) = write_record(path, &member) {
            log::warn!("Could not persist member /{} k={}: {e}", set.mask, k);
        }
    }

    Ok(member)
}

fn read_record(path: &Path) -> Result<MemberRecord, EacError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_record(path: &Path, member: &EnsembleMember) -> Result<(), EacError> {
    let record = MemberRecord::from_member(member);
    fs::write(path, serde_json::to_string_pretty(&record)?)?;
    Ok(())
}
