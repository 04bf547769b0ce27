use crate::partitioner::PartitionOutcome;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label marking "no valid coverage for this (host, member) pair".
/// Never a real cluster id; excluded from every aggregate computation.
pub const SENTINEL: i64 = -1;

/// One base clustering run at a fixed (granularity, cluster count).
/// Immutable once generated; keys are units at the member's own granularity.
#[derive(Debug, Clone)]
pub struct EnsembleMember {
    pub mask: u8,
    pub k: usize,
    pub labels: HashMap<String, i64>,
    pub distances: HashMap<String, f64>,
}

impl EnsembleMember {
    /// Zips a partitioner outcome with the unit list it was fit on.
    pub fn from_outcome(mask: u8, k: usize, units: &[String], outcome: &PartitionOutcome) -> Self {
        let mut labels = HashMap::with_capacity(units.len());
        let mut distances = HashMap::with_capacity(units.len());
        for (i, unit) in units.iter().enumerate() {
            labels.insert(unit.clone(), outcome.labels[i]);
            distances.insert(unit.clone(), outcome.distances[i]);
        }
        Self { mask, k, labels, distances }
    }
}

/// On-disk form of an [`EnsembleMember`], one JSON document per (mask, k).
/// Lets a rerun pick up a half-finished ensemble without re-fitting.
#[derive(Debug, Serialize, Deserialize)]
pub struct MemberRecord {
    pub mask: u8,
    pub k: usize,
    pub generated_at: String,
    pub units: Vec<UnitRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnitRecord {
    pub unit: String,
    pub label: i64,
    pub distance: f64,
}

impl MemberRecord {
    pub fn from_member(member: &EnsembleMember) -> Self {
        let mut units: Vec<UnitRecord> = member
            .labels
            .iter()
            .map(|(unit, &label)| UnitRecord {
                unit: unit.clone(),
                label,
                distance: member.distances.get(unit).copied().unwrap_or(0.0),
            })
            .collect();
        units.sort_by(|a, b| a.unit.cmp(&b.unit));
        Self {
            mask: member.mask,
            k: member.k,
            generated_at: chrono::Utc::now().to_rfc3339(),
            units,
        }
    }

    pub fn into_member(self) -> EnsembleMember {
        let mut labels = HashMap::with_capacity(self.units.len());
        let mut distances = HashMap::with_capacity(self.units.len());
        for unit in self.units {
            labels.insert(unit.unit.clone(), unit.label);
            distances.insert(unit.unit, unit.distance);
        }
        EnsembleMember { mask: self.mask, k: self.k, labels, distances }
    }
}

/// N×M label matrix over the canonical host list: one row per host, one
/// column per ensemble member, [`SENTINEL`] where a member has no coverage.
/// Read-only once built.
#[derive(Debug, Clone)]
pub struct HostLabelMatrix {
    pub hosts: Vec<String>,
    pub labels: Array2<i64>,
}

impl HostLabelMatrix {
    /// Assembles the matrix from per-member columns.
    pub fn from_columns(hosts: Vec<String>, columns: &[Vec<i64>]) -> Self {
        let n = hosts.len();
        let m = columns.len();
        let mut labels = Array2::from_elem((n, m), SENTINEL);
        for (j, column) in columns.iter().enumerate() {
            for (i, &label) in column.iter().enumerate() {
                labels[[i, j]] = label;
            }
        }
        Self { hosts, labels }
    }

    pub fn n_hosts(&self) -> usize {
        self.labels.nrows()
    }

    pub fn n_members(&self) -> usize {
        self.labels.ncols()
    }
}

/// One row of the terminal artifact: a host with its consensus cluster and
/// accumulated outlier score. Tables are sorted by score descending.
#[derive(Debug, Clone, Serialize)]
pub struct RankedHost {
    pub host: String,
    pub label: i64,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_record_round_trips() {
        let outcome = PartitionOutcome { labels: vec![0, 1], distances: vec![0.5, 1.5] };
        let units = vec!["10.0.0.0/24".to_string(), "10.0.1.0/24".to_string()];
        let member = EnsembleMember::from_outcome(24, 2, &units, &outcome);

        let record = MemberRecord::from_member(&member);
        let json = serde_json::to_string(&record).unwrap();
        let restored: MemberRecord = serde_json::from_str(&json).unwrap();
        let restored = restored.into_member();

        assert_eq!(restored.mask, 24);
        assert_eq!(restored.k, 2);
        assert_eq!(restored.labels["10.0.1.0/24"], 1);
        assert_eq!(restored.distances["10.0.0.0/24"], 0.5);
    }

    #[test]
    fn matrix_defaults_to_sentinel() {
        let matrix = HostLabelMatrix::from_columns(vec!["a".into(), "b".into()], &[]);
        assert_eq!(matrix.n_hosts(), 2);
        assert_eq!(matrix.n_members(), 0);
    }

    #[test]
    fn matrix_lays_columns_out_in_order() {
        let hosts = vec!["a".into(), "b".into()];
        let matrix = HostLabelMatrix::from_columns(hosts, &[vec![0, 1], vec![SENTINEL, 2]]);
        assert_eq!(matrix.labels[[0, 0]], 0);
        assert_eq!(matrix.labels[[1, 0]], 1);
        assert_eq!(matrix.labels[[0, 1]], SENTINEL);
        assert_eq!(matrix.labels[[1, 1]], 2);
    }
}
