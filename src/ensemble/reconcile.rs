//! Granularity reconciliation.
//!
//! Ensemble members cluster units at their own granularity (/24, /16, ...),
//! but the consensus structures are indexed by the canonical host list. This
//! module maps each member's unit-keyed labels and distances down onto hosts:
//! a host inherits the label of the coarse unit that contains it, so "this
//! whole /24 looks anomalous" accrues to every host inside the /24. Hosts the
//! member does not cover come back as [`SENTINEL`] and contribute nothing
//! downstream.
use super::containers::{EnsembleMember, SENTINEL};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Host prefix width; identity granularity for reconciliation.
pub const HOST_WIDTH: u8 = 32;

/// A member's labels/distances re-keyed onto the canonical host list.
/// `distances[i]` is 0 wherever `labels[i]` is the sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledColumn {
    pub labels: Vec<i64>,
    pub distances: Vec<f64>,
}

/// Derives the containing network key for `host` at the given prefix width.
///
/// Width 32 is the identity (a host is its own unit). Coarser widths mask
/// the address and render the canonical `network/width` form, matching what
/// the feature store uses as unit identifiers. Returns `None` for addresses
/// that do not parse.
pub fn net_key(host: &str, mask: u8) -> Option<String> {
    if mask >= HOST_WIDTH {
        return Some(host.to_string());
    }
    let addr: IpAddr = host.trim().parse().ok()?;
    match addr {
        IpAddr::V4(v4) => {
            let shift = 32 - mask as u32;
            let network = (u32::from(v4) >> shift) << shift;
            Some(format!("{}/{}", Ipv4Addr::from(network), mask))
        }
        IpAddr::V6(v6) => {
            let shift = 128 - mask as u32;
            let network = (u128::from(v6) >> shift) << shift;
            Some(format!("{}/{}", Ipv6Addr::from(network), mask))
        }
    }
}

/// Maps one member onto the canonical host list.
///
/// A host lands on the sentinel when its address cannot be reduced to a key
/// at the member's granularity, or when the member simply never saw that
/// unit. Both are coverage misses, not errors.
pub fn reconcile(member: &EnsembleMember, hosts: &[String]) -> ReconciledColumn {
    let mut labels = Vec::with_capacity(hosts.len());
    let mut distances = Vec::with_capacity(hosts.len());
    let mut misses = 0usize;

    for host in hosts {
        let key = net_key(host, member.mask);
        let label = key
            .as_deref()
            .and_then(|key| member.labels.get(key))
            .copied()
            .unwrap_or(SENTINEL);
        if label == SENTINEL {
            misses += 1;
            labels.push(SENTINEL);
            distances.push(0.0);
        } else {
            let distance = key
                .as_deref()
                .and_then(|key| member.distances.get(key))
                .copied()
                .unwrap_or(0.0);
            labels.push(label);
            distances.push(distance);
        }
    }

    if misses > 0 {
        log::debug!(
            "Member /{} k={}: {} of {} hosts without coverage",
            member.mask,
            member.k,
            misses,
            hosts.len()
        );
    }

    ReconciledColumn { labels, distances }
}

/// Folds one reconciled column into the running outlier vector. Raw
/// accumulated distance is the anomaly signal; no normalization here.
pub fn accumulate_outlier(outlier: &mut [f64], column: &ReconciledColumn) {
    for (i, &label) in column.labels.iter().enumerate() {
        if label != SENTINEL {
            outlier[i] += column.distances[i];
        }
    }
}
