//! Agglomerative hierarchical clustering with average linkage.
//!
//! Operates on the condensed (upper-triangular) distance vector produced by
//! the consensus stage. Builds the full merge tree bottom-up, then cuts it to
//! a flat partition. Cluster ids follow the usual convention: leaves are
//! 0..n, the merge at step t creates id n+t. Merges pick the minimum-distance
//! pair in ascending scan order, so results are deterministic.
use log::debug;

/// One dendrogram node: the two cluster ids merged, the average-linkage
/// distance between them, and the merged size.
#[derive(Debug, Clone)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

/// Builds the full average-linkage merge tree (n-1 merges) from a condensed
/// distance vector over n observations.
///
/// Distances between merged clusters follow the Lance–Williams average
/// update: d(pq, x) = (|p| d(p,x) + |q| d(q,x)) / (|p| + |q|).
pub fn average_linkage(condensed: &[f64], n: usize) -> Vec<Merge> {
    debug_assert!(n >= 2, "linkage needs at least two observations");
    debug_assert_eq!(condensed.len(), n * (n - 1) / 2, "condensed length mismatch");

    // Working distance matrix over the active cluster list.
    let mut dist: Vec<Vec<f64>> = vec![vec![0.0; n]; n];
    let mut cursor = 0;
    for i in 0..n {
        for k in (i + 1)..n {
            dist[i][k] = condensed[cursor];
            dist[k][i] = condensed[cursor];
            cursor += 1;
        }
    }

    let mut ids: Vec<usize> = (0..n).collect();
    let mut sizes: Vec<usize> = vec![1; n];
    let mut merges = Vec::with_capacity(n - 1);

    for step in 0..(n - 1) {
        let active = ids.len();
        let (mut best_p, mut best_q, mut best_d) = (0, 1, f64::INFINITY);
        for p in 0..active {
            for q in (p + 1)..active {
                if dist[p][q] < best_d {
                    best_d = dist[p][q];
                    best_p = p;
                    best_q = q;
                }
            }
        }

        let merged_size = sizes[best_p] + sizes[best_q];
        merges.push(Merge {
            left: ids[best_p],
            right: ids[best_q],
            distance: best_d,
            size: merged_size,
        });

        // Lance-Williams update into slot p, then drop slot q.
        let (wp, wq) = (sizes[best_p] as f64, sizes[best_q] as f64);
        for x in 0..active {
            if x == best_p || x == best_q {
                continue;
            }
            let updated = (wp * dist[best_p][x] + wq * dist[best_q][x]) / (wp + wq);
            dist[best_p][x] = updated;
            dist[x][best_p] = updated;
        }
        ids[best_p] = n + step;
        sizes[best_p] = merged_size;

        ids.remove(best_q);
        sizes.remove(best_q);
        for row in dist.iter_mut() {
            row.remove(best_q);
        }
        dist.remove(best_q);
    }

    debug!("Linkage complete: {} merges", merges.len());
    merges
}

/// Cuts the merge tree into `k_target` flat clusters.
///
/// Applies the first n−k merges and labels the resulting components 0..k in
/// order of each component's first appearance in the observation list.
/// `k_target` is clamped to [1, n].
pub fn cut(merges: &[Merge], n: usize, k_target: usize) -> Vec<i64> {
    let k = k_target.clamp(1, n);

    // Representative leaf per cluster id (leaves plus one id per merge).
    let mut parent: Vec<usize> = (0..n).collect();
    let mut rep: Vec<usize> = vec![0; n + merges.len()];
    for (id, slot) in rep.iter_mut().enumerate().take(n) {
        *slot = id;
    }

    fn find(parent: &mut Vec<usize>, mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for (step, merge) in merges.iter().take(n - k).enumerate() {
        let a = find(&mut parent, rep[merge.left]);
        let b = find(&mut parent, rep[merge.right]);
        parent[b] = a;
        rep[n + step] = a;
    }

    let mut labels = vec![-1i64; n];
    let mut next = 0i64;
    let mut assigned: std::collections::HashMap<usize, i64> = std::collections::HashMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        let label = *assigned.entry(root).or_insert_with(|| {
            let l = next;
            next += 1;
            l
        });
        labels[i] = label;
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two tight pairs far apart: hosts {0,1} and {2,3}.
    fn four_host_condensed() -> Vec<f64> {
        // pairs: (0,1) (0,2) (0,3) (1,2) (1,3) (2,3)
        vec![0.1, 0.9, 0.95, 0.92, 0.88, 0.05]
    }

    #[test]
    fn builds_full_tree() {
        let merges = average_linkage(&four_host_condensed(), 4);
        assert_eq!(merges.len(), 3);
        // Closest pair first: hosts 2 and 3 at 0.05.
        assert_eq!((merges[0].left, merges[0].right), (2, 3));
        assert!((merges[0].distance - 0.05).abs() < 1e-12);
        assert_eq!(merges[0].size, 2);
        // Final merge spans everything.
        assert_eq!(merges[2].size, 4);
    }

    #[test]
    fn cut_to_two_spans_all_hosts() {
        let merges = average_linkage(&four_host_condensed(), 4);
        let labels = cut(&merges, 4, 2);
        assert_eq!(labels.len(), 4);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
        // Exactly two distinct labels, first-appearance ordering.
        assert_eq!(labels[0], 0);
        assert_eq!(labels[2], 1);
    }

    #[test]
    fn cut_to_one_merges_everything() {
        let merges = average_linkage(&four_host_condensed(), 4);
        let labels = cut(&merges, 4, 1);
        assert!(labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn oversized_k_yields_singletons() {
        let merges = average_linkage(&four_host_condensed(), 4);
        let labels = cut(&merges, 4, 10);
        assert_eq!(labels, vec![0, 1, 2, 3]);
    }

    #[test]
    fn average_update_uses_cluster_sizes() {
        // Three points on a line: 0 and 1 close, 2 far.
        // d(0,1)=1, d(0,2)=10, d(1,2)=12 -> after merging {0,1},
        // d({0,1},2) = (10+12)/2 = 11.
        let merges = average_linkage(&[1.0, 10.0, 12.0], 3);
        assert_eq!((merges[0].left, merges[0].right), (0, 1));
        assert!((merges[1].distance - 11.0).abs() < 1e-12);
    }
}
