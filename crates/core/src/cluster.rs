//! Density-based clustering of photo coordinates.
//!
//! DBSCAN over `(lat, lon)` pairs with a Euclidean radius in coordinate
//! degrees. Labels share their index with the input; points reachable
//! from no core point are noise. The daemon passes the cluster layout
//! to the overlay renderer; nothing downstream gates on it.

use std::collections::BTreeMap;

use crate::types::Point;

/// Label assigned to points that belong to no cluster.
pub const NOISE: i32 = -1;

/// Default cluster radius: 90 km converted at 111 km per degree.
pub const DEFAULT_EPS_DEGREES: f64 = 90.0 / 111.0;

/// Default minimum cluster size.
pub const DEFAULT_MIN_SAMPLES: usize = 100;

/// Cluster `points` with radius `eps` and core threshold `min_samples`.
///
/// A point is a core point when at least `min_samples` *other* points
/// lie within `eps`; clusters grow by chaining core points through
/// their neighborhoods, and non-core points adopt the label of the
/// first core point that reaches them. Returns one label per input
/// point, index-aligned, with `NOISE` for unreachable points.
///
/// `workers` is accepted for interface parity with the historical
/// process-pool implementation; the scan is single-threaded at the
/// point counts this pipeline sees.
pub fn cluster_points(points: &[Point], eps: f64, min_samples: usize, workers: usize) -> Vec<i32> {
    let _ = workers;
    let n = points.len();
    let mut labels = vec![NOISE; n];
    if n == 0 {
        return labels;
    }

    // One neighborhood scan up front; the expansion below revisits
    // points and must not pay the O(n) query again each time.
    let eps_sq = eps * eps;
    let neighbors: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| j != i && dist_sq(points[i], points[j]) <= eps_sq)
                .collect()
        })
        .collect();
    let core: Vec<bool> = neighbors.iter().map(|ns| ns.len() >= min_samples).collect();

    let mut next_label = 0;
    let mut visited = vec![false; n];

    for seed in 0..n {
        if visited[seed] || !core[seed] {
            continue;
        }
        // Breadth-first expansion from an unvisited core point.
        let label = next_label;
        next_label += 1;

        let mut queue = vec![seed];
        visited[seed] = true;
        labels[seed] = label;

        while let Some(i) = queue.pop() {
            for &j in &neighbors[i] {
                if labels[j] == NOISE {
                    labels[j] = label;
                }
                if !visited[j] && core[j] {
                    visited[j] = true;
                    queue.push(j);
                }
            }
        }
    }

    labels
}

/// Count distinct non-noise labels.
pub fn count_clusters(labels: &[i32]) -> usize {
    let mut seen: Vec<i32> = labels.iter().copied().filter(|&l| l != NOISE).collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

/// Compute per-label centroids and member counts.
///
/// Centroid is the arithmetic mean of exactly the member coordinates.
/// With `suppress_noise`, noise points contribute to neither map. Zero
/// non-noise clusters yield empty maps.
pub fn compute_centers(
    labels: &[i32],
    points: &[Point],
    suppress_noise: bool,
) -> (BTreeMap<i32, Point>, BTreeMap<i32, usize>) {
    let mut members: BTreeMap<i32, Vec<Point>> = BTreeMap::new();
    for (label, point) in labels.iter().zip(points) {
        if suppress_noise && *label == NOISE {
            continue;
        }
        members.entry(*label).or_default().push(*point);
    }

    let mut centers = BTreeMap::new();
    let mut sizes = BTreeMap::new();
    for (label, pts) in members {
        let n = pts.len() as f64;
        let sum = pts
            .iter()
            .fold((0.0, 0.0), |acc, p| (acc.0 + p.0, acc.1 + p.1));
        centers.insert(label, (sum.0 / n, sum.1 / n));
        sizes.insert(label, pts.len());
    }
    (centers, sizes)
}

fn dist_sq(a: Point, b: Point) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}
