//! Eclipse path geometry: boundary polygon and centerline queries.
//!
//! The boundary is the northern limit walked forward plus the southern
//! limit walked backward, closed implicitly. The centerline is an open
//! polyline of the path centers. Coordinates are treated as plain 2D
//! `(lat, lon)` points; at the path scale involved the planar
//! approximation is what the ordering key has always been built on.

use rand::Rng;

use crate::path_data::PathSample;
use crate::types::Point;

/// Boundary polygon plus centerline of the path of totality.
#[derive(Debug, Clone)]
pub struct EclipsePath {
    boundary: Vec<Point>,
    centerline: Vec<Point>,
    /// Cumulative arc length at each centerline vertex.
    cumulative: Vec<f64>,
    total_length: f64,
}

impl EclipsePath {
    /// Build the path from parsed table samples: northern limits
    /// forward, southern limits reversed, centers in order.
    pub fn from_samples(samples: &[PathSample]) -> Self {
        let mut boundary = Vec::with_capacity(samples.len() * 2 + 2);
        if let Some(first) = samples.first() {
            boundary.push(first.center);
        }
        boundary.extend(samples.iter().map(|s| s.northern));
        if let Some(last) = samples.last() {
            boundary.push(last.center);
        }
        boundary.extend(samples.iter().rev().map(|s| s.southern));

        let centerline = samples.iter().map(|s| s.center).collect();
        Self::new(boundary, centerline)
    }

    /// Build directly from an explicit boundary and centerline.
    pub fn new(boundary: Vec<Point>, centerline: Vec<Point>) -> Self {
        let mut cumulative = Vec::with_capacity(centerline.len());
        let mut total = 0.0;
        for (i, p) in centerline.iter().enumerate() {
            if i > 0 {
                total += distance(centerline[i - 1], *p);
            }
            cumulative.push(total);
        }
        Self {
            boundary,
            centerline,
            cumulative,
            total_length: total,
        }
    }

    pub fn boundary(&self) -> &[Point] {
        &self.boundary
    }

    pub fn centerline(&self) -> &[Point] {
        &self.centerline
    }

    /// Even-odd ray-cast containment test against the boundary polygon.
    /// An empty boundary contains nothing.
    pub fn contains(&self, point: Point) -> bool {
        let n = self.boundary.len();
        if n < 3 {
            return false;
        }
        let (px, py) = point;
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.boundary[i];
            let (xj, yj) = self.boundary[j];
            if (yi > py) != (yj > py) {
                let x_cross = xi + (py - yi) / (yj - yi) * (xj - xi);
                if px < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Orthogonal projection of `point` onto the nearest centerline
    /// segment. `None` when the centerline is empty.
    pub fn nearest_point_on_centerline(&self, point: Point) -> Option<Point> {
        self.project(point).map(|p| p.closest)
    }

    /// Fractional arc-length position in `[0, 1]` of the nearest
    /// projection of `point` along the centerline. Used verbatim as the
    /// ordering key. Equal-distance ties resolve to the earliest
    /// segment; an empty or zero-length centerline yields `0.0`.
    pub fn project_normalized(&self, point: Point) -> f64 {
        match self.project(point) {
            Some(p) if self.total_length > 0.0 => p.arc_position / self.total_length,
            _ => 0.0,
        }
    }

    /// Rejection-sample a point inside the boundary polygon. `None`
    /// when the boundary is degenerate. Used by operator map tooling.
    pub fn random_point_in_boundary<R: Rng>(&self, rng: &mut R) -> Option<Point> {
        if self.boundary.len() < 3 {
            return None;
        }
        let min_x = self.boundary.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_x = self.boundary.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = self.boundary.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_y = self.boundary.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        for _ in 0..10_000 {
            let candidate = (rng.random_range(min_x..=max_x), rng.random_range(min_y..=max_y));
            if self.contains(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn project(&self, point: Point) -> Option<Projection> {
        if self.centerline.is_empty() {
            return None;
        }
        if self.centerline.len() == 1 {
            return Some(Projection {
                closest: self.centerline[0],
                arc_position: 0.0,
            });
        }

        let mut best: Option<(f64, Projection)> = None;
        for i in 0..self.centerline.len() - 1 {
            let a = self.centerline[i];
            let b = self.centerline[i + 1];
            let (closest, t) = project_onto_segment(point, a, b);
            let dist = distance(point, closest);
            // Strict comparison keeps the earliest segment on ties.
            if best.as_ref().map_or(true, |(d, _)| dist < *d) {
                let seg_len = distance(a, b);
                best = Some((
                    dist,
                    Projection {
                        closest,
                        arc_position: self.cumulative[i] + t * seg_len,
                    },
                ));
            }
        }
        best.map(|(_, p)| p)
    }
}

struct Projection {
    closest: Point,
    arc_position: f64,
}

fn distance(a: Point, b: Point) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// Project `p` onto segment `ab`, clamped to the segment. Returns the
/// closest point and the clamped parameter `t` in `[0, 1]`.
fn project_onto_segment(p: Point, a: Point, b: Point) -> (Point, f64) {
    let abx = b.0 - a.0;
    let aby = b.1 - a.1;
    let len_sq = abx * abx + aby * aby;
    if len_sq == 0.0 {
        return (a, 0.0);
    }
    let t = (((p.0 - a.0) * abx + (p.1 - a.1) * aby) / len_sq).clamp(0.0, 1.0);
    ((a.0 + t * abx, a.1 + t * aby), t)
}
