//! Companion map for a movie: where the contributing photos came from.
//!
//! Plots the path of totality and one dot per geographic cluster on a
//! plain-carree canvas sized to the movie frame. Rendered once per
//! assembly pass and uploaded beside the artifact.

use std::collections::BTreeMap;

use image::{Rgb, RgbImage};

use megamovie_core::geometry::EclipsePath;
use megamovie_core::types::Point;

pub const OVERLAY_WIDTH: u32 = 1920;
pub const OVERLAY_HEIGHT: u32 = 1080;

const MARGIN_FRACTION: f64 = 0.05;
const CENTERLINE_COLOR: Rgb<u8> = Rgb([120, 120, 120]);
const CLUSTER_COLOR: Rgb<u8> = Rgb([255, 196, 0]);

/// Render the cluster map. Cluster dot area scales with membership so
/// popular sites read as larger marks.
pub fn render_cluster_map(
    path: &EclipsePath,
    centers: &BTreeMap<i32, Point>,
    sizes: &BTreeMap<i32, usize>,
) -> RgbImage {
    let mut canvas = RgbImage::new(OVERLAY_WIDTH, OVERLAY_HEIGHT);
    let Some(frame) = MapFrame::fit(path, centers) else {
        return canvas;
    };

    for segment in path.centerline().windows(2) {
        let (x0, y0) = frame.to_pixel(segment[0]);
        let (x1, y1) = frame.to_pixel(segment[1]);
        draw_line(&mut canvas, x0, y0, x1, y1, CENTERLINE_COLOR);
    }

    for (label, center) in centers {
        let count = sizes.get(label).copied().unwrap_or(1);
        let radius = dot_radius(count);
        let (x, y) = frame.to_pixel(*center);
        draw_disk(&mut canvas, x, y, radius, CLUSTER_COLOR);
    }

    canvas
}

fn dot_radius(count: usize) -> i64 {
    (4.0 + (count as f64).sqrt()).min(24.0) as i64
}

/// Linear lat/lon to pixel mapping over the content bounding box.
struct MapFrame {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl MapFrame {
    fn fit(path: &EclipsePath, centers: &BTreeMap<i32, Point>) -> Option<Self> {
        let points = path.boundary().iter().chain(centers.values());
        let mut bounds: Option<MapFrame> = None;
        for &(lat, lon) in points {
            let b = bounds.get_or_insert(MapFrame {
                min_lat: lat,
                max_lat: lat,
                min_lon: lon,
                max_lon: lon,
            });
            b.min_lat = b.min_lat.min(lat);
            b.max_lat = b.max_lat.max(lat);
            b.min_lon = b.min_lon.min(lon);
            b.max_lon = b.max_lon.max(lon);
        }
        let mut b = bounds?;
        let lat_pad = ((b.max_lat - b.min_lat) * MARGIN_FRACTION).max(0.5);
        let lon_pad = ((b.max_lon - b.min_lon) * MARGIN_FRACTION).max(0.5);
        b.min_lat -= lat_pad;
        b.max_lat += lat_pad;
        b.min_lon -= lon_pad;
        b.max_lon += lon_pad;
        Some(b)
    }

    fn to_pixel(&self, (lat, lon): Point) -> (i64, i64) {
        let x = (lon - self.min_lon) / (self.max_lon - self.min_lon);
        let y = (self.max_lat - lat) / (self.max_lat - self.min_lat);
        (
            (x * f64::from(OVERLAY_WIDTH - 1)).round() as i64,
            (y * f64::from(OVERLAY_HEIGHT - 1)).round() as i64,
        )
    }
}

fn put_pixel_checked(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_disk(canvas: &mut RgbImage, cx: i64, cy: i64, radius: i64, color: Rgb<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_checked(canvas, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Bresenham segment draw.
fn draw_line(canvas: &mut RgbImage, mut x0: i64, mut y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel_checked(canvas, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_path() -> EclipsePath {
        EclipsePath::new(
            vec![(44.0, -124.0), (44.0, -80.0), (36.0, -80.0), (36.0, -124.0)],
            vec![(40.0, -124.0), (40.0, -80.0)],
        )
    }

    fn non_black_pixels(img: &RgbImage) -> usize {
        img.pixels().filter(|p| p.0 != [0, 0, 0]).count()
    }

    #[test]
    fn renders_centerline_and_cluster_dots() {
        let path = test_path();
        let mut centers = BTreeMap::new();
        centers.insert(0, (40.0, -100.0));
        let mut sizes = BTreeMap::new();
        sizes.insert(0, 400usize);

        let img = render_cluster_map(&path, &centers, &sizes);
        assert_eq!(img.dimensions(), (OVERLAY_WIDTH, OVERLAY_HEIGHT));
        // Centerline plus a dot of radius 24 is well past a thousand
        // lit pixels.
        assert!(non_black_pixels(&img) > 1000);

        // The dot sits near the middle of the map horizontally.
        let empty = render_cluster_map(&path, &BTreeMap::new(), &BTreeMap::new());
        assert!(non_black_pixels(&img) > non_black_pixels(&empty));
    }

    #[test]
    fn empty_path_and_clusters_render_black() {
        let path = EclipsePath::new(Vec::new(), Vec::new());
        let img = render_cluster_map(&path, &BTreeMap::new(), &BTreeMap::new());
        assert_eq!(non_black_pixels(&img), 0);
    }

    #[test]
    fn dot_radius_grows_with_membership_but_saturates() {
        assert!(dot_radius(1) < dot_radius(100));
        assert_eq!(dot_radius(10_000), 24);
    }
}
