//! Sun-disk detection.
//!
//! Grayscale, smooth, unsharp-mask, smooth again, then a Hough
//! gradient-vote circle transform: every strong-gradient pixel votes
//! for candidate centers along its gradient line at each plausible
//! radius. The accumulator peak only seeds the answer; the center is
//! then pulled to sub-pixel by a least-squares circle fit over the edge
//! points near the mode radius, and the radius comes from the
//! edge-distance histogram around that center. Detection runs on a copy
//! rescaled to HD bounds; the result is mapped back to source
//! coordinates.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};

use crate::error::CoreError;

/// Detection frame bounds; every input is rescaled into this box
/// (aspect preserved) before the transform runs.
pub const HD_MAX_WIDTH: u32 = 1920;
pub const HD_MAX_HEIGHT: u32 = 1080;

/// Gaussian sigma for both smoothing passes.
const SMOOTH_SIGMA: f32 = 2.0;

/// Unsharp-mask weights: `sharp = 1.5·original − 0.5·smoothed`.
const SHARPEN_WEIGHT: f32 = 1.5;
const SMOOTHED_WEIGHT: f32 = -0.5;

/// Minimum Sobel gradient magnitude for a pixel to cast votes.
const GRADIENT_THRESHOLD: f32 = 100.0;

/// Minimum accumulator peak (and radius-histogram mode) to accept a
/// circle at all.
const ACCUMULATOR_THRESHOLD: u32 = 15;

/// Smallest radius considered, in detection-frame pixels.
const MIN_RADIUS: u32 = 10;

/// Band around the current radius estimate, in detection-frame pixels,
/// from which the center fit draws its edge points.
const FIT_BAND: f32 = 4.0;

/// A detected circle in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
}

/// Fit `(width, height)` into `(max_w, max_h)` preserving aspect ratio.
pub fn rescaled_dimensions(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let given_ratio = max_w as f64 / max_h as f64;
    let ratio = width as f64 / height as f64;
    if ratio > given_ratio {
        let h = (max_w as f64 / ratio).round().max(1.0) as u32;
        (max_w, h)
    } else {
        let w = (ratio * max_h as f64).round().max(1.0) as u32;
        (w, max_h)
    }
}

/// Find the most prominent circle in `img`.
///
/// Returns `CoreError::NoCircleFound` when no accumulator peak clears
/// the vote threshold; only the single most prominent circle is ever
/// reported.
pub fn find_sun_disk(img: &DynamicImage) -> Result<Circle, CoreError> {
    let gray = img.to_luma8();
    let (w, h) = gray.dimensions();
    let (dw, dh) = rescaled_dimensions(w, h, HD_MAX_WIDTH, HD_MAX_HEIGHT);
    let gray = imageops::resize(&gray, dw, dh, FilterType::Triangle);

    let smoothed = imageops::blur(&gray, SMOOTH_SIGMA);
    let sharpened = unsharp_mask(&gray, &smoothed);
    let prepared = imageops::blur(&sharpened, SMOOTH_SIGMA);

    let detected = hough_circle(&prepared)?;

    // Map back to source coordinates. Aspect is preserved, so one
    // scale factor serves both axes.
    let scale = w as f64 / dw as f64;
    Ok(Circle {
        cx: detected.cx * scale,
        cy: detected.cy * scale,
        r: detected.r * scale,
    })
}

/// Weighted difference of the original and its smoothed copy.
fn unsharp_mask(original: &GrayImage, smoothed: &GrayImage) -> GrayImage {
    let mut out = original.clone();
    for (dst, src) in out.pixels_mut().zip(smoothed.pixels()) {
        let v = SHARPEN_WEIGHT * dst.0[0] as f32 + SMOOTHED_WEIGHT * src.0[0] as f32;
        dst.0[0] = v.clamp(0.0, 255.0) as u8;
    }
    out
}

/// An edge pixel with its unit gradient direction.
struct EdgePoint {
    x: f32,
    y: f32,
    ux: f32,
    uy: f32,
}

/// Hough gradient-vote transform over the prepared detection frame.
fn hough_circle(img: &GrayImage) -> Result<Circle, CoreError> {
    let (w, h) = img.dimensions();
    let edges = sobel_edges(img);
    if edges.is_empty() {
        return Err(CoreError::NoCircleFound);
    }

    let max_radius = (w.min(h) / 2).max(MIN_RADIUS);

    // Center accumulator: each edge pixel votes along its gradient
    // line, both directions, once per candidate radius.
    let mut accumulator = vec![0u32; (w * h) as usize];
    for e in &edges {
        for r in MIN_RADIUS..=max_radius {
            let rf = r as f32;
            for sign in [1.0f32, -1.0] {
                let cx = (e.x + sign * rf * e.ux).round();
                let cy = (e.y + sign * rf * e.uy).round();
                if cx >= 0.0 && cy >= 0.0 && (cx as u32) < w && (cy as u32) < h {
                    accumulator[(cy as u32 * w + cx as u32) as usize] += 1;
                }
            }
        }
    }

    let (peak_idx, &peak_votes) = accumulator
        .iter()
        .enumerate()
        .max_by_key(|(_, v)| **v)
        .ok_or(CoreError::NoCircleFound)?;
    if peak_votes < ACCUMULATOR_THRESHOLD {
        return Err(CoreError::NoCircleFound);
    }

    // The vote peak sits on a broad plateau and can land several pixels
    // off the true center. Treat it as a seed: estimate the radius,
    // fit the edge points near that radius, and re-select as the
    // estimate improves.
    let mut cx = (peak_idx as u32 % w) as f32;
    let mut cy = (peak_idx as u32 / w) as f32;
    let mut r = estimate_radius(&edges, cx, cy, max_radius)?;
    for _ in 0..3 {
        let Some((fx, fy)) = fit_center(&edges, cx, cy, r) else {
            break;
        };
        cx = fx;
        cy = fy;
        r = estimate_radius(&edges, cx, cy, max_radius)?;
    }

    Ok(Circle {
        cx: cx as f64,
        cy: cy as f64,
        r: r as f64,
    })
}

/// Least-squares circle center through the edge points within
/// `FIT_BAND` of radius `r` around `(cx, cy)`.
///
/// Kasa's algebraic fit on mean-centered coordinates. Exact for points
/// on a circle even when they cover only an arc, which is what makes it
/// safe to run from a biased seed. `None` when too few points fall in
/// the band or the system is degenerate (collinear points).
fn fit_center(edges: &[EdgePoint], cx: f32, cy: f32, r: f32) -> Option<(f32, f32)> {
    let pts: Vec<(f64, f64)> = edges
        .iter()
        .filter(|e| {
            let d = ((e.x - cx).powi(2) + (e.y - cy).powi(2)).sqrt();
            (d - r).abs() <= FIT_BAND
        })
        .map(|e| (e.x as f64, e.y as f64))
        .collect();
    if (pts.len() as u32) < ACCUMULATOR_THRESHOLD {
        return None;
    }

    let n = pts.len() as f64;
    let mx = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pts.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut suu, mut suv, mut svv) = (0.0f64, 0.0, 0.0);
    let (mut suuu, mut svvv, mut suvv, mut svuu) = (0.0f64, 0.0, 0.0, 0.0);
    for (x, y) in &pts {
        let u = x - mx;
        let v = y - my;
        suu += u * u;
        suv += u * v;
        svv += v * v;
        suuu += u * u * u;
        svvv += v * v * v;
        suvv += u * v * v;
        svuu += v * u * u;
    }
    let det = suu * svv - suv * suv;
    if det.abs() < 1e-9 {
        return None;
    }

    let bu = (suuu + suvv) / 2.0;
    let bv = (svvv + svuu) / 2.0;
    let uc = (bu * svv - bv * suv) / det;
    let vc = (bv * suu - bu * suv) / det;
    Some(((mx + uc) as f32, (my + vc) as f32))
}

/// Radius from the mode of the edge-distance histogram around the
/// center, refined to the mean distance within ±2 px of the mode.
fn estimate_radius(edges: &[EdgePoint], cx: f32, cy: f32, max_radius: u32) -> Result<f32, CoreError> {
    let mut histogram = vec![0u32; max_radius as usize + 1];
    let distances: Vec<f32> = edges
        .iter()
        .map(|e| ((e.x - cx).powi(2) + (e.y - cy).powi(2)).sqrt())
        .collect();
    for &d in &distances {
        let bin = d.round() as u32;
        if (MIN_RADIUS..=max_radius).contains(&bin) {
            histogram[bin as usize] += 1;
        }
    }

    let (mode, &count) = histogram
        .iter()
        .enumerate()
        .max_by_key(|(_, c)| **c)
        .ok_or(CoreError::NoCircleFound)?;
    if count < ACCUMULATOR_THRESHOLD {
        return Err(CoreError::NoCircleFound);
    }

    let mode = mode as f32;
    let near: Vec<f32> = distances
        .iter()
        .copied()
        .filter(|d| (d - mode).abs() <= 2.0)
        .collect();
    if near.is_empty() {
        return Ok(mode);
    }
    Ok(near.iter().sum::<f32>() / near.len() as f32)
}

/// Collect pixels whose Sobel gradient magnitude clears the threshold,
/// along with their unit gradient directions.
fn sobel_edges(img: &GrayImage) -> Vec<EdgePoint> {
    let (w, h) = img.dimensions();
    let mut edges = Vec::new();
    if w < 3 || h < 3 {
        return edges;
    }
    let px = |x: u32, y: u32| img.get_pixel(x, y).0[0] as f32;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1)
                - px(x - 1, y - 1)
                - 2.0 * px(x - 1, y)
                - px(x - 1, y + 1);
            let gy = px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1)
                - px(x - 1, y - 1)
                - 2.0 * px(x, y - 1)
                - px(x + 1, y - 1);
            let mag = (gx * gx + gy * gy).sqrt();
            if mag >= GRADIENT_THRESHOLD {
                edges.push(EdgePoint {
                    x: x as f32,
                    y: y as f32,
                    ux: gx / mag,
                    uy: gy / mag,
                });
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Paint a filled bright disk on a black frame.
    fn disk_image(w: u32, h: u32, cx: f64, cy: f64, r: f64) -> DynamicImage {
        let mut img = RgbImage::new(w, h);
        for (x, y, p) in img.enumerate_pixels_mut() {
            let d = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt();
            if d <= r {
                *p = Rgb([250, 245, 230]);
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn rescaled_dimensions_fit_the_hd_box() {
        assert_eq!(rescaled_dimensions(3840, 2160, 1920, 1080), (1920, 1080));
        assert_eq!(rescaled_dimensions(800, 600, 1920, 1080), (1440, 1080));
        assert_eq!(rescaled_dimensions(4000, 1000, 1920, 1080), (1920, 480));
        assert_eq!(rescaled_dimensions(1920, 1080, 1920, 1080), (1920, 1080));
    }

    #[test]
    fn finds_centered_disk() {
        let img = disk_image(640, 480, 320.0, 240.0, 80.0);
        let c = find_sun_disk(&img).unwrap();
        assert!((c.cx - 320.0).abs() < 2.0, "cx = {}", c.cx);
        assert!((c.cy - 240.0).abs() < 2.0, "cy = {}", c.cy);
        assert!((c.r - 80.0).abs() < 3.0, "r = {}", c.r);
    }

    #[test]
    fn finds_offset_disk() {
        let img = disk_image(800, 600, 300.0, 250.0, 50.0);
        let c = find_sun_disk(&img).unwrap();
        assert!((c.cx - 300.0).abs() < 2.0, "cx = {}", c.cx);
        assert!((c.cy - 250.0).abs() < 2.0, "cy = {}", c.cy);
        assert!((c.r - 50.0).abs() < 2.0, "r = {}", c.r);
    }

    #[test]
    fn finds_disk_away_from_center() {
        let img = disk_image(640, 480, 150.0, 150.0, 60.0);
        let c = find_sun_disk(&img).unwrap();
        assert!((c.cx - 150.0).abs() < 2.0, "cx = {}", c.cx);
        assert!((c.cy - 150.0).abs() < 2.0, "cy = {}", c.cy);
        assert!((c.r - 60.0).abs() < 3.0, "r = {}", c.r);
    }

    #[test]
    fn black_frame_has_no_circle() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(320, 240));
        assert!(matches!(
            find_sun_disk(&img),
            Err(CoreError::NoCircleFound)
        ));
    }

    #[test]
    fn flat_gray_frame_has_no_circle() {
        let mut buf = RgbImage::new(320, 240);
        for p in buf.pixels_mut() {
            *p = Rgb([128, 128, 128]);
        }
        assert!(matches!(
            find_sun_disk(&DynamicImage::ImageRgb8(buf)),
            Err(CoreError::NoCircleFound)
        ));
    }
}
