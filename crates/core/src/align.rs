//! Canonical frame alignment.
//!
//! A detected sun disk is moved to the frame center, scaled so its
//! radius hits the canonical value, then padded or cropped (centered,
//! per axis) to the canonical resolution. A disk whose bounding box
//! leaves the source frame is rejected outright: partially clipped
//! disks would smear across the movie.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};

use crate::circle::Circle;
use crate::error::CoreError;

/// Canonical output resolution.
pub const CANONICAL_WIDTH: u32 = 1920;
pub const CANONICAL_HEIGHT: u32 = 1080;

/// Canonical sun radius in output pixels.
pub const CANONICAL_SUN_RADIUS: f64 = 100.0;

/// Recenter, rescale, and pad/crop `img` so the detected disk sits at
/// the center of a canonical-resolution frame with the canonical
/// radius. No partial output: rejection returns before any work.
pub fn align_to_canonical(img: &DynamicImage, disk: &Circle) -> Result<RgbImage, CoreError> {
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();

    if disk.cx - disk.r < 0.0
        || disk.cy - disk.r < 0.0
        || disk.cx + disk.r >= w as f64
        || disk.cy + disk.r >= h as f64
    {
        return Err(CoreError::DiskClipped {
            cx: disk.cx,
            cy: disk.cy,
            r: disk.r,
        });
    }

    // Translate the disk center onto the frame center.
    let dx = (w as f64 / 2.0 - disk.cx).round() as i64;
    let dy = (h as f64 / 2.0 - disk.cy).round() as i64;
    let mut centered = RgbImage::new(w, h);
    imageops::replace(&mut centered, &rgb, dx, dy);

    // Uniform rescale so the disk radius becomes canonical.
    let ratio = CANONICAL_SUN_RADIUS / disk.r;
    let sw = ((w as f64 * ratio).round()).max(1.0) as u32;
    let sh = ((h as f64 * ratio).round()).max(1.0) as u32;
    let scaled = imageops::resize(&centered, sw, sh, FilterType::Triangle);

    // Per-axis centered pad or crop to the canonical resolution. The
    // four over/under combinations all reduce to these two steps.
    let fitted = fit_width(scaled, CANONICAL_WIDTH);
    let fitted = fit_height(fitted, CANONICAL_HEIGHT);

    // Exact already in the common case; the resize is a safety net for
    // rounding drift on extreme aspect ratios.
    if fitted.dimensions() == (CANONICAL_WIDTH, CANONICAL_HEIGHT) {
        Ok(fitted)
    } else {
        Ok(imageops::resize(
            &fitted,
            CANONICAL_WIDTH,
            CANONICAL_HEIGHT,
            FilterType::Triangle,
        ))
    }
}

/// Centered crop (oversize) or black pad (undersize) to `target` width.
fn fit_width(img: RgbImage, target: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    match w.cmp(&target) {
        std::cmp::Ordering::Greater => {
            let left = (w - target) / 2;
            imageops::crop_imm(&img, left, 0, target, h).to_image()
        }
        std::cmp::Ordering::Less => {
            let mut canvas = RgbImage::new(target, h);
            imageops::replace(&mut canvas, &img, ((target - w) / 2) as i64, 0);
            canvas
        }
        std::cmp::Ordering::Equal => img,
    }
}

/// Centered crop or black pad to `target` height.
fn fit_height(img: RgbImage, target: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    match h.cmp(&target) {
        std::cmp::Ordering::Greater => {
            let top = (h - target) / 2;
            imageops::crop_imm(&img, 0, top, w, target).to_image()
        }
        std::cmp::Ordering::Less => {
            let mut canvas = RgbImage::new(w, target);
            imageops::replace(&mut canvas, &img, 0, ((target - h) / 2) as i64);
            canvas
        }
        std::cmp::Ordering::Equal => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn disk_image(w: u32, h: u32, cx: f64, cy: f64, r: f64) -> DynamicImage {
        let mut img = RgbImage::new(w, h);
        for (x, y, p) in img.enumerate_pixels_mut() {
            let d = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt();
            if d <= r {
                *p = Rgb([255, 255, 255]);
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    /// Bounding box of bright pixels: (center_x, center_y, radius).
    fn measure_disk(img: &RgbImage) -> (f64, f64, f64) {
        let mut min_x = u32::MAX;
        let mut max_x = 0;
        let mut min_y = u32::MAX;
        let mut max_y = 0;
        for (x, y, p) in img.enumerate_pixels() {
            if p.0[0] > 128 {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }
        assert!(min_x < max_x, "no bright pixels found");
        (
            (min_x + max_x) as f64 / 2.0,
            (min_y + max_y) as f64 / 2.0,
            ((max_x - min_x) as f64 + (max_y - min_y) as f64) / 4.0,
        )
    }

    fn circle(cx: f64, cy: f64, r: f64) -> Circle {
        Circle { cx, cy, r }
    }

    #[test]
    fn output_is_canonical_for_all_four_size_cases() {
        // (input size, radius) chosen so scaling lands each side of the
        // canonical box: both over, wide/short, narrow/tall, both under.
        let cases = [
            (4000u32, 3000u32, 100.0),
            (4000, 1000, 150.0),
            (900, 2400, 150.0),
            (800, 600, 120.0),
        ];
        for (w, h, r) in cases {
            let cx = w as f64 / 2.0;
            let cy = h as f64 / 2.0;
            let img = disk_image(w, h, cx, cy, r);
            let aligned = align_to_canonical(&img, &circle(cx, cy, r)).unwrap();
            assert_eq!(
                aligned.dimensions(),
                (CANONICAL_WIDTH, CANONICAL_HEIGHT),
                "input {w}x{h} r {r}"
            );
        }
    }

    #[test]
    fn canonical_input_is_a_noop_in_size() {
        let img = disk_image(1920, 1080, 960.0, 540.0, 100.0);
        let aligned = align_to_canonical(&img, &circle(960.0, 540.0, 100.0)).unwrap();
        assert_eq!(aligned.dimensions(), (CANONICAL_WIDTH, CANONICAL_HEIGHT));
    }

    #[test]
    fn offset_disk_ends_centered_at_canonical_radius() {
        // Radius 50 gives an exact 2x scale, isolating the geometry
        // from resampling error.
        let img = disk_image(800, 600, 300.0, 250.0, 50.0);
        let aligned = align_to_canonical(&img, &circle(300.0, 250.0, 50.0)).unwrap();
        assert_eq!(aligned.dimensions(), (CANONICAL_WIDTH, CANONICAL_HEIGHT));

        let (cx, cy, r) = measure_disk(&aligned);
        assert!((cx - 960.0).abs() <= 1.0, "cx = {cx}");
        assert!((cy - 540.0).abs() <= 1.0, "cy = {cy}");
        assert!((r - CANONICAL_SUN_RADIUS).abs() <= 1.5, "r = {r}");
    }

    #[test]
    fn clipped_disk_is_rejected() {
        let img = disk_image(400, 300, 30.0, 150.0, 50.0);
        let err = align_to_canonical(&img, &circle(30.0, 150.0, 50.0)).unwrap_err();
        assert!(matches!(err, CoreError::DiskClipped { .. }));
    }

    #[test]
    fn disk_touching_right_edge_is_rejected() {
        let img = disk_image(400, 300, 380.0, 150.0, 40.0);
        let err = align_to_canonical(&img, &circle(380.0, 150.0, 40.0)).unwrap_err();
        assert!(matches!(err, CoreError::DiskClipped { .. }));
    }
}
