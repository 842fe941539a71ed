/// Errors from the pure algorithmic core.
///
/// `NoCircleFound` and `DiskClipped` are expected outcomes for a large
/// share of crowd submissions, not faults; callers skip the photo and
/// move on.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("no sun disk found in image")]
    NoCircleFound,

    #[error("sun disk clipped by frame edge (cx {cx:.1}, cy {cy:.1}, r {r:.1})")]
    DiskClipped { cx: f64, cy: f64, r: f64 },

    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("timezone lookup failed: {0}")]
    Timezone(String),
}
