//! Parser for the NASA eclipse path-limit table.
//!
//! The table is fixed-width text: one line per time sample carrying the
//! northern limit, southern limit, and center of the path of totality as
//! `DDD MM.MH` coordinate pairs (degrees, decimal minutes, hemisphere
//! letter). Two layouts exist: the raw NASA file, where the samples sit
//! between a pair of `Limits` delimiter lines, and a pre-stripped file
//! that is samples only. Both share the same column offsets.

use crate::types::Point;

/// Literal marker NASA uses for a missing coordinate. Lines carrying it
/// are skipped during construction.
pub const NO_DATA_MARKER: &str = "    -    ";

/// Delimiter line that brackets the sample block in the raw file.
const LIMITS_DELIMITER: &str = " Limits";

/// One line of the path table: the three path points at one instant.
///
/// Longitudes are stored west-negative (the table prints them as
/// positive west values, so the parser negates them).
#[derive(Debug, Clone, PartialEq)]
pub struct PathSample {
    /// Wall-clock label of the sample, e.g. `17:16`.
    pub time: String,
    pub northern: Point,
    pub center: Point,
    pub southern: Point,
}

/// Parse a pre-stripped path table (samples only, `#` comments allowed).
pub fn parse_stripped<'a, I>(lines: I) -> Vec<PathSample>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .filter(|line| !line.starts_with('#'))
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_line)
        .collect()
}

/// Parse the raw NASA file, keeping only lines between the `Limits`
/// delimiter pair and skipping comments and blanks.
pub fn parse_limits<'a, I>(lines: I) -> Vec<PathSample>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut in_limits = false;
    let mut samples = Vec::new();
    for line in lines {
        if line.starts_with(LIMITS_DELIMITER) {
            in_limits = !in_limits;
            continue;
        }
        if !in_limits || line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        if let Some(sample) = parse_line(line) {
            samples.push(sample);
        }
    }
    samples
}

/// Parse one fixed-width sample line. Returns `None` for lines carrying
/// the no-data marker or otherwise malformed fields.
fn parse_line(line: &str) -> Option<PathSample> {
    let time = line.get(0..5)?.trim().to_string();
    let nlat = line.get(7..16)?;
    if nlat == NO_DATA_MARKER {
        return None;
    }
    let nlon = line.get(17..26)?;
    let slat = line.get(27..36)?;
    let slon = line.get(37..46)?;
    let clat = line.get(47..56)?;
    let clon = line.get(57..66)?;

    // Longitudes in the table are positive-west; negate to the
    // west-negative convention used everywhere downstream.
    Some(PathSample {
        time,
        northern: (coord_to_decimal(nlat)?, -coord_to_decimal(nlon)?),
        center: (coord_to_decimal(clat)?, -coord_to_decimal(clon)?),
        southern: (coord_to_decimal(slat)?, -coord_to_decimal(slon)?),
    })
}

/// Convert a `DDD MM.MH` field like `" 40 19.3N"` to decimal degrees.
///
/// The first three characters are whole degrees, the rest (minus the
/// trailing hemisphere letter) decimal minutes. Checked slicing keeps
/// garbage fields (including multi-byte characters straddling a column
/// boundary) on the skip path instead of panicking.
fn coord_to_decimal(field: &str) -> Option<f64> {
    if field.len() < 5 {
        return None;
    }
    let degrees: f64 = field.get(0..3)?.trim().parse().ok()?;
    let minutes: f64 = field.get(4..field.len() - 1)?.trim().parse().ok()?;
    Some(degrees + minutes / 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Columns:  time   nlat      nlon      slat      slon      clat      clon
    const SAMPLE: &str =
        "17:16   44 49.5N 124 36.4W  44 19.1N 124 47.0W  44 34.3N 124 41.6W  0.01   3  93  12";
    const NO_DATA: &str = "17:10      -    ";

    #[test]
    fn coordinate_field_to_decimal() {
        let v = coord_to_decimal(" 44 49.5N").unwrap();
        assert!((v - (44.0 + 49.5 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn sample_line_parses_with_negated_longitude() {
        let s = parse_line(SAMPLE).unwrap();
        assert_eq!(s.time, "17:16");
        assert!((s.northern.0 - (44.0 + 49.5 / 60.0)).abs() < 1e-9);
        assert!((s.northern.1 + (124.0 + 36.4 / 60.0)).abs() < 1e-9);
        assert!(s.center.1 < 0.0);
        assert!(s.southern.1 < 0.0);
    }

    #[test]
    fn no_data_marker_is_skipped() {
        assert!(parse_line(NO_DATA).is_none());
        let samples = parse_stripped([NO_DATA, SAMPLE]);
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn stripped_parser_skips_comments_and_blanks() {
        let samples = parse_stripped(["# header", "", SAMPLE]);
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn limits_parser_only_reads_inside_delimiters() {
        let lines = [SAMPLE, " Limits", SAMPLE, SAMPLE, " Limits", SAMPLE];
        let samples = parse_limits(lines);
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn short_line_is_rejected() {
        assert!(parse_line("17:16  44 49.5N").is_none());
    }

    #[test]
    fn multibyte_garbage_in_a_field_is_skipped() {
        // Full-width line whose northern-latitude columns hold text with
        // a two-byte character across the degrees/minutes boundary.
        let line =
            "17:16  abéXYZ1N 124 36.4W  44 19.1N 124 47.0W  44 34.3N 124 41.6W  0.01   3  93  12";
        assert!(parse_line(line).is_none());
        assert!(parse_stripped([line]).is_empty());
    }
}
