//! GPS/time completeness repair within one submission batch.
//!
//! Photos uploaded in one session are assumed to come from one
//! location but different instants. A record missing lat/lon borrows
//! them from the most recently captured complete sibling; a record
//! missing its capture timestamp rebuilds it from the camera wall
//! clock shifted by the location's UTC offset. Present fields are
//! never overwritten, which also makes a second repair pass a no-op.

use async_trait::async_trait;
use chrono::Duration;

use crate::error::CoreError;
use crate::types::{PhotoId, Timestamp};

/// Reverse-timezone lookup seam. The production implementation calls a
/// remote time-zone API; tests substitute a fixed offset.
#[async_trait]
pub trait TimezoneLookup: Send + Sync {
    /// Total UTC offset (standard plus DST) in effect at `(lat, lon)`
    /// around the instant `at`. Longitude is west-negative.
    async fn utc_offset(&self, lat: f64, lon: f64, at: Timestamp) -> Result<Duration, CoreError>;
}

/// The metadata slice of a photo record that repair reads and writes.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairRecord {
    pub id: PhotoId,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub capture_timestamp: Option<Timestamp>,
    pub camera_clock_timestamp: Option<Timestamp>,
    pub timestamp_repaired: bool,
}

impl RepairRecord {
    /// Complete means lat, lon, and capture timestamp are all present.
    pub fn is_complete(&self) -> bool {
        self.lat.is_some() && self.lon.is_some() && self.capture_timestamp.is_some()
    }
}

/// Split a batch into complete and incomplete records, preserving scan
/// order within each part.
pub fn partition(records: Vec<RepairRecord>) -> (Vec<RepairRecord>, Vec<RepairRecord>) {
    records.into_iter().partition(RepairRecord::is_complete)
}

/// Pick the trust source: the complete record with the latest capture
/// timestamp. Ties keep the first record in scan order, which makes
/// the choice deterministic for a stable scan.
pub fn choose_trust_source(complete: &[RepairRecord]) -> Option<&RepairRecord> {
    complete.iter().fold(None, |best, record| match best {
        None if record.capture_timestamp.is_some() => Some(record),
        Some(b) if record.capture_timestamp > b.capture_timestamp => Some(record),
        _ => best,
    })
}

/// Repair every incomplete record in place. Returns the number of
/// records that changed.
///
/// Lat/lon are copied from the trust source only when absent; the trust
/// source's capture timestamp is never copied. A missing capture
/// timestamp is rebuilt as `camera_clock − utc_offset(lat, −lon)` once
/// coordinates are available, marking the record repaired. With no
/// trust source, coordinate backfill is a no-op but timestamp repair
/// still runs for records that already carry their own coordinates.
pub async fn repair_incomplete(
    trust_source: Option<&RepairRecord>,
    incomplete: &mut [RepairRecord],
    tz: &dyn TimezoneLookup,
) -> Result<usize, CoreError> {
    let mut changed = 0;
    for record in incomplete {
        let mut touched = false;

        if let Some(source) = trust_source {
            if record.lat.is_none() {
                record.lat = source.lat;
                touched = true;
            }
            if record.lon.is_none() {
                record.lon = source.lon;
                touched = true;
            }
        }

        if record.capture_timestamp.is_none() {
            if let (Some(camera), Some(lat), Some(lon)) =
                (record.camera_clock_timestamp, record.lat, record.lon)
            {
                // Camera clocks read local wall time; the path table
                // convention flips the longitude sign for the lookup.
                let offset = tz.utc_offset(lat, -lon, camera).await?;
                record.capture_timestamp = Some(camera - offset);
                record.timestamp_repaired = true;
                touched = true;
            }
        }

        if touched {
            changed += 1;
        }
    }
    Ok(changed)
}
