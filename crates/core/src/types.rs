/// Photo identities are hex SHA-256 content hashes, assigned by the
/// upload endpoint. Object names in blob storage use the same value.
pub type PhotoId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A geographic coordinate as `(lat, lon)` in decimal degrees.
///
/// Geometry and timezone lookups expect west-negative longitudes.
/// Photo records store the opposite sign (a convention inherited from
/// the submission format), so their call sites negate `lon` first.
pub type Point = (f64, f64);
