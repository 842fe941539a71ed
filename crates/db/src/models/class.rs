//! Classification enums mapping to SMALLINT columns.
//!
//! Discriminants are part of the stored data; never renumber.

/// Classification ID type matching SMALLINT in the database.
pub type ClassId = i16;

/// Which acquisition program a photo came in through.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketClass {
    App = 1,
    VolunteerTest = 2,
    Megamovie = 3,
    Teramovie = 4,
}

/// Whether an aligned frame shows the full disk during totality and is
/// therefore eligible for movie assembly.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    TotalityFullDisk = 1,
    Other = 2,
}

impl BucketClass {
    pub fn id(self) -> ClassId {
        self as ClassId
    }
}

impl FrameClass {
    pub fn id(self) -> ClassId {
        self as ClassId
    }
}

impl From<BucketClass> for ClassId {
    fn from(value: BucketClass) -> Self {
        value as ClassId
    }
}

impl From<FrameClass> for ClassId {
    fn from(value: FrameClass) -> Self {
        value as ClassId
    }
}
