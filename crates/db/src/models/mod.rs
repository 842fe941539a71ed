pub mod class;
pub mod movie;
pub mod oriented_image;
pub mod photo;

pub use class::{BucketClass, ClassId, FrameClass};
pub use movie::Movie;
pub use oriented_image::{AssemblyFrame, NewOrientedImage, OrientedImage};
pub use photo::{GpsUpdate, Photo};
