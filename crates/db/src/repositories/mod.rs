pub mod frame_repo;
pub mod movie_repo;
pub mod photo_repo;

pub use frame_repo::FrameRepo;
pub use movie_repo::MovieRepo;
pub use photo_repo::PhotoRepo;
