//! Worker process: configuration and daemon loop wiring.

pub mod config;
pub mod loops;
