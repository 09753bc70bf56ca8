//! The streaming handle callers drive.

pub mod stretch;

pub use stretch::Stretch;
