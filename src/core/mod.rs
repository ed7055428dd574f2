//! Core metadata types.

pub mod playlist;
pub mod video;

pub use playlist::*;
pub use video::*;
