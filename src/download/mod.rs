//! Download system.

pub mod stream;

pub use stream::*;
