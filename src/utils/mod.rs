//! Utility functions for ytfetch

pub mod cache;
pub mod cookies;
pub mod url;

pub use cache::*;
pub use cookies::*;
pub use url::*;
