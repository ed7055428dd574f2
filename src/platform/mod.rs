//! Service platform layer: client profiles, request envelope, player
//! bootstrap and cipher evaluation.

pub mod ast;
pub mod cipher;
pub mod formats;
pub mod http;
pub mod innertube;
pub mod player;
pub mod profiles;

pub use ast::*;
pub use formats::*;
pub use http::*;
pub use innertube::*;
pub use player::*;
pub use profiles::*;
