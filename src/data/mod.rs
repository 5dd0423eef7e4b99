//! Data sources.
//!
//! - `synthetic`: seeded edge profiles and sharp/blurred image pairs built
//!   from a known mixture

pub mod synthetic;

pub use synthetic::*;
