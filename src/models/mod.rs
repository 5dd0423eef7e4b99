//! Basis shapes and the weighted mixture built from them.
//!
//! Shapes are small, pure value types so that the mixture and the fitting
//! code can stay generic over the family.

pub mod mixture;
pub mod shape;

pub use mixture::*;
pub use shape::*;
