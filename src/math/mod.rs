//! Mathematical utilities: sampling grids, 2-D filtering and distances.

pub mod filter;
pub mod grid;

pub use filter::*;
pub use grid::*;
