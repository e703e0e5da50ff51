//! Sparse transfer operators and the regridding facade

pub mod operator;
pub mod types;

pub use operator::*;
pub use types::*;
