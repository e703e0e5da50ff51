//! Overlay engine: broad-phase candidate search plus narrow-phase clipping

pub mod engine;
pub mod types;

pub use engine::*;
pub use types::*;
