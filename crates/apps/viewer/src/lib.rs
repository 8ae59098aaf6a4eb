//! Engine session and the headless driver around it.

pub mod engine;
pub mod session;

pub use engine::*;
