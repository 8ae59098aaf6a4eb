//! Network boundary of the viewer.
//!
//! Everything loosely shaped that crosses the wire (building records, both
//! filter response shapes, persistence envelopes) is normalized here; the
//! engine only ever sees `Building`, `FilterResult` and catalog types.

pub mod client;
pub mod error;
pub mod normalize;
pub mod wire;

pub use client::*;
pub use error::*;
pub use normalize::*;
