pub mod highlight;
pub mod mesh;
pub mod picker;
pub mod record;
pub mod shape;
pub mod store;
pub mod symbology;
pub mod sync;

pub use highlight::*;
pub use record::*;
pub use store::*;
