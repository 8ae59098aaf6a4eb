pub mod drawable3d;
pub mod material;
pub mod mesh;

pub use drawable3d::*;
pub use material::*;
pub use mesh::*;
