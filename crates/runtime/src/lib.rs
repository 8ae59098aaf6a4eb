pub mod event_bus;
pub mod frame;
pub mod gate;

pub use event_bus::*;
pub use frame::*;
pub use gate::*;
