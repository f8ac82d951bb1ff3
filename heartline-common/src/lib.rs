pub mod api;
pub mod frame;

pub use api::*;
pub use frame::*;
