//! Request and response DTOs for the HTTP surface.

pub mod rider;
pub mod unit;

pub use rider::*;
pub use unit::*;
