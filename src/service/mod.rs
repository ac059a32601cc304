//! Service layer: dispatch orchestration, the matcher, write-behind
//! workers, and the payment gateway client.

pub mod dispatch;
pub mod matcher;
pub mod payment;
pub mod write_behind;

pub use dispatch::{CompletedTripView, DispatchService};
pub use payment::PaymentClient;
pub use write_behind::UnitStatusUpdate;
