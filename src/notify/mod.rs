//! Notification fan-out: bounded per-subscriber queues feeding the
//! server-push stream endpoints.

pub mod bus;

pub use bus::{NotificationBus, SubscriberHandle, SUBSCRIBER_QUEUE_DEPTH};
