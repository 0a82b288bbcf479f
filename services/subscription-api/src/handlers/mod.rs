//! REST API handlers

pub mod admin_pauses;
pub mod health;
pub mod maintenance;
pub mod shared;
pub mod subscriptions;

pub use admin_pauses::*;
pub use health::*;
pub use maintenance::*;
pub use subscriptions::*;
