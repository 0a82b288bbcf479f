//! Orchard Types - Shared domain types
//!
//! This crate contains domain types used across Orchard crates:
//! - Identifiers for users, plans, subscriptions, deliveries and admin pauses
//! - Subscription, delivery and admin pause records
//! - Closed status enums with string round-tripping for storage

pub mod admin_pause;
pub mod delivery;
pub mod error;
pub mod pricing;
pub mod status;
pub mod subscription;
pub mod user;

pub use admin_pause::*;
pub use delivery::*;
pub use error::*;
pub use pricing::*;
pub use status::*;
pub use subscription::*;
pub use user::*;
