//! Common test utilities for orchard-core integration tests

pub mod clock;
pub mod fixtures;
pub mod mock_repos;

#[allow(unused_imports)]
pub use clock::{ist, local, TestClock};
#[allow(unused_imports)]
pub use fixtures::{
    create_request, sample_address, sample_items, Harness, RecordingSender, TestService,
};
#[allow(unused_imports)]
pub use mock_repos::{MockAdminPauseRepository, MockDeliveryRepository, MockSubscriptionRepository};
