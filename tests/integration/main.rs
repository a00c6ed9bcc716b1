//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below exercises the link layer end to end over an in-memory
//! loopback.  Everything runs on the host with no hardware attached.

mod hub_tests;
mod lifecycle_tests;
mod mock_link;
mod preference_tests;
