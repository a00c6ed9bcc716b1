//! Hardware drivers.

pub mod sync_led;
