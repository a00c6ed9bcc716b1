//! Application boundary: pure domain logic, zero I/O.
//!
//! The link state machines talk to the outside world only through the
//! **port traits** in [`ports`], emit [`events::LinkEvent`]s, and accept
//! [`commands::AccessoryCommand`]s from the UI side.  Everything here is
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
