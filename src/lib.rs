//! PackLink firmware library.
//!
//! Hub/accessory serial synchronisation: packet codec, mirrored state,
//! opcode dispatch, connection lifecycle and preference exchange.  Every
//! module builds on the host; ESP-IDF specifics sit behind the `espidf`
//! feature inside the adapters that need them.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod link;
pub mod notify;
pub mod prefs;
pub mod protocol;
pub mod state;
pub mod status;

pub mod adapters;
pub mod drivers;

pub use error::{Error, Result};
