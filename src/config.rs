//! Link configuration parameters
//!
//! All tunable timings for one serial link.
//! Values can be overridden from storage or the web UI; every override goes
//! through [`LinkConfig::validate`] first.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Per-link timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    // --- Handshake ---
    /// Delay between sync-start retries while awaiting the hub (ms)
    pub initial_retry_ms: u32,
    /// Silence after which a connected peer is declared lost (ms)
    pub disconnect_timeout_ms: u32,
    /// How long a sync may stay open waiting for sync-end (ms)
    pub sync_window_ms: u32,
    /// Hub liveness probe period (ms)
    pub hub_handshake_interval_ms: u32,

    // --- Preferences ---
    /// Quiet period after the last local edit before a block is pushed (ms)
    pub pref_push_debounce_ms: u32,

    // --- Music ---
    /// Index of the first music track on the audio device
    pub music_track_offset: u16,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            // Handshake
            initial_retry_ms: 750,
            disconnect_timeout_ms: 8000,
            sync_window_ms: 2000,
            hub_handshake_interval_ms: 4000,

            // Preferences
            pref_push_debounce_ms: 500,

            // Music
            music_track_offset: 500,
        }
    }
}

impl LinkConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), Error> {
        if !(100..=10_000).contains(&self.initial_retry_ms) {
            return Err(Error::Config("initial_retry_ms must be 100-10000"));
        }
        if !(1_000..=60_000).contains(&self.disconnect_timeout_ms) {
            return Err(Error::Config("disconnect_timeout_ms must be 1000-60000"));
        }
        if self.disconnect_timeout_ms <= self.initial_retry_ms {
            return Err(Error::Config(
                "disconnect_timeout_ms must exceed initial_retry_ms",
            ));
        }
        if !(100..=30_000).contains(&self.sync_window_ms) {
            return Err(Error::Config("sync_window_ms must be 100-30000"));
        }
        if !(250..=30_000).contains(&self.hub_handshake_interval_ms) {
            return Err(Error::Config("hub_handshake_interval_ms must be 250-30000"));
        }
        if self.hub_handshake_interval_ms >= self.disconnect_timeout_ms {
            return Err(Error::Config(
                "hub_handshake_interval_ms must be shorter than disconnect_timeout_ms",
            ));
        }
        if self.pref_push_debounce_ms > 10_000 {
            return Err(Error::Config("pref_push_debounce_ms must be 0-10000"));
        }
        if self.music_track_offset == 0 {
            return Err(Error::Config("music_track_offset must be non-zero"));
        }
        Ok(())
    }
}
