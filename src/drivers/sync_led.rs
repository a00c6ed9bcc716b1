//! Link indicator LED.
//!
//! | Link state      | LED                   |
//! |-----------------|-----------------------|
//! | `AwaitingSync`  | off                   |
//! | `SyncRequested` | fast blink (4 Hz)     |
//! | `Connected`     | solid on              |
//!
//! Generic over any `embedded-hal` output pin; the pin is only written when
//! the level changes.

use embedded_hal::digital::OutputPin;

use crate::link::ConnectionState;

/// Half-period of the sync blink.
const BLINK_HALF_PERIOD_MS: u64 = 125;

pub struct SyncLed<P: OutputPin> {
    pin: P,
    lit: Option<bool>,
}

impl<P: OutputPin> SyncLed<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, lit: None }
    }

    /// Drive the LED for `state` at time `now_ms`.
    pub fn update(&mut self, state: ConnectionState, now_ms: u64) -> Result<(), P::Error> {
        let want = match state {
            ConnectionState::AwaitingSync => false,
            ConnectionState::SyncRequested => (now_ms / BLINK_HALF_PERIOD_MS) % 2 == 0,
            ConnectionState::Connected => true,
        };
        if self.lit == Some(want) {
            return Ok(());
        }
        if want {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        self.lit = Some(want);
        Ok(())
    }

    pub fn is_lit(&self) -> bool {
        self.lit.unwrap_or(false)
    }

    pub fn release(self) -> P {
        self.pin
    }
}
