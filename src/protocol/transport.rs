//! Transport abstraction: any channel that moves whole tagged frames.
//!
//! Concrete implementations:
//! - [`crate::adapters::serial::SerialPacketTransport`]: raw UART, framed
//!   by [`super::framing`]
//! - an external reliable-packet library bound by the board support code
//! - in-memory loopback pairs in the integration tests
//!
//! The link state machines are generic over [`PacketTransport`], so a new
//! transport needs zero changes to the protocol logic.

use heapless::Vec;

use super::packet::MAX_PAYLOAD;

/// One whole frame as handed over by the transport: a type tag plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub kind: u8,
    pub payload: Vec<u8, MAX_PAYLOAD>,
}

impl RawFrame {
    /// Copy `payload` into a frame.  `None` if it exceeds [`MAX_PAYLOAD`].
    pub fn new(kind: u8, payload: &[u8]) -> Option<Self> {
        Some(Self {
            kind,
            payload: Vec::from_slice(payload).ok()?,
        })
    }
}

/// Frame-oriented transport channel.
pub trait PacketTransport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Whether the transport can currently carry traffic.  When this
    /// returns `false` the link skips receive and send for that poll.
    fn is_ready(&self) -> bool {
        true
    }

    /// Take the next complete inbound frame, if any (non-blocking).
    fn poll(&mut self) -> Option<RawFrame>;

    /// Queue one frame for transmission.
    fn send(&mut self, kind: u8, payload: &[u8]) -> Result<(), Self::Error>;
}

/// A null transport that discards all writes and never reads.
/// Useful as a default before the UART is brought up.
pub struct NullTransport;

impl PacketTransport for NullTransport {
    type Error = ();

    fn is_ready(&self) -> bool {
        false
    }

    fn poll(&mut self) -> Option<RawFrame> {
        None
    }

    fn send(&mut self, _kind: u8, _payload: &[u8]) -> Result<(), ()> {
        Ok(())
    }
}
