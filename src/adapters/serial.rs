//! UART packet transport.
//!
//! Adapts any non-blocking byte channel into a [`PacketTransport`] by
//! running the [`StreamFramer`] over received bytes and framing outbound
//! packets with [`encode_frame`].
//!
//! ```text
//!  UART rx ──▶ StreamFramer ──▶ pending frames ──▶ poll()
//!  send() ──▶ encode_frame ──▶ UART tx
//! ```

use heapless::Deque;
use log::{debug, warn};

use crate::error::TransportError;
use crate::protocol::framing::{HEADER_SIZE, StreamFramer, encode_frame};
use crate::protocol::packet::MAX_PAYLOAD;
use crate::protocol::{PacketTransport, RawFrame};

/// Bytes pulled from the channel per poll, at most.
const READ_CHUNK: usize = 64;

/// Smallest frame on the wire: header plus one payload byte.
const MIN_FRAME: usize = HEADER_SIZE + 1;

/// Frames decoded but not yet handed to the link.  Enough for a full read
/// of minimum-size frames.
const PENDING_FRAMES: usize = READ_CHUNK / MIN_FRAME;

/// A non-blocking duplex byte channel.
pub trait ByteChannel {
    /// Read whatever is available into `buf`; `Ok(0)` when nothing is.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write all of `data`.
    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError>;

    fn is_ready(&self) -> bool {
        true
    }
}

/// [`PacketTransport`] over a raw byte channel.
pub struct SerialPacketTransport<C: ByteChannel> {
    channel: C,
    framer: StreamFramer,
    pending: Deque<RawFrame, PENDING_FRAMES>,
}

impl<C: ByteChannel> SerialPacketTransport<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            framer: StreamFramer::new(),
            pending: Deque::new(),
        }
    }

    /// Bytes the framer discarded while resynchronising.
    pub fn dropped_bytes(&self) -> u32 {
        self.framer.dropped()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Read no more than the free frame slots can absorb.  Bytes left in
    /// the channel wait for the next poll rather than being framed and lost.
    fn fill(&mut self) {
        let free = PENDING_FRAMES - self.pending.len();
        let budget = (free * MIN_FRAME).min(READ_CHUNK);
        if budget == 0 {
            return;
        }
        let mut buf = [0u8; READ_CHUNK];
        let n = match self.channel.read(&mut buf[..budget]) {
            Ok(n) => n,
            Err(e) => {
                debug!("SERIAL read failed: {}", e);
                return;
            }
        };
        let pending = &mut self.pending;
        self.framer.feed(&buf[..n], |frame| {
            if let Err(lost) = pending.push_back(frame) {
                warn!("SERIAL rx backlog full, dropping kind {}", lost.kind);
            }
        });
    }
}

impl<C: ByteChannel> PacketTransport for SerialPacketTransport<C> {
    type Error = TransportError;

    fn is_ready(&self) -> bool {
        self.channel.is_ready()
    }

    fn poll(&mut self) -> Option<RawFrame> {
        if self.pending.is_empty() {
            self.fill();
        }
        self.pending.pop_front()
    }

    fn send(&mut self, kind: u8, payload: &[u8]) -> Result<(), TransportError> {
        let mut out = [0u8; HEADER_SIZE + MAX_PAYLOAD];
        let len = encode_frame(kind, payload, &mut out).ok_or(TransportError::Oversize)?;
        self.channel.write_all(&out[..len])
    }
}

// ── ESP-IDF UART ─────────────────────────────────────────────

#[cfg(feature = "espidf")]
impl ByteChannel for esp_idf_hal::uart::UartDriver<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        esp_idf_hal::uart::UartDriver::read(self, buf, esp_idf_hal::delay::NON_BLOCK)
            .map_err(|_| TransportError::ReadFailed)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut rest = data;
        while !rest.is_empty() {
            let n = esp_idf_hal::uart::UartDriver::write(self, rest)
                .map_err(|_| TransportError::WriteFailed)?;
            if n == 0 {
                return Err(TransportError::WriteFailed);
            }
            rest = &rest[n..];
        }
        Ok(())
    }
}
