//! Byte-stream framer for running the link over a raw UART.
//!
//! Wire format:
//! ```text
//! ┌──────┬──────────┬─────────┬───────────────────────┐
//! │ 0x7E │ Kind (1B)│ Len (1B)│ Packet payload (N B)  │
//! └──────┴──────────┴─────────┴───────────────────────┘
//! ```
//!
//! The decoder accumulates bytes and yields complete frames.  It handles
//! partial reads and concatenated frames, and resynchronises on the next
//! marker byte after garbage or an invalid length.

use super::packet::MAX_PAYLOAD;
use super::transport::RawFrame;

/// Start-of-frame marker.
pub const FRAME_MARKER: u8 = 0x7E;

/// Marker + kind + length.
pub const HEADER_SIZE: usize = 3;

/// Decoder state machine.
enum DecoderState {
    /// Discarding bytes until a marker is seen.
    Hunting,
    /// Marker seen, waiting for the kind tag.
    ReadingKind,
    /// Waiting for the payload length.
    ReadingLen { kind: u8 },
    /// Header received, reading payload.
    ReadingPayload {
        kind: u8,
        expected: usize,
        collected: usize,
    },
}

/// Streaming frame decoder.
pub struct StreamFramer {
    state: DecoderState,
    payload_buf: [u8; MAX_PAYLOAD],
    dropped: u32,
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamFramer {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Hunting,
            payload_buf: [0; MAX_PAYLOAD],
            dropped: 0,
        }
    }

    /// Feed one byte.  Returns a frame when this byte completes one.
    pub fn push(&mut self, byte: u8) -> Option<RawFrame> {
        match &mut self.state {
            DecoderState::Hunting => {
                if byte == FRAME_MARKER {
                    self.state = DecoderState::ReadingKind;
                } else {
                    self.dropped = self.dropped.saturating_add(1);
                }
                None
            }
            DecoderState::ReadingKind => {
                self.state = DecoderState::ReadingLen { kind: byte };
                None
            }
            DecoderState::ReadingLen { kind } => {
                let expected = byte as usize;
                if expected == 0 || expected > MAX_PAYLOAD {
                    // Invalid frame; hunt for the next marker.
                    self.dropped = self.dropped.saturating_add(1);
                    self.state = DecoderState::Hunting;
                    return None;
                }
                self.state = DecoderState::ReadingPayload {
                    kind: *kind,
                    expected,
                    collected: 0,
                };
                None
            }
            DecoderState::ReadingPayload {
                kind,
                expected,
                collected,
            } => {
                self.payload_buf[*collected] = byte;
                *collected += 1;
                if *collected < *expected {
                    return None;
                }
                let (kind, len) = (*kind, *expected);
                self.state = DecoderState::Hunting;
                RawFrame::new(kind, &self.payload_buf[..len])
            }
        }
    }

    /// Feed a chunk of bytes, handing every completed frame to `on_frame`.
    pub fn feed(&mut self, data: &[u8], mut on_frame: impl FnMut(RawFrame)) {
        for &b in data {
            if let Some(frame) = self.push(b) {
                on_frame(frame);
            }
        }
    }

    /// Bytes discarded while hunting for a marker, plus rejected headers.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Reset decoder state (e.g. after a UART reconfiguration).
    pub fn reset(&mut self) {
        self.state = DecoderState::Hunting;
    }
}

/// Encode one tagged payload into a stream frame.
///
/// Writes `[0x7E][kind][len][payload]` into `out_buf`.
/// Returns the total number of bytes written.
pub fn encode_frame(kind: u8, payload: &[u8], out_buf: &mut [u8]) -> Option<usize> {
    let total = HEADER_SIZE + payload.len();
    if payload.is_empty() || payload.len() > MAX_PAYLOAD || total > out_buf.len() {
        return None;
    }
    out_buf[0] = FRAME_MARKER;
    out_buf[1] = kind;
    out_buf[2] = payload.len() as u8;
    out_buf[HEADER_SIZE..total].copy_from_slice(payload);
    Some(total)
}
