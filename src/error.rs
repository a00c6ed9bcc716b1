//! Unified error types for the packlink firmware.
//!
//! Every fallible path in the protocol core funnels into [`Error`].  All
//! variants are `Copy` so they can be handed through the link state machine
//! and event sinks without allocation.
//!
//! None of these conditions is fatal: a bad frame is dropped, a full outbox
//! drops the packet, and a link timeout only resets the connection state.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A frame could not be decoded.
    Codec(CodecError),
    /// The link refused an operation in its current state.
    Link(LinkError),
    /// The underlying byte/packet transport failed.
    Transport(TransportError),
    /// Preference persistence failed.
    Storage(StorageError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Start or end marker did not match the peer's sentinel pair.
    BadSentinel { start: u8, end: u8 },
    /// Payload size does not match the fixed layout for its kind.
    BadLength { expected: usize, actual: usize },
    /// The packet kind tag is not one the protocol defines.
    UnknownKind(u8),
    /// Command or message carried opcode 0.
    NullOpcode,
    /// The output buffer cannot hold the encoded packet.
    BufferTooSmall,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadSentinel { start, end } => {
                write!(f, "bad sentinel (start=0x{start:02X}, end=0x{end:02X})")
            }
            Self::BadLength { expected, actual } => {
                write!(f, "bad length (expected {expected}, got {actual})")
            }
            Self::UnknownKind(tag) => write!(f, "unknown packet kind {tag}"),
            Self::NullOpcode => write!(f, "null opcode"),
            Self::BufferTooSmall => write!(f, "output buffer too small"),
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The peer is not synchronised; outbound traffic other than sync
    /// control is refused.
    NotConnected,
    /// The outbound queue is full and the packet was dropped.
    OutboxFull,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "peer not connected"),
            Self::OutboxFull => write!(f, "outbox full"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The transport reported it is not ready to carry traffic.
    Unavailable,
    /// A write did not complete.
    WriteFailed,
    /// A read did not complete.
    ReadFailed,
    /// The payload exceeds what the transport can frame.
    Oversize,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "transport unavailable"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::Oversize => write!(f, "payload too large"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// No block has been stored under this kind.
    NotFound,
    /// The stored block failed its integrity check.
    Corrupted,
    /// Serialisation or the backing medium failed.
    IoError,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Corrupted => write!(f, "corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}
