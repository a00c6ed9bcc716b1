//! Packet shapes carried over a link.
//!
//! ```text
//!   Command   [start][opcode][value lo][value hi][end]          5 B
//!   Message   [start][opcode][d0][d1][d2][end]                  6 B
//!   Snapshot  [start][21 x u8 codes][3 x u16 LE][end]          29 B
//!   Prefs     [payload]                                 35 / 20 / 21 B
//! ```
//!
//! Every live-state frame is bracketed by a sentinel pair.  The pair differs
//! by direction: the hub stamps [`FROM_HUB`], the accessory stamps
//! [`FROM_ACCESSORY`], and each side only accepts the other's pair.

use heapless::Vec;

use crate::error::CodecError;

/// Largest payload any packet kind produces.
pub const MAX_PAYLOAD: usize = 64;

// ---------------------------------------------------------------------------
// Packet kind tags
// ---------------------------------------------------------------------------

/// Type tag handed to the transport alongside each payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    Unknown = 0,
    Command = 1,
    Message = 2,
    PreferenceHub = 3,
    PreferenceAccessory = 4,
    PreferenceShared = 5,
    Snapshot = 6,
}

impl PacketKind {
    pub fn from_u8(tag: u8) -> Self {
        match tag {
            1 => Self::Command,
            2 => Self::Message,
            3 => Self::PreferenceHub,
            4 => Self::PreferenceAccessory,
            5 => Self::PreferenceShared,
            6 => Self::Snapshot,
            _ => Self::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// Direction sentinels
// ---------------------------------------------------------------------------

/// Start/end marker pair bracketing a live-state frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinels {
    pub start: u8,
    pub end: u8,
}

/// Stamped on frames the accessory originates.
pub const FROM_ACCESSORY: Sentinels = Sentinels {
    start: 0x01,
    end: 0x58,
};

/// Stamped on frames the hub originates.
pub const FROM_HUB: Sentinels = Sentinels {
    start: 0x01,
    end: 0xA3,
};

/// Which end of the wire this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Role {
    Hub,
    Accessory,
}

impl Role {
    /// Pair stamped on frames this role sends.
    pub const fn outbound(self) -> Sentinels {
        match self {
            Self::Hub => FROM_HUB,
            Self::Accessory => FROM_ACCESSORY,
        }
    }

    /// Pair this role expects on frames it receives.
    pub const fn inbound(self) -> Sentinels {
        match self {
            Self::Hub => FROM_ACCESSORY,
            Self::Accessory => FROM_HUB,
        }
    }
}

// ---------------------------------------------------------------------------
// Packet bodies
// ---------------------------------------------------------------------------

/// Single-value imperative event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPacket {
    pub opcode: u8,
    pub value: u16,
}

/// Short structured event (three volume levels, colour + saturation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagePacket {
    pub opcode: u8,
    pub data: [u8; 3],
}

/// Full-state transfer, exactly as it sits on the wire.
///
/// Fields hold raw table codes; [`crate::state::snapshot`] resolves them
/// into typed state, substituting defaults for out-of-range codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotFrame {
    pub system_mode: u8,
    pub ion_arm_switch: u8,
    pub cyclotron_lid: u8,
    pub system_year: u8,
    pub pack_on: u8,
    pub power_level: u8,
    pub stream_mode: u8,
    pub wand_present: u8,
    pub barrel_extended: u8,
    pub wand_firing: u8,
    pub overheating: u8,
    pub speed_multiplier: u8,
    pub spectral_colour: u8,
    pub spectral_saturation: u8,
    pub master_muted: u8,
    pub master_volume: u8,
    pub effects_volume: u8,
    pub music_volume: u8,
    pub music_playing: u8,
    pub music_paused: u8,
    pub track_looped: u8,
    pub current_track: u16,
    pub music_count: u16,
    pub pack_voltage: u16,
}

impl SnapshotFrame {
    /// Encoded body size, excluding sentinels.
    pub const BODY_LEN: usize = 27;
    /// Encoded size including sentinels.
    pub const WIRE_LEN: usize = Self::BODY_LEN + 2;
}

// ---------------------------------------------------------------------------
// Preference blocks
// ---------------------------------------------------------------------------

/// The three bulk configuration block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PreferenceKind {
    /// Hub device options.
    Hub,
    /// Accessory (wand) device options.
    Accessory,
    /// Shared subsystem options (smoke/overheat).
    Shared,
}

impl PreferenceKind {
    pub const ALL: [PreferenceKind; 3] = [Self::Hub, Self::Accessory, Self::Shared];

    /// Fixed payload size of this block kind.
    pub const fn len(self) -> usize {
        match self {
            Self::Hub => 35,
            Self::Accessory => 20,
            Self::Shared => 21,
        }
    }

    pub const fn packet_kind(self) -> PacketKind {
        match self {
            Self::Hub => PacketKind::PreferenceHub,
            Self::Accessory => PacketKind::PreferenceAccessory,
            Self::Shared => PacketKind::PreferenceShared,
        }
    }

    pub const fn from_packet_kind(kind: PacketKind) -> Option<Self> {
        match kind {
            PacketKind::PreferenceHub => Some(Self::Hub),
            PacketKind::PreferenceAccessory => Some(Self::Accessory),
            PacketKind::PreferenceShared => Some(Self::Shared),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Hub => 0,
            Self::Accessory => 1,
            Self::Shared => 2,
        }
    }
}

/// Opaque configuration payload of one [`PreferenceKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceBlock {
    kind: PreferenceKind,
    payload: Vec<u8, MAX_PAYLOAD>,
}

impl PreferenceBlock {
    /// Wrap `bytes` as a block of `kind`; the length must match exactly.
    pub fn new(kind: PreferenceKind, bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != kind.len() {
            return Err(CodecError::BadLength {
                expected: kind.len(),
                actual: bytes.len(),
            });
        }
        let payload = Vec::from_slice(bytes).map_err(|()| CodecError::BufferTooSmall)?;
        Ok(Self { kind, payload })
    }

    pub fn kind(&self) -> PreferenceKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// A decoded packet of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Command(CommandPacket),
    Message(MessagePacket),
    Snapshot(SnapshotFrame),
    Preferences(PreferenceBlock),
}

impl Packet {
    /// Shorthand for a command packet.
    pub fn command(opcode: crate::protocol::Opcode, value: u16) -> Self {
        Self::Command(CommandPacket {
            opcode: opcode.as_u8(),
            value,
        })
    }

    /// Shorthand for a message packet.
    pub fn message(opcode: crate::protocol::Opcode, data: [u8; 3]) -> Self {
        Self::Message(MessagePacket {
            opcode: opcode.as_u8(),
            data,
        })
    }

    pub fn kind(&self) -> PacketKind {
        match self {
            Self::Command(_) => PacketKind::Command,
            Self::Message(_) => PacketKind::Message,
            Self::Snapshot(_) => PacketKind::Snapshot,
            Self::Preferences(b) => b.kind().packet_kind(),
        }
    }

    /// Opcode of a command packet, if it is one the vocabulary defines.
    pub fn command_opcode(&self) -> Option<crate::protocol::Opcode> {
        match self {
            Self::Command(c) => crate::protocol::Opcode::from_u8(c.opcode),
            _ => None,
        }
    }
}
