//! Packet codec: fixed-layout packets to and from tagged byte frames.
//!
//! The sentinel check is the only integrity check on command, message and
//! snapshot frames; preference blocks carry no sentinels and are checked for
//! length only.  Decoding is pure.

use heapless::Vec;

use super::packet::{
    CommandPacket, MAX_PAYLOAD, MessagePacket, Packet, PacketKind, PreferenceBlock,
    PreferenceKind, Role, Sentinels, SnapshotFrame,
};
use super::transport::RawFrame;
use crate::error::CodecError;

const COMMAND_LEN: usize = 5;
const MESSAGE_LEN: usize = 6;

/// Direction-aware codec for one end of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    inbound: Sentinels,
    outbound: Sentinels,
}

impl Codec {
    pub const fn new(role: Role) -> Self {
        Self {
            inbound: role.inbound(),
            outbound: role.outbound(),
        }
    }

    /// Sentinel pair this codec stamps on outgoing frames.
    pub const fn outbound(&self) -> Sentinels {
        self.outbound
    }

    /// Decode one inbound frame.
    pub fn decode(&self, kind: u8, raw: &[u8]) -> Result<Packet, CodecError> {
        decode(self.inbound, kind, raw)
    }

    /// Decode a frame taken from a transport.
    pub fn decode_frame(&self, frame: &RawFrame) -> Result<Packet, CodecError> {
        self.decode(frame.kind, &frame.payload)
    }

    /// Encode a packet into a frame stamped with this side's sentinels.
    pub fn encode(&self, packet: &Packet) -> Result<RawFrame, CodecError> {
        encode(self.outbound, packet)
    }
}

/// Decode `raw` as a packet of kind tag `kind`, validating against `expected`.
pub fn decode(expected: Sentinels, kind: u8, raw: &[u8]) -> Result<Packet, CodecError> {
    match PacketKind::from_u8(kind) {
        PacketKind::Command => {
            let body = framed(expected, raw, COMMAND_LEN)?;
            let opcode = body[0];
            if opcode == 0 {
                return Err(CodecError::NullOpcode);
            }
            Ok(Packet::Command(CommandPacket {
                opcode,
                value: u16::from_le_bytes([body[1], body[2]]),
            }))
        }
        PacketKind::Message => {
            let body = framed(expected, raw, MESSAGE_LEN)?;
            let opcode = body[0];
            if opcode == 0 {
                return Err(CodecError::NullOpcode);
            }
            Ok(Packet::Message(MessagePacket {
                opcode,
                data: [body[1], body[2], body[3]],
            }))
        }
        PacketKind::Snapshot => {
            let body = framed(expected, raw, SnapshotFrame::WIRE_LEN)?;
            Ok(Packet::Snapshot(read_snapshot(body)))
        }
        tag @ (PacketKind::PreferenceHub
        | PacketKind::PreferenceAccessory
        | PacketKind::PreferenceShared) => {
            let Some(pref) = PreferenceKind::from_packet_kind(tag) else {
                return Err(CodecError::UnknownKind(kind));
            };
            Ok(Packet::Preferences(PreferenceBlock::new(pref, raw)?))
        }
        PacketKind::Unknown => Err(CodecError::UnknownKind(kind)),
    }
}

/// Encode `packet`, bracketing live-state frames with `stamp`.
pub fn encode(stamp: Sentinels, packet: &Packet) -> Result<RawFrame, CodecError> {
    let mut out: Vec<u8, MAX_PAYLOAD> = Vec::new();
    match packet {
        Packet::Command(c) => {
            let v = c.value.to_le_bytes();
            put(&mut out, &[stamp.start, c.opcode, v[0], v[1], stamp.end])?;
        }
        Packet::Message(m) => {
            put(
                &mut out,
                &[stamp.start, m.opcode, m.data[0], m.data[1], m.data[2], stamp.end],
            )?;
        }
        Packet::Snapshot(s) => {
            put(&mut out, &[stamp.start])?;
            write_snapshot(&mut out, s)?;
            put(&mut out, &[stamp.end])?;
        }
        Packet::Preferences(b) => put(&mut out, b.as_bytes())?,
    }
    Ok(RawFrame {
        kind: packet.kind() as u8,
        payload: out,
    })
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

/// Check length and sentinels; return the body between them.
fn framed(expected: Sentinels, raw: &[u8], len: usize) -> Result<&[u8], CodecError> {
    if raw.len() != len {
        return Err(CodecError::BadLength {
            expected: len,
            actual: raw.len(),
        });
    }
    let (start, end) = (raw[0], raw[len - 1]);
    if start != expected.start || end != expected.end {
        return Err(CodecError::BadSentinel { start, end });
    }
    Ok(&raw[1..len - 1])
}

fn put(out: &mut Vec<u8, MAX_PAYLOAD>, bytes: &[u8]) -> Result<(), CodecError> {
    out.extend_from_slice(bytes)
        .map_err(|()| CodecError::BufferTooSmall)
}

fn read_snapshot(b: &[u8]) -> SnapshotFrame {
    let word = |i: usize| u16::from_le_bytes([b[i], b[i + 1]]);
    SnapshotFrame {
        system_mode: b[0],
        ion_arm_switch: b[1],
        cyclotron_lid: b[2],
        system_year: b[3],
        pack_on: b[4],
        power_level: b[5],
        stream_mode: b[6],
        wand_present: b[7],
        barrel_extended: b[8],
        wand_firing: b[9],
        overheating: b[10],
        speed_multiplier: b[11],
        spectral_colour: b[12],
        spectral_saturation: b[13],
        master_muted: b[14],
        master_volume: b[15],
        effects_volume: b[16],
        music_volume: b[17],
        music_playing: b[18],
        music_paused: b[19],
        track_looped: b[20],
        current_track: word(21),
        music_count: word(23),
        pack_voltage: word(25),
    }
}

fn write_snapshot(out: &mut Vec<u8, MAX_PAYLOAD>, s: &SnapshotFrame) -> Result<(), CodecError> {
    put(
        out,
        &[
            s.system_mode,
            s.ion_arm_switch,
            s.cyclotron_lid,
            s.system_year,
            s.pack_on,
            s.power_level,
            s.stream_mode,
            s.wand_present,
            s.barrel_extended,
            s.wand_firing,
            s.overheating,
            s.speed_multiplier,
            s.spectral_colour,
            s.spectral_saturation,
            s.master_muted,
            s.master_volume,
            s.effects_volume,
            s.music_volume,
            s.music_playing,
            s.music_paused,
            s.track_looped,
        ],
    )?;
    put(out, &s.current_track.to_le_bytes())?;
    put(out, &s.music_count.to_le_bytes())?;
    put(out, &s.pack_voltage.to_le_bytes())
}
