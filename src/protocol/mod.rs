//! Wire protocol: opcodes, packet shapes, the packet codec, the transport
//! boundary and a stream framer for raw UARTs.

pub mod codec;
pub mod framing;
pub mod opcodes;
pub mod packet;
pub mod transport;

pub use codec::Codec;
pub use opcodes::Opcode;
pub use packet::{
    CommandPacket, MessagePacket, Packet, PacketKind, PreferenceBlock, PreferenceKind, Role,
    Sentinels, SnapshotFrame,
};
pub use transport::{PacketTransport, RawFrame};
