//! Wire Messages
//!
//! Fixed-layout, little-endian framing for the three lockstep messages.
//! Every frame is 4-byte aligned and starts with a 32-bit opcode. The
//! layout is the contract with the transport layer; the core performs no
//! retransmission or ordering itself — it assumes the reliable-UDP session
//! described by [`TransportConfig`] underneath.
//!
//! | opcode | message        | layout                                   | size |
//! |--------|----------------|------------------------------------------|------|
//! | 0      | `MatchRequest` | op:u32, player_id:i32                    | 8    |
//! | 1      | `MatchAssign`  | op:u32, player_index:i32, x:f32, z:f32   | 16   |
//! | 2      | `MoveOp`       | op:u32, tick:i32, index:i32, x:f32, z:f32| 20   |

use thiserror::Error;

/// Errors surfaced by [`unpack`]. Both variants are fatal parse failures;
/// a frame that fails to parse cannot be partially consumed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The first four bytes named an opcode this protocol does not define.
    #[error("unknown wire opcode {0}")]
    UnknownOpcode(u32),
    /// The buffer is shorter than the fixed size of its message type.
    #[error("truncated frame: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

// ============================================================================
// Messages
// ============================================================================

/// Client → server: request matchmaking for a player. Opcode 0, 8 bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchRequest {
    pub player_id: i32,
}

/// Server → client: match found; which side the player is and where to
/// spawn. Opcode 1, 16 bytes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchAssign {
    /// 0 or 1 in a two-peer match.
    pub player_index: i32,
    pub spawn_x: f32,
    pub spawn_z: f32,
}

/// Both directions: one player's movement input for one tick. Opcode 2,
/// 20 bytes. `raw_x`/`raw_z` carry the raw joystick axes in [−1, 1]; the
/// simulation converts them to fixed point on arrival.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveOp {
    pub tick: i32,
    pub player_index: i32,
    pub raw_x: f32,
    pub raw_z: f32,
}

/// Any wire message.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Message {
    MatchRequest(MatchRequest),
    MatchAssign(MatchAssign),
    MoveOp(MoveOp),
}

const OP_MATCH_REQUEST: u32 = 0;
const OP_MATCH_ASSIGN: u32 = 1;
const OP_MOVE: u32 = 2;

impl MatchRequest {
    /// Frame size in bytes.
    pub const SIZE: usize = 8;

    /// Serialize to the fixed wire layout.
    pub fn pack(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&OP_MATCH_REQUEST.to_le_bytes());
        buf[4..8].copy_from_slice(&self.player_id.to_le_bytes());
        buf
    }
}

impl MatchAssign {
    /// Frame size in bytes.
    pub const SIZE: usize = 16;

    /// Serialize to the fixed wire layout.
    pub fn pack(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&OP_MATCH_ASSIGN.to_le_bytes());
        buf[4..8].copy_from_slice(&self.player_index.to_le_bytes());
        buf[8..12].copy_from_slice(&self.spawn_x.to_le_bytes());
        buf[12..16].copy_from_slice(&self.spawn_z.to_le_bytes());
        buf
    }
}

impl MoveOp {
    /// Frame size in bytes.
    pub const SIZE: usize = 20;

    /// Serialize to the fixed wire layout.
    pub fn pack(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&OP_MOVE.to_le_bytes());
        buf[4..8].copy_from_slice(&self.tick.to_le_bytes());
        buf[8..12].copy_from_slice(&self.player_index.to_le_bytes());
        buf[12..16].copy_from_slice(&self.raw_x.to_le_bytes());
        buf[16..20].copy_from_slice(&self.raw_z.to_le_bytes());
        buf
    }
}

impl Message {
    /// Serialize any message to its wire frame.
    pub fn pack(&self) -> Vec<u8> {
        match self {
            Message::MatchRequest(m) => m.pack().to_vec(),
            Message::MatchAssign(m) => m.pack().to_vec(),
            Message::MoveOp(m) => m.pack().to_vec(),
        }
    }
}

/// Parse a wire frame.
///
/// Fails fatally on an unknown opcode or a frame shorter than its message
/// type requires. Trailing bytes beyond the fixed size are ignored.
pub fn unpack(data: &[u8]) -> Result<Message, ProtocolError> {
    let opcode = read_u32(data, 0)?;
    match opcode {
        OP_MATCH_REQUEST => {
            require(data, MatchRequest::SIZE)?;
            Ok(Message::MatchRequest(MatchRequest {
                player_id: read_i32(data, 4)?,
            }))
        }
        OP_MATCH_ASSIGN => {
            require(data, MatchAssign::SIZE)?;
            Ok(Message::MatchAssign(MatchAssign {
                player_index: read_i32(data, 4)?,
                spawn_x: read_f32(data, 8)?,
                spawn_z: read_f32(data, 12)?,
            }))
        }
        OP_MOVE => {
            require(data, MoveOp::SIZE)?;
            Ok(Message::MoveOp(MoveOp {
                tick: read_i32(data, 4)?,
                player_index: read_i32(data, 8)?,
                raw_x: read_f32(data, 12)?,
                raw_z: read_f32(data, 16)?,
            }))
        }
        other => Err(ProtocolError::UnknownOpcode(other)),
    }
}

fn require(data: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if data.len() < expected {
        Err(ProtocolError::Truncated {
            expected,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

fn read_bytes4(data: &[u8], offset: usize) -> Result<[u8; 4], ProtocolError> {
    if data.len() < offset + 4 {
        return Err(ProtocolError::Truncated {
            expected: offset + 4,
            actual: data.len(),
        });
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    Ok(bytes)
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, ProtocolError> {
    Ok(u32::from_le_bytes(read_bytes4(data, offset)?))
}

fn read_i32(data: &[u8], offset: usize) -> Result<i32, ProtocolError> {
    Ok(i32::from_le_bytes(read_bytes4(data, offset)?))
}

fn read_f32(data: &[u8], offset: usize) -> Result<f32, ProtocolError> {
    Ok(f32::from_le_bytes(read_bytes4(data, offset)?))
}

// ============================================================================
// Transport assumptions
// ============================================================================

/// Tuning of the reliable-UDP session assumed beneath this protocol.
///
/// The core treats the transport as an opaque ordered-delivery channel and
/// never retransmits; these are the parameters the session is expected to
/// run with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    /// Send/receive window, in outstanding packets.
    pub window_size: u32,
    /// Internal update granularity in milliseconds.
    pub update_interval_ms: u32,
    /// Fast mode: disable Nagle-style send delay.
    pub no_delay: bool,
    /// Fast retransmit after this many skipped ACKs.
    pub fast_resend: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            window_size: 128,
            update_interval_ms: 10,
            no_delay: true,
            fast_resend: 2,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_request_round_trip() {
        let msg = MatchRequest { player_id: 77 };
        let bytes = msg.pack();
        assert_eq!(bytes.len(), 8);
        assert_eq!(unpack(&bytes), Ok(Message::MatchRequest(msg)));
    }

    #[test]
    fn test_match_assign_round_trip() {
        let msg = MatchAssign {
            player_index: 1,
            spawn_x: 2.0,
            spawn_z: -2.0,
        };
        let bytes = msg.pack();
        assert_eq!(bytes.len(), 16);
        assert_eq!(unpack(&bytes), Ok(Message::MatchAssign(msg)));
    }

    #[test]
    fn test_move_op_round_trip() {
        let msg = MoveOp {
            tick: 1234,
            player_index: 0,
            raw_x: 0.5,
            raw_z: -0.25,
        };
        let bytes = msg.pack();
        assert_eq!(bytes.len(), 20);
        assert_eq!(unpack(&bytes), Ok(Message::MoveOp(msg)));
    }

    #[test]
    fn test_exact_wire_layout() {
        let msg = MoveOp {
            tick: 1,
            player_index: 2,
            raw_x: 1.0,
            raw_z: 0.0,
        };
        let bytes = msg.pack();

        assert_eq!(&bytes[0..4], &2u32.to_le_bytes()); // opcode
        assert_eq!(&bytes[4..8], &1i32.to_le_bytes()); // tick
        assert_eq!(&bytes[8..12], &2i32.to_le_bytes()); // player index
        assert_eq!(&bytes[12..16], &1.0f32.to_le_bytes()); // raw x
        assert_eq!(&bytes[16..20], &0.0f32.to_le_bytes()); // raw z
    }

    #[test]
    fn test_unknown_opcode_is_fatal() {
        let mut bytes = [0u8; 8];
        bytes[0..4].copy_from_slice(&99u32.to_le_bytes());
        assert_eq!(unpack(&bytes), Err(ProtocolError::UnknownOpcode(99)));
    }

    #[test]
    fn test_truncated_frames() {
        assert_eq!(
            unpack(&[0u8; 2]),
            Err(ProtocolError::Truncated {
                expected: 4,
                actual: 2
            })
        );

        // Valid opcode, missing payload.
        let mut bytes = [0u8; 6];
        bytes[0..4].copy_from_slice(&2u32.to_le_bytes());
        assert_eq!(
            unpack(&bytes),
            Err(ProtocolError::Truncated {
                expected: 20,
                actual: 6
            })
        );
    }

    #[test]
    fn test_message_pack_dispatch() {
        let msg = Message::MatchRequest(MatchRequest { player_id: 5 });
        assert_eq!(msg.pack().len(), MatchRequest::SIZE);
    }

    #[test]
    fn test_transport_defaults() {
        let cfg = TransportConfig::default();
        assert_eq!(cfg.window_size, 128);
        assert_eq!(cfg.update_interval_ms, 10);
        assert!(cfg.no_delay);
        assert_eq!(cfg.fast_resend, 2);
    }
}
