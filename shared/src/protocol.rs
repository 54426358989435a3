//! Fixed-layout binary codec for the four message kinds.
//!
//! Every datagram is a [`PacketHeader`] (8-byte magic, 1-byte kind tag)
//! immediately followed by the payload fields in declaration order. Integers
//! are little-endian and fixed width; there is no padding, no length prefix
//! and no variable-length field, so each kind has a constant encoded size.

use crate::{GameState, InvalidDiscriminant, PaddleMovement, ViewSettings, WindowSettings};
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Protocol identifier carried at the start of every datagram.
pub const MAGIC_KEY: i64 = 583_276_045_987;

pub const HEADER_SIZE: usize = 8 + 1;
pub const WINDOW_SETTINGS_SIZE: usize = 4 + 4 + 1;
pub const VIEW_SETTINGS_SIZE: usize = 4 + 4 + 4 + 1;
pub const GAME_STATE_SIZE: usize = 1 + 2 + 4 * 4 + 4 * 2 + 4 * 3 + 4 * 3 + 8 + 4 * 4 + 1;
pub const PADDLE_MOVEMENT_SIZE: usize = 4 + 1;

/// Largest datagram either role will ever send.
pub const MAX_PACKET_SIZE: usize = HEADER_SIZE
    + max(
        max(WINDOW_SETTINGS_SIZE, VIEW_SETTINGS_SIZE),
        max(GAME_STATE_SIZE, PADDLE_MOVEMENT_SIZE),
    );

/// Receive buffers hold one extra byte so oversized datagrams are detected
/// rather than silently truncated.
pub const RECV_BUFFER_SIZE: usize = MAX_PACKET_SIZE + 1;

const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid magic key {0}")]
    InvalidMagicKey(i64),
    #[error("unknown packet type {0}")]
    UnknownPacketType(i8),
    #[error("malformed {kind} payload: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: bincode::Error,
    },
    #[error("failed to encode packet: {0}")]
    Encode(#[source] bincode::Error),
    #[error("datagram of {0} bytes exceeds the maximum packet size")]
    Oversized(usize),
    #[error("{kind:?} encodes to {actual} bytes, expected {expected}")]
    CapacityMismatch {
        kind: PacketKind,
        expected: usize,
        actual: usize,
    },
}

/// Type tag written after the magic key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum PacketKind {
    WindowSettings,
    ViewSettings,
    GameState,
    PaddleMovement,
}

impl PacketKind {
    /// Encoded payload size, excluding the header.
    pub fn payload_size(self) -> usize {
        match self {
            PacketKind::WindowSettings => WINDOW_SETTINGS_SIZE,
            PacketKind::ViewSettings => VIEW_SETTINGS_SIZE,
            PacketKind::GameState => GAME_STATE_SIZE,
            PacketKind::PaddleMovement => PADDLE_MOVEMENT_SIZE,
        }
    }

    fn name(self) -> &'static str {
        match self {
            PacketKind::WindowSettings => "window settings",
            PacketKind::ViewSettings => "view settings",
            PacketKind::GameState => "game state",
            PacketKind::PaddleMovement => "paddle movement",
        }
    }
}

impl From<PacketKind> for i8 {
    fn from(kind: PacketKind) -> i8 {
        match kind {
            PacketKind::WindowSettings => 0,
            PacketKind::ViewSettings => 1,
            PacketKind::GameState => 2,
            PacketKind::PaddleMovement => 3,
        }
    }
}

impl TryFrom<i8> for PacketKind {
    type Error = InvalidDiscriminant;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PacketKind::WindowSettings),
            1 => Ok(PacketKind::ViewSettings),
            2 => Ok(PacketKind::GameState),
            3 => Ok(PacketKind::PaddleMovement),
            value => Err(InvalidDiscriminant {
                what: "packet kind",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketHeader {
    pub magic: i64,
    pub kind: PacketKind,
}

impl PacketHeader {
    pub fn new(kind: PacketKind) -> Self {
        Self {
            magic: MAGIC_KEY,
            kind,
        }
    }
}

/// Every message that travels between server and clients.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    WindowSettings(WindowSettings),
    ViewSettings(ViewSettings),
    GameState(GameState),
    PaddleMovement(PaddleMovement),
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::WindowSettings(_) => PacketKind::WindowSettings,
            Packet::ViewSettings(_) => PacketKind::ViewSettings,
            Packet::GameState(_) => PacketKind::GameState,
            Packet::PaddleMovement(_) => PacketKind::PaddleMovement,
        }
    }
}

impl From<WindowSettings> for Packet {
    fn from(settings: WindowSettings) -> Self {
        Packet::WindowSettings(settings)
    }
}

impl From<ViewSettings> for Packet {
    fn from(settings: ViewSettings) -> Self {
        Packet::ViewSettings(settings)
    }
}

impl From<GameState> for Packet {
    fn from(state: GameState) -> Self {
        Packet::GameState(state)
    }
}

impl From<PaddleMovement> for Packet {
    fn from(movement: PaddleMovement) -> Self {
        Packet::PaddleMovement(movement)
    }
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .allow_trailing_bytes()
}

/// Serializes a packet as header followed by its payload.
pub fn encode(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let kind = packet.kind();
    let mut bytes = Vec::with_capacity(HEADER_SIZE + kind.payload_size());

    wire_options()
        .serialize_into(&mut bytes, &PacketHeader::new(kind))
        .map_err(ProtocolError::Encode)?;

    let payload = match packet {
        Packet::WindowSettings(settings) => wire_options().serialize_into(&mut bytes, settings),
        Packet::ViewSettings(settings) => wire_options().serialize_into(&mut bytes, settings),
        Packet::GameState(state) => wire_options().serialize_into(&mut bytes, state),
        Packet::PaddleMovement(movement) => wire_options().serialize_into(&mut bytes, movement),
    };
    payload.map_err(ProtocolError::Encode)?;

    Ok(bytes)
}

/// Parses one datagram.
///
/// The magic key is checked before anything else is read, so a foreign
/// datagram is always reported as [`ProtocolError::InvalidMagicKey`] no
/// matter what follows it.
pub fn decode(bytes: &[u8]) -> Result<(PacketHeader, Packet), ProtocolError> {
    let mut reader = bytes;

    let magic: i64 = read_field(&mut reader, "header")?;
    if magic != MAGIC_KEY {
        return Err(ProtocolError::InvalidMagicKey(magic));
    }

    if bytes.len() > MAX_PACKET_SIZE {
        return Err(ProtocolError::Oversized(bytes.len()));
    }

    let tag: i8 = read_field(&mut reader, "header")?;
    let kind = PacketKind::try_from(tag).map_err(|_| ProtocolError::UnknownPacketType(tag))?;

    let packet = match kind {
        PacketKind::WindowSettings => Packet::WindowSettings(read_field(&mut reader, kind.name())?),
        PacketKind::ViewSettings => Packet::ViewSettings(read_field(&mut reader, kind.name())?),
        PacketKind::GameState => Packet::GameState(read_field(&mut reader, kind.name())?),
        PacketKind::PaddleMovement => Packet::PaddleMovement(read_field(&mut reader, kind.name())?),
    };

    Ok((PacketHeader { magic, kind }, packet))
}

fn read_field<T: DeserializeOwned>(
    reader: &mut &[u8],
    kind: &'static str,
) -> Result<T, ProtocolError> {
    wire_options()
        .deserialize_from(reader)
        .map_err(|source| ProtocolError::Malformed { kind, source })
}

/// Checks that every packet kind encodes to exactly its declared size and
/// fits the receive buffer. Both roles run this once at startup.
pub fn verify_packet_capacity() -> Result<(), ProtocolError> {
    let samples = [
        Packet::WindowSettings(WindowSettings::default()),
        Packet::ViewSettings(ViewSettings::default()),
        Packet::GameState(GameState::default()),
        Packet::PaddleMovement(PaddleMovement::default()),
    ];

    for packet in &samples {
        let kind = packet.kind();
        let expected = HEADER_SIZE + kind.payload_size();
        let actual = encode(packet)?.len();

        if actual != expected || actual > MAX_PACKET_SIZE {
            return Err(ProtocolError::CapacityMismatch {
                kind,
                expected,
                actual,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ball, BallSpeed, GameMode, Paddle, PaddleSide, MAX_PADDLE_SIZE, MIN_PADDLE_SIZE};

    fn sample_state() -> GameState {
        GameState {
            mode: GameMode::RightLost,
            mode_timeout: -1,
            ball: Ball {
                x: 118,
                y: 0,
                width: 2,
                height: 1,
            },
            ball_speed: BallSpeed { dx: -1, dy: 1 },
            left_paddle: Paddle {
                x: 1,
                y: 9,
                size: MIN_PADDLE_SIZE,
            },
            right_paddle: Paddle {
                x: 118,
                y: 5,
                size: MAX_PADDLE_SIZE,
            },
            tick: 69.65,
            field_height: 18,
            field_width: 120,
            left_score: 3,
            right_score: 0,
            debug: true,
        }
    }

    fn roundtrip(packet: Packet) {
        let bytes = encode(&packet).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + packet.kind().payload_size());

        let (header, decoded) = decode(&bytes).unwrap();
        assert_eq!(header, PacketHeader::new(packet.kind()));
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_max_packet_size_is_game_state() {
        assert_eq!(GAME_STATE_SIZE, 76);
        assert_eq!(MAX_PACKET_SIZE, 85);
        assert!(verify_packet_capacity().is_ok());
    }

    #[test]
    fn test_roundtrip_every_kind() {
        roundtrip(Packet::WindowSettings(WindowSettings {
            width: 40,
            height: 24,
            is_last_client: true,
        }));
        roundtrip(Packet::ViewSettings(ViewSettings {
            x_offset: 80,
            height: 18,
            width: 120,
            controlled_paddle: PaddleSide::Right,
        }));
        roundtrip(Packet::GameState(sample_state()));
        roundtrip(Packet::GameState(GameState::default()));
        roundtrip(Packet::PaddleMovement(PaddleMovement {
            relative_y: -1,
            target_paddle: PaddleSide::Left,
        }));
        roundtrip(Packet::PaddleMovement(PaddleMovement {
            relative_y: 0,
            target_paddle: PaddleSide::None,
        }));
    }

    #[test]
    fn test_paddle_movement_byte_layout() {
        let bytes = encode(&Packet::PaddleMovement(PaddleMovement {
            relative_y: -1,
            target_paddle: PaddleSide::Right,
        }))
        .unwrap();

        let mut expected = MAGIC_KEY.to_le_bytes().to_vec();
        expected.push(3);
        expected.extend_from_slice(&(-1i32).to_le_bytes());
        expected.push(2);

        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_window_settings_byte_layout() {
        let bytes = encode(&Packet::WindowSettings(WindowSettings {
            width: 0x0102,
            height: 7,
            is_last_client: true,
        }))
        .unwrap();

        assert_eq!(bytes[8], 0);
        assert_eq!(&bytes[9..13], &[0x02, 0x01, 0, 0]);
        assert_eq!(&bytes[13..17], &[7, 0, 0, 0]);
        assert_eq!(bytes[17], 1);
    }

    #[test]
    fn test_game_state_tick_offset() {
        let bytes = encode(&Packet::GameState(sample_state())).unwrap();
        // header, mode, timeout, ball, speed, two paddles
        let tick_at = HEADER_SIZE + 1 + 2 + 16 + 8 + 12 + 12;
        let tick = f64::from_le_bytes(bytes[tick_at..tick_at + 8].try_into().unwrap());
        assert_eq!(tick, 69.65);
        assert_eq!(bytes[bytes.len() - 1], 1);
    }

    #[test]
    fn test_wrong_magic_is_rejected_regardless_of_payload() {
        let valid = encode(&Packet::PaddleMovement(PaddleMovement::default())).unwrap();

        let mut tampered = valid.clone();
        tampered[0] ^= 0xff;
        assert!(matches!(
            decode(&tampered),
            Err(ProtocolError::InvalidMagicKey(_))
        ));

        let mut garbage = 42i64.to_le_bytes().to_vec();
        garbage.extend_from_slice(&[0xff; 200]);
        assert!(matches!(
            decode(&garbage),
            Err(ProtocolError::InvalidMagicKey(42))
        ));

        let bare = 7i64.to_le_bytes();
        assert!(matches!(
            decode(&bare),
            Err(ProtocolError::InvalidMagicKey(7))
        ));
    }

    #[test]
    fn test_unknown_packet_type() {
        let mut bytes = MAGIC_KEY.to_le_bytes().to_vec();
        bytes.push(4);
        bytes.extend_from_slice(&[0; 16]);

        assert!(matches!(
            decode(&bytes),
            Err(ProtocolError::UnknownPacketType(4))
        ));
    }

    #[test]
    fn test_truncated_payload_is_malformed() {
        let bytes = encode(&Packet::GameState(sample_state())).unwrap();

        match decode(&bytes[..bytes.len() - 3]) {
            Err(ProtocolError::Malformed { kind, .. }) => assert_eq!(kind, "game state"),
            other => panic!("expected malformed error, got {:?}", other),
        }

        assert!(matches!(
            decode(&MAGIC_KEY.to_le_bytes()),
            Err(ProtocolError::Malformed { kind: "header", .. })
        ));
        assert!(matches!(
            decode(&[1, 2, 3]),
            Err(ProtocolError::Malformed { kind: "header", .. })
        ));
    }

    #[test]
    fn test_invalid_enum_byte_is_malformed() {
        let mut bytes = encode(&Packet::ViewSettings(ViewSettings::default())).unwrap();
        let last = bytes.len() - 1;
        bytes[last] = 9;

        assert!(matches!(
            decode(&bytes),
            Err(ProtocolError::Malformed {
                kind: "view settings",
                ..
            })
        ));
    }

    #[test]
    fn test_oversized_datagram() {
        let mut bytes = encode(&Packet::GameState(sample_state())).unwrap();
        bytes.push(0);

        assert!(matches!(
            decode(&bytes),
            Err(ProtocolError::Oversized(86))
        ));
    }

    #[test]
    fn test_trailing_bytes_within_capacity_are_ignored() {
        let mut bytes = encode(&Packet::PaddleMovement(PaddleMovement {
            relative_y: 1,
            target_paddle: PaddleSide::Left,
        }))
        .unwrap();
        bytes.extend_from_slice(&[0xaa; 4]);

        let (_, packet) = decode(&bytes).unwrap();
        assert_eq!(
            packet,
            Packet::PaddleMovement(PaddleMovement {
                relative_y: 1,
                target_paddle: PaddleSide::Left,
            })
        );
    }
}
