//! Types and plumbing shared by the pong server and its terminal clients.
//!
//! The data model mirrors the wire layout field for field: every struct here
//! is encoded by [`protocol`] in declaration order, so reordering fields is a
//! protocol change.

pub mod protocol;
pub mod transport;

use serde::{Deserialize, Serialize};

pub use protocol::{decode, encode, Packet, PacketHeader, PacketKind, ProtocolError};
pub use transport::{Transport, TransportError};

pub const PADDLE_MARGIN: i32 = 1;
pub const INITIAL_TICK_MS: f64 = 70.0;
pub const LOST_MODE_TIMEOUT: i16 = 12;

pub const MIN_PADDLE_SIZE: i32 = 4;
pub const INITIAL_PADDLE_SIZE: i32 = 6;
pub const MAX_PADDLE_SIZE: i32 = 10;

pub const INITIAL_BALL: Ball = Ball {
    x: 5,
    y: 5,
    width: 2,
    height: 1,
};
pub const INITIAL_BALL_SPEED: BallSpeed = BallSpeed { dx: 1, dy: 1 };

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:5454";

/// Raised when a one-byte enum on the wire holds an unassigned value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {what} discriminant {value}")]
pub struct InvalidDiscriminant {
    pub what: &'static str,
    pub value: i8,
}

/// Which paddle a client controls, or which paddle a movement targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum PaddleSide {
    #[default]
    None,
    Left,
    Right,
}

impl From<PaddleSide> for i8 {
    fn from(side: PaddleSide) -> i8 {
        match side {
            PaddleSide::None => 0,
            PaddleSide::Left => 1,
            PaddleSide::Right => 2,
        }
    }
}

impl TryFrom<i8> for PaddleSide {
    type Error = InvalidDiscriminant;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PaddleSide::None),
            1 => Ok(PaddleSide::Left),
            2 => Ok(PaddleSide::Right),
            value => Err(InvalidDiscriminant {
                what: "paddle side",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum GameMode {
    #[default]
    Playing,
    LeftLost,
    RightLost,
}

impl GameMode {
    pub fn is_lost(self) -> bool {
        matches!(self, GameMode::LeftLost | GameMode::RightLost)
    }
}

impl From<GameMode> for i8 {
    fn from(mode: GameMode) -> i8 {
        match mode {
            GameMode::Playing => 0,
            GameMode::LeftLost => 1,
            GameMode::RightLost => 2,
        }
    }
}

impl TryFrom<i8> for GameMode {
    type Error = InvalidDiscriminant;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(GameMode::Playing),
            1 => Ok(GameMode::LeftLost),
            2 => Ok(GameMode::RightLost),
            value => Err(InvalidDiscriminant {
                what: "game mode",
                value,
            }),
        }
    }
}

/// Terminal size reported by a client during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowSettings {
    pub width: i32,
    pub height: i32,
    /// Set by the client that closes the handshake phase.
    pub is_last_client: bool,
}

/// A client's slice of the shared play-field, assigned once by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewSettings {
    pub x_offset: i32,
    pub height: i32,
    /// Combined width of every client window.
    pub width: i32,
    pub controlled_paddle: PaddleSide,
}

/// Axis-aligned ball rectangle, anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ball {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BallSpeed {
    pub dx: i32,
    pub dy: i32,
}

/// A vertical paddle in a fixed column; `y` is the center row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Paddle {
    pub x: i32,
    pub y: i32,
    pub size: i32,
}

impl Paddle {
    /// First row covered by the paddle.
    pub fn top(&self) -> i32 {
        self.y - self.size / 2
    }

    /// One past the last row covered by the paddle.
    pub fn bottom(&self) -> i32 {
        self.y + self.size / 2
    }

    /// Half-open span test against the rows `[y, y + height)`.
    pub fn overlaps_rows(&self, y: i32, height: i32) -> bool {
        y + height > self.top() && y < self.bottom()
    }

    /// Moves the paddle by `relative_y`, keeping its span inside `[0, field_height]`.
    pub fn shift(&mut self, relative_y: i32, field_height: i32) {
        let half = self.size / 2;
        self.y = self.y.saturating_add(relative_y);
        if self.y < half {
            self.y = half;
        } else if self.y > field_height - half {
            self.y = field_height - half;
        }
    }
}

/// Authoritative snapshot broadcast by the server after every change.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameState {
    pub mode: GameMode,
    pub mode_timeout: i16,
    pub ball: Ball,
    pub ball_speed: BallSpeed,
    pub left_paddle: Paddle,
    pub right_paddle: Paddle,
    /// Current step interval in milliseconds.
    pub tick: f64,
    pub field_height: i32,
    pub field_width: i32,
    pub left_score: i32,
    pub right_score: i32,
    pub debug: bool,
}

/// A relative paddle move requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaddleMovement {
    pub relative_y: i32,
    pub target_paddle: PaddleSide,
}

/// Tunables handed to the simulation at construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub paddle_margin: i32,
    pub initial_tick_ms: f64,
    pub lost_mode_timeout: i16,
    pub min_paddle_size: i32,
    pub initial_paddle_size: i32,
    pub max_paddle_size: i32,
    pub initial_ball: Ball,
    pub initial_ball_speed: BallSpeed,
    /// Ask clients to draw the diagnostic overlay.
    pub debug: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            paddle_margin: PADDLE_MARGIN,
            initial_tick_ms: INITIAL_TICK_MS,
            lost_mode_timeout: LOST_MODE_TIMEOUT,
            min_paddle_size: MIN_PADDLE_SIZE,
            initial_paddle_size: INITIAL_PADDLE_SIZE,
            max_paddle_size: MAX_PADDLE_SIZE,
            initial_ball: INITIAL_BALL,
            initial_ball_speed: INITIAL_BALL_SPEED,
            debug: false,
        }
    }
}

impl SimulationConfig {
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paddle_side_discriminants() {
        assert_eq!(i8::from(PaddleSide::None), 0);
        assert_eq!(i8::from(PaddleSide::Left), 1);
        assert_eq!(i8::from(PaddleSide::Right), 2);
        assert_eq!(PaddleSide::try_from(2), Ok(PaddleSide::Right));

        let err = PaddleSide::try_from(3).unwrap_err();
        assert_eq!(err.value, 3);
        assert_eq!(err.to_string(), "invalid paddle side discriminant 3");
    }

    #[test]
    fn test_game_mode_discriminants() {
        assert_eq!(GameMode::try_from(0), Ok(GameMode::Playing));
        assert_eq!(GameMode::try_from(1), Ok(GameMode::LeftLost));
        assert_eq!(GameMode::try_from(2), Ok(GameMode::RightLost));
        assert!(GameMode::try_from(-1).is_err());
        assert!(GameMode::LeftLost.is_lost());
        assert!(!GameMode::Playing.is_lost());
    }

    #[test]
    fn test_paddle_span() {
        let paddle = Paddle { x: 1, y: 10, size: 6 };
        assert_eq!(paddle.top(), 7);
        assert_eq!(paddle.bottom(), 13);

        assert!(paddle.overlaps_rows(10, 1));
        assert!(paddle.overlaps_rows(7, 1));
        assert!(paddle.overlaps_rows(12, 1));
        assert!(!paddle.overlaps_rows(13, 1));
        assert!(!paddle.overlaps_rows(6, 1));
        assert!(!paddle.overlaps_rows(20, 1));
    }

    #[test]
    fn test_paddle_shift_clamps_to_field() {
        let mut paddle = Paddle { x: 1, y: 10, size: 6 };

        paddle.shift(-1, 20);
        assert_eq!(paddle.y, 9);

        paddle.shift(-100, 20);
        assert_eq!(paddle.y, 3);

        paddle.shift(100, 20);
        assert_eq!(paddle.y, 17);

        paddle.shift(i32::MAX, 20);
        assert_eq!(paddle.y, 17);
    }

    #[test]
    fn test_default_config_uses_constants() {
        let config = SimulationConfig::default();
        assert_eq!(config.initial_tick_ms, INITIAL_TICK_MS);
        assert_eq!(config.lost_mode_timeout, LOST_MODE_TIMEOUT);
        assert_eq!(config.initial_ball, INITIAL_BALL);
        assert!(!config.debug);
        assert!(config.with_debug(true).debug);
    }
}
