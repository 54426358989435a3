//! Authoritative pong simulation.
//!
//! The simulation owns the only writable [`GameState`]. It is a three-mode
//! state machine: `Playing` advances the ball, while `LeftLost`/`RightLost`
//! pin the ball to the losing paddle for a short countdown before play
//! resumes.

use log::{debug, info};
use shared::{GameMode, GameState, Paddle, PaddleMovement, PaddleSide, SimulationConfig};
use std::time::Duration;

/// Smoothing applied to the tick interval on every `Playing` step.
const TICK_DECAY: f64 = 0.99;
const TICK_BIAS: f64 = 0.35;

#[derive(Debug, Clone)]
pub struct GameSimulation {
    state: GameState,
    config: SimulationConfig,
}

impl GameSimulation {
    /// Seeds a fresh game on a `width` x `height` field.
    pub fn new(width: i32, height: i32, config: SimulationConfig) -> Self {
        let paddle = |x| Paddle {
            x,
            y: height / 2,
            size: config.initial_paddle_size,
        };

        let state = GameState {
            mode: GameMode::Playing,
            mode_timeout: 0,
            ball: config.initial_ball,
            ball_speed: config.initial_ball_speed,
            left_paddle: paddle(config.paddle_margin),
            right_paddle: paddle(width - config.paddle_margin - 1),
            tick: config.initial_tick_ms,
            field_height: height,
            field_width: width,
            left_score: 0,
            right_score: 0,
            debug: config.debug,
        };

        info!("Game seeded on a {}x{} field", width, height);
        Self { state, config }
    }

    /// Resumes from an existing snapshot.
    pub fn from_state(state: GameState, config: SimulationConfig) -> Self {
        Self { state, config }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Interval until the next step, truncated to whole milliseconds.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis((self.state.tick as u64).max(1))
    }

    pub fn enter_mode(&mut self, mode: GameMode) {
        let state = &mut self.state;
        state.mode = mode;
        state.tick = self.config.initial_tick_ms;

        match mode {
            GameMode::Playing => {
                state.mode_timeout = 0;
            }
            GameMode::LeftLost => {
                state.mode_timeout = self.config.lost_mode_timeout;
                rebalance(
                    &mut state.left_paddle,
                    &mut state.right_paddle,
                    &self.config,
                );
            }
            GameMode::RightLost => {
                state.mode_timeout = self.config.lost_mode_timeout;
                rebalance(
                    &mut state.right_paddle,
                    &mut state.left_paddle,
                    &self.config,
                );
            }
        }

        debug!(
            "Entered {:?} (paddles {}/{})",
            mode, state.left_paddle.size, state.right_paddle.size
        );
    }

    /// Advances the simulation by one step.
    pub fn update(&mut self) {
        match self.state.mode {
            GameMode::Playing => self.step_playing(),
            GameMode::LeftLost => {
                self.state.ball.y = self.state.left_paddle.y;
                self.count_down();
            }
            GameMode::RightLost => {
                self.state.ball.y = self.state.right_paddle.y;
                self.count_down();
            }
        }
    }

    fn count_down(&mut self) {
        self.state.mode_timeout -= 1;
        if self.state.mode_timeout < 0 {
            self.enter_mode(GameMode::Playing);
        }
    }

    fn step_playing(&mut self) {
        self.state.ball.x += self.state.ball_speed.dx;
        self.state.ball.y += self.state.ball_speed.dy;

        let ball = self.state.ball;
        let left = self.state.left_paddle;
        let right = self.state.right_paddle;

        // A miss still reflects the ball, so play resumes heading away from
        // the player who lost the point.
        if ball.x <= left.x {
            if !left.overlaps_rows(ball.y, ball.height) {
                self.state.right_score += 1;
                self.state.ball.y = left.y;
                info!(
                    "Right player scores ({} - {})",
                    self.state.left_score, self.state.right_score
                );
                self.enter_mode(GameMode::LeftLost);
            }
            self.state.ball.x = left.x + 1;
            self.state.ball_speed.dx = -self.state.ball_speed.dx;
        } else if ball.x + ball.width >= right.x {
            if !right.overlaps_rows(ball.y, ball.height) {
                self.state.left_score += 1;
                self.state.ball.y = right.y;
                info!(
                    "Left player scores ({} - {})",
                    self.state.left_score, self.state.right_score
                );
                self.enter_mode(GameMode::RightLost);
            }
            self.state.ball.x = right.x - ball.width;
            self.state.ball_speed.dx = -self.state.ball_speed.dx;
        }

        let ball = &mut self.state.ball;
        if ball.y <= 0 {
            ball.y = 0;
            self.state.ball_speed.dy = -self.state.ball_speed.dy;
        } else if ball.y + ball.height >= self.state.field_height {
            ball.y = self.state.field_height - ball.height;
            self.state.ball_speed.dy = -self.state.ball_speed.dy;
        }

        self.state.tick = self.state.tick * TICK_DECAY + TICK_BIAS;
    }

    /// Applies a client's paddle input.
    ///
    /// While a point pause is running, any input extends the countdown by
    /// one and immediately re-runs a step, so the pinned ball follows the
    /// paddle.
    pub fn move_paddle(&mut self, movement: &PaddleMovement) {
        let height = self.state.field_height;
        match movement.target_paddle {
            PaddleSide::Left => self.state.left_paddle.shift(movement.relative_y, height),
            PaddleSide::Right => self.state.right_paddle.shift(movement.relative_y, height),
            PaddleSide::None => {}
        }

        if self.state.mode.is_lost() {
            self.state.mode_timeout += 1;
            self.update();
        }
    }
}

/// Grows the loser's paddle and, only when it grew, shrinks the winner's.
fn rebalance(loser: &mut Paddle, winner: &mut Paddle, config: &SimulationConfig) {
    if loser.size < config.max_paddle_size {
        loser.size += 1;
        if winner.size > config.min_paddle_size {
            winner.size -= 1;
        }
    }
}
