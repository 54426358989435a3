//! Terminal presentation of game snapshots.
//!
//! Each client only shows its own horizontal slice of the shared field:
//! world column `x` lands on local column `x - view.x_offset`, and anything
//! outside the local window is clipped.

use console::{style, Term};
use shared::{Ball, GameState, Paddle, ViewSettings, WindowSettings};
use std::io;

const BLANK: &str = " ";

/// Receives every accepted snapshot, in arrival order.
pub trait Presenter {
    fn render(&mut self, view: &ViewSettings, state: &GameState) -> io::Result<()>;
}

pub struct Renderer {
    term: Term,
    width: i32,
    height: i32,
    force_debug: bool,
    /// Last drawn snapshot, erased before the next one is drawn.
    previous: Option<GameState>,
}

impl Renderer {
    pub fn new(term: Term, force_debug: bool) -> io::Result<Self> {
        let (rows, cols) = term.size();
        term.hide_cursor()?;
        term.clear_screen()?;
        term.flush()?;

        Ok(Renderer {
            term,
            width: i32::from(cols),
            height: i32::from(rows),
            force_debug,
            previous: None,
        })
    }

    /// Handshake message describing this terminal.
    pub fn window_settings(&self, is_last_client: bool) -> WindowSettings {
        WindowSettings {
            width: self.width,
            height: self.height,
            is_last_client,
        }
    }

    pub fn show_status(&self, message: &str) -> io::Result<()> {
        self.term.clear_screen()?;
        self.put_text(message, 2, 0)?;
        self.term.flush()
    }

    fn put(&self, view: &ViewSettings, x: i32, y: i32, glyph: &str) -> io::Result<()> {
        match to_local(view, self.width, x, y) {
            Some((col, row)) => {
                self.term.move_cursor_to(col, row)?;
                self.term.write_str(glyph)
            }
            None => Ok(()),
        }
    }

    fn put_text(&self, text: &str, col: usize, row: usize) -> io::Result<()> {
        let room = (self.width.max(0) as usize).saturating_sub(col);
        let clipped: String = text.chars().take(room).collect();
        self.term.move_cursor_to(col, row)?;
        self.term.write_str(&clipped)
    }

    fn draw_ball(&self, view: &ViewSettings, ball: &Ball, erase: bool) -> io::Result<()> {
        let glyph = if erase {
            BLANK.to_string()
        } else {
            style("O").red().on_red().to_string()
        };
        for (x, y) in ball_cells(ball) {
            self.put(view, x, y, &glyph)?;
        }
        Ok(())
    }

    fn draw_paddle(&self, view: &ViewSettings, paddle: &Paddle, erase: bool) -> io::Result<()> {
        let glyph = if erase {
            BLANK.to_string()
        } else {
            style("#").white().on_white().to_string()
        };
        for y in paddle.top()..paddle.bottom() {
            self.put(view, paddle.x, y, &glyph)?;
        }
        Ok(())
    }

    fn erase(&self, view: &ViewSettings, state: &GameState) -> io::Result<()> {
        self.draw_ball(view, &state.ball, true)?;
        self.draw_paddle(view, &state.left_paddle, true)?;
        self.draw_paddle(view, &state.right_paddle, true)
    }
}

impl Presenter for Renderer {
    fn render(&mut self, view: &ViewSettings, state: &GameState) -> io::Result<()> {
        match self.previous.take() {
            Some(previous) => self.erase(view, &previous)?,
            None => self.term.clear_screen()?,
        }

        self.put_text(&score_line(state), 2, 0)?;
        if state.debug || self.force_debug {
            self.put_text(&format!("{:?}       ", state), 2, 2)?;
            self.put_text(&format!("{:?}      ", view), 2, 3)?;
        }

        self.draw_ball(view, &state.ball, false)?;
        self.draw_paddle(view, &state.left_paddle, false)?;
        self.draw_paddle(view, &state.right_paddle, false)?;
        self.term.flush()?;

        self.previous = Some(state.clone());
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.term.clear_screen();
        let _ = self.term.show_cursor();
        let _ = self.term.flush();
    }
}

pub fn score_line(state: &GameState) -> String {
    format!("{} - {}", state.left_score, state.right_score)
}

/// Maps a world cell to a local `(column, row)`, or `None` when it falls
/// outside this client's window.
pub fn to_local(view: &ViewSettings, local_width: i32, x: i32, y: i32) -> Option<(usize, usize)> {
    let col = x - view.x_offset;
    if col < 0 || col >= local_width || y < 0 || y >= view.height {
        return None;
    }
    Some((col as usize, y as usize))
}

fn ball_cells(ball: &Ball) -> impl Iterator<Item = (i32, i32)> + '_ {
    (0..ball.width).flat_map(move |i| (0..ball.height).map(move |j| (ball.x + i, ball.y + j)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PaddleSide;

    fn middle_view() -> ViewSettings {
        ViewSettings {
            x_offset: 40,
            height: 18,
            width: 120,
            controlled_paddle: PaddleSide::None,
        }
    }

    #[test]
    fn test_to_local_translates_by_offset() {
        let view = middle_view();
        assert_eq!(to_local(&view, 40, 40, 0), Some((0, 0)));
        assert_eq!(to_local(&view, 40, 79, 17), Some((39, 17)));
    }

    #[test]
    fn test_to_local_clips_outside_window() {
        let view = middle_view();
        assert_eq!(to_local(&view, 40, 39, 5), None);
        assert_eq!(to_local(&view, 40, 80, 5), None);
        assert_eq!(to_local(&view, 40, 50, -1), None);
        assert_eq!(to_local(&view, 40, 50, 18), None);
    }

    #[test]
    fn test_ball_cells_cover_rectangle() {
        let ball = Ball {
            x: 5,
            y: 7,
            width: 2,
            height: 1,
        };
        let cells: Vec<(i32, i32)> = ball_cells(&ball).collect();
        assert_eq!(cells, vec![(5, 7), (6, 7)]);
    }

    #[test]
    fn test_score_line() {
        let state = GameState {
            left_score: 3,
            right_score: 11,
            ..GameState::default()
        };
        assert_eq!(score_line(&state), "3 - 11");
    }
}
