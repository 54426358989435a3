//! Keyboard input: key mapping and the blocking reader thread

use console::{Key, Term};
use log::{debug, warn};
use shared::{PaddleMovement, ViewSettings};
use std::thread;
use tokio::sync::mpsc;

/// Discrete events produced by the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Up,
    Down,
    Quit,
}

impl InputEvent {
    /// Row delta requested by this event, if it is a movement.
    pub fn relative_y(self) -> Option<i32> {
        match self {
            InputEvent::Up => Some(-1),
            InputEvent::Down => Some(1),
            InputEvent::Quit => None,
        }
    }

    /// Movement for the paddle this client controls.
    ///
    /// Clients without a paddle still produce movements; the server ignores
    /// them.
    pub fn to_movement(self, view: &ViewSettings) -> Option<PaddleMovement> {
        self.relative_y().map(|relative_y| PaddleMovement {
            relative_y,
            target_paddle: view.controlled_paddle,
        })
    }
}

pub fn map_key(key: &Key) -> Option<InputEvent> {
    match key {
        Key::ArrowUp => Some(InputEvent::Up),
        Key::ArrowDown => Some(InputEvent::Down),
        Key::Escape | Key::Char('q') => Some(InputEvent::Quit),
        _ => None,
    }
}

/// Reads keys on a dedicated thread and forwards mapped events.
///
/// The thread exits after a quit key, when the receiver is dropped, or when
/// the terminal cannot be read.
pub fn spawn_key_reader(term: Term) -> mpsc::UnboundedReceiver<InputEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    thread::spawn(move || loop {
        let key = match term.read_key() {
            Ok(key) => key,
            Err(e) => {
                warn!("Stopped reading keys: {}", e);
                break;
            }
        };

        let Some(event) = map_key(&key) else {
            continue;
        };
        debug!("Key {:?} -> {:?}", key, event);

        if tx.send(event).is_err() || event == InputEvent::Quit {
            break;
        }
    });

    rx
}
