//! # Pong Client Library
//!
//! A terminal client for the networked pong game. The client holds no game
//! logic: it reports its terminal size, receives the slice of the shared
//! field it must display, and from then on draws every snapshot the server
//! broadcasts while forwarding arrow-key presses as paddle movements.
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! - Key to event mapping (arrows move, `q`/Esc quits)
//! - Blocking key reader thread feeding a channel
//!
//! ### Network Module (`network`)
//! - Handshake: window settings out, view settings in
//! - Session loop: snapshots to the presenter, input to the server
//!
//! ### Rendering Module (`rendering`)
//! - `Presenter` seam between synchronization and drawing
//! - Terminal renderer translating world cells into the local window

pub mod input;
pub mod network;
pub mod rendering;

pub use network::{Client, ClientError, Session};

use console::Term;

/// Connects to `server`, completes the handshake and plays until the user
/// quits or the transport fails.
pub async fn run(server: &str, last_client: bool, debug: bool) -> Result<(), ClientError> {
    let mut renderer = rendering::Renderer::new(Term::buffered_stdout(), debug)?;
    let window = renderer.window_settings(last_client);

    let client = Client::connect(server, window).await?;
    renderer.show_status("Waiting for other players...")?;
    let session = client.handshake().await?;

    let inputs = input::spawn_key_reader(Term::stdout());
    session.run(&mut renderer, inputs).await
}
