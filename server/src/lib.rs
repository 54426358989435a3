//! # Pong Server Library
//!
//! The authoritative side of the networked pong game. It collects client
//! handshakes, tiles their terminal windows into one play-field, then runs
//! the simulation and broadcasts a full snapshot after every change.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! - Handshake registration in arrival order
//! - Viewport layout and paddle control assignment
//!
//! ### Game Module (`game`)
//! - Ball and paddle physics, scoring
//! - `Playing` / `LeftLost` / `RightLost` mode transitions
//! - Adaptive step interval
//!
//! ### Network Module (`network`)
//! - Handshake phase and view distribution
//! - Reader task feeding paddle movements to the main loop
//! - Main loop multiplexing the step timer against queued input
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use shared::SimulationConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind("0.0.0.0:5454", SimulationConfig::default()).await?;
//!
//!     // Waits for the last client, sends view settings, then plays forever.
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod network;

pub use network::{Server, ServerError};

/// Binds `addr` and runs the server until a fatal transport error.
pub async fn run(addr: &str, config: shared::SimulationConfig) -> Result<(), ServerError> {
    Server::bind(addr, config).await?.run().await
}
