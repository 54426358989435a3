//! Client side of the synchronization protocol.
//!
//! [`Client::handshake`] exchanges window settings for the permanent view
//! settings and yields a [`Session`]. The session then runs one cooperative
//! loop that renders incoming snapshots and forwards keyboard input, so the
//! last rendered snapshot is only ever touched from that loop.

use crate::input::InputEvent;
use crate::rendering::Presenter;
use log::{debug, info};
use shared::protocol::{self, ProtocolError};
use shared::{Packet, Transport, TransportError, ViewSettings, WindowSettings};
use std::io;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(e) => ClientError::Io(e),
            TransportError::Protocol(e) => ClientError::Protocol(e),
        }
    }
}

/// A client connected to the server but not yet assigned a view.
pub struct Client {
    transport: Transport,
    window: WindowSettings,
}

impl Client {
    pub async fn connect(server: &str, window: WindowSettings) -> Result<Self, ClientError> {
        protocol::verify_packet_capacity()?;

        let transport = Transport::connect(server).await?;
        info!("Connecting to {} as {:?}", server, window);

        Ok(Client { transport, window })
    }

    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Sends the window settings once, then waits for the view settings.
    ///
    /// Anything other than view settings is discarded while waiting.
    pub async fn handshake(self) -> Result<Session, ClientError> {
        self.transport
            .send_packet(&Packet::WindowSettings(self.window))
            .await?;

        loop {
            let (_, packet) = self.transport.recv_packet().await?;
            match packet {
                Ok(Packet::ViewSettings(view)) => {
                    info!("Received view settings: {:?}", view);
                    return Ok(Session {
                        transport: self.transport,
                        view,
                    });
                }
                Ok(other) => debug!("Ignoring {:?} before view settings", other.kind()),
                Err(e) => debug!("Dropping datagram: {}", e),
            }
        }
    }
}

/// A client with its view assigned.
pub struct Session {
    transport: Transport,
    view: ViewSettings,
}

impl Session {
    pub fn view(&self) -> &ViewSettings {
        &self.view
    }

    /// Renders snapshots and forwards input until the user quits.
    ///
    /// If the input channel closes, the session keeps rendering.
    pub async fn run<P: Presenter>(
        &self,
        presenter: &mut P,
        mut inputs: mpsc::UnboundedReceiver<InputEvent>,
    ) -> Result<(), ClientError> {
        let mut inputs_open = true;

        loop {
            tokio::select! {
                received = self.transport.recv_packet() => {
                    let (_, packet) = received?;
                    match packet {
                        Ok(Packet::GameState(state)) => presenter.render(&self.view, &state)?,
                        Ok(other) => debug!("Ignoring {:?}", other.kind()),
                        Err(e) => debug!("Dropping datagram: {}", e),
                    }
                },

                event = inputs.recv(), if inputs_open => {
                    match event {
                        Some(InputEvent::Quit) => {
                            info!("Quit requested");
                            return Ok(());
                        }
                        Some(event) => self.send_input(event).await?,
                        None => inputs_open = false,
                    }
                },
            }
        }
    }

    /// Sends the movement for `event` to the server.
    pub async fn send_input(&self, event: InputEvent) -> Result<(), ClientError> {
        if let Some(movement) = event.to_movement(&self.view) {
            self.transport
                .send_packet(&Packet::PaddleMovement(movement))
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{GameMode, GameState, PaddleMovement, PaddleSide};
    use std::time::Duration;
    use tokio_test::assert_ok;

    #[derive(Default)]
    struct RecordingPresenter {
        frames: Vec<GameState>,
    }

    impl Presenter for RecordingPresenter {
        fn render(&mut self, _view: &ViewSettings, state: &GameState) -> io::Result<()> {
            self.frames.push(state.clone());
            Ok(())
        }
    }

    fn view() -> ViewSettings {
        ViewSettings {
            x_offset: 0,
            height: 20,
            width: 80,
            controlled_paddle: PaddleSide::Left,
        }
    }

    fn window() -> WindowSettings {
        WindowSettings {
            width: 40,
            height: 20,
            is_last_client: false,
        }
    }

    /// Fake server that completes the handshake and returns the client address.
    async fn handshake_with(fake: &Transport, client: Client) -> Session {
        let handshake = tokio::spawn(client.handshake());

        let (client_addr, packet) = fake.recv_packet().await.unwrap();
        assert_eq!(packet.unwrap(), Packet::WindowSettings(window()));

        let early = GameState {
            left_score: 99,
            ..GameState::default()
        };
        fake.send_packet_to(client_addr, &Packet::GameState(early))
            .await
            .unwrap();
        fake.send_to(client_addr, b"garbage").await.unwrap();
        fake.send_packet_to(client_addr, &Packet::ViewSettings(view()))
            .await
            .unwrap();

        handshake.await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_handshake_waits_for_view_settings() {
        let fake = Transport::bind("127.0.0.1:0").await.unwrap();
        let server_addr = fake.local_addr().unwrap().to_string();
        let client = assert_ok!(Client::connect(&server_addr, window()).await);

        let session = handshake_with(&fake, client).await;
        assert_eq!(session.view(), &view());
    }

    #[tokio::test]
    async fn test_session_renders_snapshots_and_sends_input() {
        let fake = Transport::bind("127.0.0.1:0").await.unwrap();
        let client = Client::connect(&fake.local_addr().unwrap().to_string(), window())
            .await
            .unwrap();
        let client_addr = client.local_addr().unwrap();
        let session = handshake_with(&fake, client).await;

        let first = GameState {
            tick: 70.0,
            ..GameState::default()
        };
        let second = GameState {
            mode: GameMode::RightLost,
            left_score: 1,
            ..first.clone()
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut presenter = RecordingPresenter::default();

        let script = async {
            fake.send_packet_to(client_addr, &Packet::ViewSettings(view()))
                .await
                .unwrap();
            fake.send_to(client_addr, b"junk").await.unwrap();
            fake.send_packet_to(client_addr, &Packet::GameState(first.clone()))
                .await
                .unwrap();
            fake.send_packet_to(client_addr, &Packet::GameState(second.clone()))
                .await
                .unwrap();

            tx.send(InputEvent::Up).unwrap();
            let (_, movement) = fake.recv_packet().await.unwrap();

            tokio::time::sleep(Duration::from_millis(100)).await;
            tx.send(InputEvent::Quit).unwrap();
            movement.unwrap()
        };

        let (result, movement) = tokio::join!(session.run(&mut presenter, rx), script);

        assert_ok!(result);
        assert_eq!(presenter.frames, vec![first, second]);
        assert_eq!(
            movement,
            Packet::PaddleMovement(PaddleMovement {
                relative_y: -1,
                target_paddle: PaddleSide::Left,
            })
        );
    }

    #[tokio::test]
    async fn test_session_survives_closed_input_channel() {
        let fake = Transport::bind("127.0.0.1:0").await.unwrap();
        let client = Client::connect(&fake.local_addr().unwrap().to_string(), window())
            .await
            .unwrap();
        let client_addr = client.local_addr().unwrap();
        let session = handshake_with(&fake, client).await;

        let (tx, rx) = mpsc::unbounded_channel::<InputEvent>();
        drop(tx);

        let mut presenter = RecordingPresenter::default();
        let state = GameState::default();

        let script = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            fake.send_packet_to(client_addr, &Packet::GameState(state.clone()))
                .await
                .unwrap();
        };

        let run = tokio::time::timeout(Duration::from_millis(300), session.run(&mut presenter, rx));
        let (outcome, ()) = tokio::join!(run, script);

        assert!(outcome.is_err(), "session should still be running");
        assert_eq!(presenter.frames, vec![state]);
    }
}
