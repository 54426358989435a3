//! Server network layer: handshake, view assignment and the game loop.
//!
//! After the handshake the server runs two concurrent units. A reader task
//! decodes datagrams and forwards paddle movements over a channel; the main
//! loop owns the simulation and is the only place it is mutated or
//! broadcast. The loop wakes on whichever is ready first, the step timer or
//! a queued movement.

use crate::client_manager::ClientManager;
use crate::game::GameSimulation;
use log::{debug, error, info, warn};
use shared::protocol::{self, ProtocolError};
use shared::{Packet, PaddleMovement, SimulationConfig, Transport, TransportError};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("no client completed the handshake")]
    NoClients,
    #[error("network reader stopped unexpectedly")]
    ChannelClosed,
}

impl From<TransportError> for ServerError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(e) => ServerError::Io(e),
            TransportError::Protocol(e) => ServerError::Protocol(e),
        }
    }
}

/// Messages sent from the reader task to the main loop
#[derive(Debug)]
pub enum ServerMessage {
    PaddleMoved {
        movement: PaddleMovement,
        addr: SocketAddr,
    },
    ReceiveFailed(io::Error),
}

pub struct Server {
    transport: Transport,
    clients: ClientManager,
    config: SimulationConfig,
}

impl Server {
    pub async fn bind(addr: &str, config: SimulationConfig) -> Result<Self, ServerError> {
        protocol::verify_packet_capacity()?;

        let transport = Transport::bind(addr).await?;
        info!("Server listening on {}", transport.local_addr()?);

        Ok(Server {
            transport,
            clients: ClientManager::new(),
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    /// Blocks until the last client has sent its window settings.
    pub async fn accept_clients(&mut self) -> Result<(), ServerError> {
        info!("Waiting for clients");

        while !self.clients.is_closed() {
            let (addr, packet) = self.transport.recv_packet().await?;
            match packet {
                Ok(Packet::WindowSettings(window)) => {
                    self.clients.register_client(window, addr);
                }
                Ok(other) => {
                    debug!("Ignoring {:?} from {} during handshake", other.kind(), addr);
                }
                Err(e) => {
                    warn!("Dropping datagram from {}: {}", addr, e);
                }
            }
        }

        Ok(())
    }

    /// Computes the layout and tells every client its view.
    pub async fn send_view_settings(&mut self) -> Result<(), ServerError> {
        self.clients.assign_views();

        for client in self.clients.clients() {
            self.transport
                .send_packet_to(client.addr, &Packet::ViewSettings(client.view))
                .await?;
            info!("View settings sent to {}: {:?}", client.addr, client.view);
        }

        Ok(())
    }

    /// Runs the whole server lifecycle. Only returns on a fatal error.
    pub async fn run(mut self) -> Result<(), ServerError> {
        self.accept_clients().await?;
        self.send_view_settings().await?;

        let (width, height) = self.clients.play_field().ok_or(ServerError::NoClients)?;
        let simulation = GameSimulation::new(width, height, self.config.clone());

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        spawn_network_receiver(self.transport.clone(), server_tx);

        self.game_loop(simulation, server_rx).await
    }

    async fn game_loop(
        &self,
        mut simulation: GameSimulation,
        mut server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    ) -> Result<(), ServerError> {
        let mut period = simulation.tick_interval();
        let mut tick_timer = step_timer(period);

        info!("Game started with {} clients", self.clients.len());

        loop {
            tokio::select! {
                _ = tick_timer.tick() => {
                    simulation.update();
                    self.broadcast(simulation.state()).await?;

                    if let Some(next) = next_timer(period, &simulation) {
                        debug!("Tick interval {:?} -> {:?}", period, next);
                        period = next;
                        tick_timer = step_timer(period);
                    }
                },

                message = server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PaddleMoved { movement, addr }) => {
                            if self.clients.find_client_by_addr(addr).is_some() {
                                simulation.move_paddle(&movement);
                                self.broadcast(simulation.state()).await?;
                            } else {
                                warn!("Ignoring paddle movement from unknown client {}", addr);
                            }
                        },
                        Some(ServerMessage::ReceiveFailed(e)) => {
                            error!("Error receiving packet: {}", e);
                            return Err(ServerError::Io(e));
                        },
                        None => return Err(ServerError::ChannelClosed),
                    }
                },
            }
        }
    }

    /// Sends the snapshot to every client in registration order.
    async fn broadcast(&self, state: &shared::GameState) -> Result<(), ServerError> {
        let bytes = protocol::encode(&Packet::GameState(state.clone()))?;
        for addr in self.clients.client_addrs() {
            self.transport.send_to(addr, &bytes).await?;
        }
        Ok(())
    }
}

/// Timer whose first tick fires one full period from now.
fn step_timer(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

/// New timer period once the step interval moves to another whole millisecond.
fn next_timer(period: Duration, simulation: &GameSimulation) -> Option<Duration> {
    let next = simulation.tick_interval();
    (next != period).then_some(next)
}

/// Spawns task that continuously listens for incoming packets.
///
/// Only paddle movements are forwarded; the task never touches game state.
fn spawn_network_receiver(transport: Transport, server_tx: mpsc::UnboundedSender<ServerMessage>) {
    tokio::spawn(async move {
        loop {
            let message = match transport.recv_packet().await {
                Ok((addr, Ok(Packet::PaddleMovement(movement)))) => {
                    ServerMessage::PaddleMoved { movement, addr }
                }
                Ok((addr, Ok(Packet::WindowSettings(_)))) => {
                    warn!("Late handshake from {} ignored", addr);
                    continue;
                }
                Ok((addr, Ok(other))) => {
                    debug!("Ignoring {:?} from {}", other.kind(), addr);
                    continue;
                }
                Ok((addr, Err(e))) => {
                    warn!("Dropping datagram from {}: {}", addr, e);
                    continue;
                }
                Err(e) => ServerMessage::ReceiveFailed(e),
            };

            let fatal = matches!(message, ServerMessage::ReceiveFailed(_));
            if server_tx.send(message).is_err() || fatal {
                break;
            }
        }
    });
}
