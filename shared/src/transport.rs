//! Thin UDP wrapper used by both roles.
//!
//! Delivery is best-effort: no retries, no ordering, no deduplication. One
//! datagram carries exactly one packet.

use crate::protocol::{self, Packet, ProtocolError, RECV_BUFFER_SIZE};
use log::debug;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::{lookup_host, UdpSocket};

/// Shared handle to the process' single UDP socket.
#[derive(Debug, Clone)]
pub struct Transport {
    socket: Arc<UdpSocket>,
}

impl Transport {
    /// Binds the server socket.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        debug!("Bound UDP socket on {}", socket.local_addr()?);
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    /// Binds an ephemeral local port and makes `server` the default peer.
    pub async fn connect(server: &str) -> io::Result<Self> {
        let peer = lookup_host(server).await?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("could not resolve {}", server),
            )
        })?;

        let local: SocketAddr = match peer {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        debug!("Connected {} to {}", socket.local_addr()?, peer);

        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Waits for the next datagram.
    pub async fn receive(&self) -> io::Result<(SocketAddr, Vec<u8>)> {
        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        let (len, addr) = self.socket.recv_from(&mut buffer).await?;
        Ok((addr, buffer[..len].to_vec()))
    }

    pub async fn send_to(&self, addr: SocketAddr, bytes: &[u8]) -> io::Result<()> {
        self.socket.send_to(bytes, addr).await?;
        Ok(())
    }

    /// Sends to the default peer set by [`Transport::connect`].
    pub async fn send(&self, bytes: &[u8]) -> io::Result<()> {
        self.socket.send(bytes).await?;
        Ok(())
    }

    /// Receives and decodes one datagram.
    ///
    /// The outer error is a socket failure and should be treated as fatal;
    /// the inner one only concerns this datagram.
    pub async fn recv_packet(&self) -> io::Result<(SocketAddr, Result<Packet, ProtocolError>)> {
        let (addr, bytes) = self.receive().await?;
        let packet = protocol::decode(&bytes).map(|(_, packet)| packet);
        Ok((addr, packet))
    }

    pub async fn send_packet_to(
        &self,
        addr: SocketAddr,
        packet: &Packet,
    ) -> Result<(), TransportError> {
        let bytes = protocol::encode(packet)?;
        self.send_to(addr, &bytes).await?;
        Ok(())
    }

    pub async fn send_packet(&self, packet: &Packet) -> Result<(), TransportError> {
        let bytes = protocol::encode(packet)?;
        self.send(&bytes).await?;
        Ok(())
    }
}

/// Failure while sending a packet.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
