//! Handshake bookkeeping and play-field tiling.
//!
//! Clients join in arrival order until one reports itself as the last. Their
//! windows are then laid side by side, left to right, to form a single wide
//! field whose height is the smallest window height. The two edge clients
//! control the two paddles.

use log::{info, warn};
use shared::{PaddleSide, ViewSettings, WindowSettings};
use std::net::SocketAddr;

/// A client that completed the handshake. Entries are never removed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConnection {
    pub addr: SocketAddr,
    pub window: WindowSettings,
    /// Zeroed until [`ClientManager::assign_views`] runs.
    pub view: ViewSettings,
}

#[derive(Debug, Default)]
pub struct ClientManager {
    clients: Vec<ClientConnection>,
    closed: bool,
}

impl ClientManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a handshake and returns whether registration is now closed.
    ///
    /// Handshakes arriving after the last client are ignored; the layout is
    /// computed once and never revisited.
    pub fn register_client(&mut self, window: WindowSettings, addr: SocketAddr) -> bool {
        if self.closed {
            warn!("Ignoring handshake from {} after registration closed", addr);
            return true;
        }

        info!(
            "Client {} registered from {} ({}x{})",
            self.clients.len(),
            addr,
            window.width,
            window.height
        );
        self.clients.push(ClientConnection {
            addr,
            window,
            view: ViewSettings::default(),
        });

        if window.is_last_client {
            info!("Last client registered, {} in total", self.clients.len());
            self.closed = true;
        }

        self.closed
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Runs the layout over every registered client and stores the result.
    pub fn assign_views(&mut self) {
        let windows: Vec<WindowSettings> = self.clients.iter().map(|c| c.window).collect();
        for (client, view) in self.clients.iter_mut().zip(compute_layout(&windows)) {
            client.view = view;
        }
    }

    /// Dimensions of the shared play-field as `(width, height)`.
    pub fn play_field(&self) -> Option<(i32, i32)> {
        self.clients
            .first()
            .map(|client| (client.view.width, client.view.height))
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<&ClientConnection> {
        self.clients.iter().find(|client| client.addr == addr)
    }

    pub fn clients(&self) -> &[ClientConnection] {
        &self.clients
    }

    pub fn client_addrs(&self) -> impl Iterator<Item = SocketAddr> + '_ {
        self.clients.iter().map(|client| client.addr)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Tiles windows horizontally in the given order.
///
/// Every view shares the smallest height and the summed width. The first
/// window controls the left paddle and the last the right one; a lone
/// window keeps the left paddle.
pub fn compute_layout(windows: &[WindowSettings]) -> Vec<ViewSettings> {
    let shared_height = windows.iter().map(|w| w.height).min().unwrap_or(0);
    let combined_width: i32 = windows.iter().map(|w| w.width).sum();

    let mut x_offset = 0;
    let mut views: Vec<ViewSettings> = windows
        .iter()
        .map(|window| {
            let view = ViewSettings {
                x_offset,
                height: shared_height,
                width: combined_width,
                controlled_paddle: PaddleSide::None,
            };
            x_offset += window.width;
            view
        })
        .collect();

    if let Some(last) = views.last_mut() {
        last.controlled_paddle = PaddleSide::Right;
    }
    if let Some(first) = views.first_mut() {
        first.controlled_paddle = PaddleSide::Left;
    }

    views
}
