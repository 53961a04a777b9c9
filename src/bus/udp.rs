//! # UDP Text Bus
//!
//! Ground-control bus transport over UDP broadcast.
//!
//! Every bus message is one line of text in one datagram. Outbound messages
//! go to the configured broadcast address; inbound datagrams arrive on the
//! listen port and may carry several newline-separated messages.

use std::net::{Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

use super::gateway::{BusGateway, InboundHandler, Subscriptions};
use super::message::{ControlMessage, MessagePattern};
use crate::error::{Result, StickBridgeError};

/// Largest datagram accepted from the bus.
pub const MAX_DATAGRAM_SIZE: usize = 2048;

/// Suffix of the announcement sent when joining the bus.
pub const READY_SUFFIX: &str = "READY";

/// Bus connection over a broadcast UDP socket.
pub struct UdpTextBus {
    socket: UdpSocket,
    broadcast: SocketAddr,
    application_name: String,
    subscriptions: Subscriptions,
    buf: Vec<u8>,
}

impl std::fmt::Debug for UdpTextBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTextBus")
            .field("broadcast", &self.broadcast)
            .field("application_name", &self.application_name)
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

impl UdpTextBus {
    /// Joins the bus and announces `<application_name> READY`.
    ///
    /// # Arguments
    ///
    /// * `listen_port` - Local port for inbound messages (0 picks any)
    /// * `broadcast` - Destination of every outbound message
    /// * `application_name` - Name used in the ready announcement
    ///
    /// # Errors
    ///
    /// Returns [`StickBridgeError::Bus`] if the socket cannot be bound or
    /// switched to broadcast mode.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use stick_bridge::bus::udp::UdpTextBus;
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() -> anyhow::Result<()> {
    ///     let broadcast = "127.255.255.255:2010".parse()?;
    ///     let bus = UdpTextBus::bind(2010, broadcast, "IvyCtrlJoystick").await?;
    ///     println!("Listening on {}", bus.local_addr()?);
    ///     Ok(())
    /// }
    /// ```
    pub async fn bind(
        listen_port: u16,
        broadcast: SocketAddr,
        application_name: &str,
    ) -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, listen_port))
            .await
            .map_err(|e| {
                StickBridgeError::Bus(format!("Failed to bind port {}: {}", listen_port, e))
            })?;
        socket
            .set_broadcast(true)
            .map_err(|e| StickBridgeError::Bus(format!("Failed to enable broadcast: {}", e)))?;

        let bus = Self {
            socket,
            broadcast,
            application_name: application_name.to_string(),
            subscriptions: Subscriptions::new(),
            buf: vec![0; MAX_DATAGRAM_SIZE],
        };

        bus.send_line(&bus.ready_line());
        info!("Joined bus as {} (broadcast {})", bus.application_name, broadcast);
        Ok(bus)
    }

    /// Announcement sent once after binding.
    pub fn ready_line(&self) -> String {
        format!("{} {}", self.application_name, READY_SUFFIX)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn broadcast_addr(&self) -> SocketAddr {
        self.broadcast
    }

    fn send_line(&self, line: &str) {
        match self.socket.try_send_to(line.as_bytes(), self.broadcast) {
            Ok(len) => trace!("Sent '{}' ({} bytes)", line, len),
            Err(e) => debug!("Failed to send '{}' to {}: {}", line, self.broadcast, e),
        }
    }
}

#[async_trait]
impl BusGateway for UdpTextBus {
    fn publish(&mut self, message: &ControlMessage) {
        self.send_line(&message.to_string());
    }

    fn subscribe(&mut self, pattern: MessagePattern, handler: InboundHandler) {
        debug!("Subscribed to '{}'", pattern);
        self.subscriptions.subscribe(pattern, handler);
    }

    async fn dispatch_next(&mut self) -> Result<usize> {
        let (len, from) = self.socket.recv_from(&mut self.buf).await?;
        let text = String::from_utf8_lossy(&self.buf[..len]);
        trace!("Received {} bytes from {}", len, from);

        let mut invoked = 0;
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            invoked += self.subscriptions.dispatch(line);
        }
        Ok(invoked)
    }
}
