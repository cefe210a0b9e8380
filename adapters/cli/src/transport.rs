//! Socket-backed delivery and the UDP command listener.

use std::{
    io::ErrorKind,
    net::{Ipv4Addr, UdpSocket},
};

use anyhow::{Context, Result};
use orca_system_io::{Transport, TransportError};
use tracing::{debug, info, warn};

/// Largest command datagram read by the listener.
const DATAGRAM_CAPACITY: usize = 1024;

/// Delivers datagrams over UDP and writes MIDI bytes to the log.
///
/// Without a socket the transport runs dry and only logs what it would send.
#[derive(Debug)]
pub(crate) struct NetTransport {
    socket: Option<UdpSocket>,
}

impl NetTransport {
    /// Binds an ephemeral socket for outbound datagrams.
    pub(crate) fn connected() -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .context("failed to bind outbound udp socket")?;
        Ok(Self {
            socket: Some(socket),
        })
    }

    /// Transport that logs instead of sending.
    pub(crate) const fn dry() -> Self {
        Self { socket: None }
    }
}

impl Transport for NetTransport {
    fn send_midi(&mut self, device: usize, bytes: &[u8]) -> Result<(), TransportError> {
        info!(device, ?bytes, "midi");
        Ok(())
    }

    fn send_datagram(&mut self, host: &str, port: u16, bytes: &[u8]) -> Result<(), TransportError> {
        match &self.socket {
            Some(socket) => {
                let sent = socket.send_to(bytes, (host, port))?;
                debug!(host, port, sent, "datagram sent");
            }
            None => info!(host, port, len = bytes.len(), "datagram"),
        }
        Ok(())
    }
}

/// Non-blocking UDP socket receiving `name:value` command messages.
#[derive(Debug)]
pub(crate) struct Listener {
    socket: UdpSocket,
    port: u16,
}

impl Listener {
    pub(crate) fn bind(port: u16) -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
            .with_context(|| format!("failed to listen on udp port {port}"))?;
        socket
            .set_nonblocking(true)
            .context("failed to make the listener non-blocking")?;
        info!(port, "listening for commands");
        Ok(Self { socket, port })
    }

    pub(crate) const fn port(&self) -> u16 {
        self.port
    }

    /// Returns every message received since the last call.
    pub(crate) fn drain(&mut self) -> Vec<String> {
        let mut buffer = [0_u8; DATAGRAM_CAPACITY];
        let mut messages = Vec::new();
        loop {
            match self.socket.recv_from(&mut buffer) {
                Ok((len, from)) => {
                    let message = String::from_utf8_lossy(&buffer[..len]).trim().to_owned();
                    debug!(%from, %message, "command received");
                    if !message.is_empty() {
                        messages.push(message);
                    }
                }
                Err(error) if error.kind() == ErrorKind::WouldBlock => break,
                Err(error) => {
                    warn!(%error, "listener read failed");
                    break;
                }
            }
        }
        messages
    }
}
