//! Outgoing OSC messages to a remote address.

use crate::codec;
use crate::url;
use anyhow::Result;
use rhai::Dynamic;
use rosc::{encoder, OscPacket};
use std::net::UdpSocket;
use std::sync::Arc;

/// A resolved destination for outgoing OSC messages.
///
/// Cheap to clone; the underlying socket closes when the last clone is
/// released by the script runtime or the host.
#[derive(Clone)]
pub struct OscAddress {
    /// Local socket the messages are sent from.
    sock: Arc<UdpSocket>,
    /// Target address in "host:port" format, resolved at send time.
    target: String,
}

impl OscAddress {
    /// Open a remote address from a bare port (loopback) or an
    /// `osc.udp://host:port/` URL.
    pub fn open(spec: &str) -> Result<Self> {
        let (host, port) = url::parse_spec(spec)?;
        let host = host.unwrap_or_else(|| "127.0.0.1".to_string());
        let sock = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self {
            sock: Arc::new(sock),
            target: format!("{}:{}", host, port),
        })
    }

    /// The "host:port" string messages are addressed to.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Build a message from the given arguments and transmit it.
    ///
    /// Arguments with no OSC representation are skipped (see
    /// [`codec::encode_arg`]); the remaining arguments are sent in order.
    /// Returns once the datagram has been handed to the transport; delivery
    /// is unacknowledged.
    pub fn send(&self, path: &str, args: &[Dynamic]) -> Result<()> {
        let msg = codec::build_message(path, args);
        let buf = encoder::encode(&OscPacket::Message(msg))?;
        self.sock.send_to(&buf, &self.target)?;
        Ok(())
    }
}

impl std::fmt::Debug for OscAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OscAddress")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
