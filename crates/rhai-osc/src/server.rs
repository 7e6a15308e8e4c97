//! Listening endpoint with a background receiver thread.
//!
//! Each [`OscServer`] owns one UDP socket and one listener thread, started
//! as part of construction. Incoming messages are matched against the
//! registered methods by exact path and exact type signature; the first
//! registered match wins and consumes the message. Matching messages are
//! handed to the callback bridge on the listener thread itself, so
//! callbacks for one endpoint run strictly in arrival order.

use crate::bridge::{self, RawDispatch};
use crate::codec;
use crate::error::BridgeError;
use crate::url;
use anyhow::Result;
use rhai::FnPtr;
use rosc::{OscMessage, OscPacket};
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often the listener thread rechecks the shutdown flag.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// One (path, signature) to callback binding.
///
/// The stored callback is the strong reference that keeps the script
/// callable alive for the lifetime of the endpoint; there is no
/// unregistration operation.
struct MethodEntry {
    path: String,
    types: String,
    callback: FnPtr,
}

/// A bound, actively listening OSC receiver.
///
/// Cheap to clone. When the last clone is released (by the script runtime
/// or the host), the listener thread is stopped and joined, so an in-flight
/// callback finishes before teardown completes and no callback runs
/// afterwards. Because teardown joins the listener thread, a server handle
/// must not be dropped from inside one of its own callbacks.
#[derive(Clone)]
pub struct OscServer {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    port: u16,
    methods: Arc<RwLock<Vec<MethodEntry>>>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for ServerInner {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl OscServer {
    /// Bind a listening endpoint and start its receiver thread.
    ///
    /// The spec is a bare port (bound on all interfaces) or an
    /// `osc.udp://host:port/` URL (bound on the given host). Port 0 binds
    /// an ephemeral port; see [`port`](Self::port). The thread is running
    /// before this returns.
    pub fn bind(spec: &str) -> Result<Self> {
        let (host, port) = url::parse_spec(spec)?;
        let host = host.unwrap_or_else(|| "0.0.0.0".to_string());
        let sock = UdpSocket::bind((host.as_str(), port))?;
        sock.set_read_timeout(Some(RECV_TIMEOUT))?;
        let port = sock.local_addr()?.port();

        let methods = Arc::new(RwLock::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let thread_methods = methods.clone();
        let thread_shutdown = shutdown.clone();
        let thread = thread::spawn(move || {
            listen_loop(sock, thread_methods, thread_shutdown);
        });

        log::info!("[OSC] listening on port {}", port);
        Ok(Self {
            inner: Arc::new(ServerInner {
                port,
                methods,
                shutdown,
                thread: Some(thread),
            }),
        })
    }

    /// The port the endpoint is actually bound to.
    pub fn port(&self) -> u16 {
        self.inner.port
    }

    /// Bind a callback to a (path, type signature) pair.
    ///
    /// The signature is validated and canonicalized (see
    /// [`codec::canonical_signature`]); an empty signature registers a
    /// zero-argument method. The callback is pinned for the lifetime of
    /// the endpoint. Bindings with distinct (path, signature) pairs are
    /// independent; for duplicates the earlier registration wins.
    pub fn add_method(
        &self,
        path: &str,
        types: &str,
        callback: FnPtr,
    ) -> std::result::Result<OscMethod, BridgeError> {
        let types = codec::canonical_signature(types)?;
        let method = OscMethod {
            path: path.to_string(),
            types: types.clone(),
        };
        self.inner.methods.write().unwrap().push(MethodEntry {
            path: path.to_string(),
            types,
            callback,
        });
        Ok(method)
    }
}

impl std::fmt::Debug for OscServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OscServer")
            .field("port", &self.inner.port)
            .finish_non_exhaustive()
    }
}

/// Handle for one registered method.
///
/// Purely descriptive: the binding itself lives (and stays pinned) inside
/// its endpoint and cannot be removed before the endpoint goes away.
#[derive(Clone, Debug)]
pub struct OscMethod {
    path: String,
    types: String,
}

impl OscMethod {
    /// The path this method is bound to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The canonical type signature this method is bound to.
    pub fn types(&self) -> &str {
        &self.types
    }
}

fn listen_loop(
    sock: UdpSocket,
    methods: Arc<RwLock<Vec<MethodEntry>>>,
    shutdown: Arc<AtomicBool>,
) {
    let mut buf = [0u8; 65536];
    while !shutdown.load(Ordering::Relaxed) {
        let (size, peer) = match sock.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
            Err(e) => {
                log::error!("[OSC] receive error: {}", e);
                continue;
            }
        };
        match rosc::decoder::decode_udp(&buf[..size]) {
            Ok((_, packet)) => dispatch_packet(&methods, packet),
            Err(e) => log::warn!("[OSC] undecodable packet from {}: {}", peer, e),
        }
    }
}

fn dispatch_packet(methods: &RwLock<Vec<MethodEntry>>, packet: OscPacket) {
    match packet {
        OscPacket::Message(msg) => dispatch_message(methods, &msg),
        OscPacket::Bundle(bundle) => {
            // Bundle contents dispatch immediately; timetags are not honored.
            for packet in bundle.content {
                dispatch_packet(methods, packet);
            }
        }
    }
}

fn dispatch_message(methods: &RwLock<Vec<MethodEntry>>, msg: &OscMessage) {
    let types = match codec::signature_of(&msg.args) {
        Ok(types) => types,
        Err(e) => {
            log::warn!("[OSC] dropping message for {}: {}", msg.addr, e);
            return;
        }
    };

    // Drop the table lock before the callback runs, so a callback may
    // register further methods without deadlocking.
    let callback = {
        let table = methods.read().unwrap();
        table
            .iter()
            .find(|m| m.path == msg.addr && m.types == types)
            .map(|m| m.callback.clone())
    };

    match callback {
        Some(callback) => bridge::dispatch(
            RawDispatch {
                path: &msg.addr,
                types: &types,
                args: &msg.args,
            },
            &callback,
        ),
        None => log::debug!("[OSC] no method for {} ({})", msg.addr, types),
    }
}
