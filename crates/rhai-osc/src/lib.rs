//! OSC (Open Sound Control) bridge for Rhai scripts.
//!
//! Lets embedded Rhai code both receive OSC messages (listening endpoint
//! with a background receiver thread) and send them (UDP client), with OSC
//! arguments transparently converted to and from Rhai values:
//!
//! - **Codec** - argument marshaling between OSC wire types and `Dynamic`
//! - **Client** - remote addresses and synchronous, fire-and-forget sends
//! - **Server** - listening endpoints with a per-endpoint dispatch table
//! - **Bridge** - safe invocation of script callbacks from listener threads
//! - **API** - the `osc_listen` / `osc_address` / `add_method` / `send`
//!   functions registered on a Rhai engine
//!
//! # Architecture
//!
//! Endpoint and address handles are cheap clones stored inside `Dynamic`
//! values; when the script runtime releases the last reference, the native
//! resource is torn down (for an endpoint: the listener thread is stopped
//! and joined). Incoming messages are matched by exact path and type
//! signature, then delivered through the installed [`ScriptContext`] - the
//! one gate that makes script invocation safe from threads the bridge does
//! not own.

pub mod api;
pub mod bridge;
pub mod client;
pub mod codec;
pub mod error;
pub mod server;
pub mod url;

pub use bridge::ScriptContext;
pub use client::OscAddress;
pub use error::BridgeError;
pub use server::{OscMethod, OscServer};
