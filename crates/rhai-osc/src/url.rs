//! Endpoint specifier parsing.
//!
//! Endpoints are named either by a bare port number (`"7770"`) or by a full
//! OSC URL (`"osc.udp://host:7770/"`). Only the UDP transport is supported.

use crate::error::{BridgeError, Result};

/// Parse an endpoint spec into an optional host and a port.
///
/// The bare-port form returns no host; the caller picks a default (all
/// interfaces for a listener, loopback for a remote address). Port 0 is
/// allowed and means an ephemeral port when binding.
pub fn parse_spec(spec: &str) -> Result<(Option<String>, u16)> {
    if !spec.is_empty() && spec.bytes().all(|b| b.is_ascii_digit()) {
        let port = spec.parse::<u16>().map_err(|_| BridgeError::InvalidSpec {
            spec: spec.into(),
            reason: "port out of range".into(),
        })?;
        return Ok((None, port));
    }

    let rest = match spec.strip_prefix("osc.udp://") {
        Some(rest) => rest,
        None => {
            let reason = if spec.starts_with("osc.") && !spec.starts_with("osc.udp") {
                "only the osc.udp transport is supported"
            } else {
                "expected a bare port number or an osc.udp://host:port/ URL"
            };
            return Err(BridgeError::InvalidSpec {
                spec: spec.into(),
                reason: reason.into(),
            });
        }
    };

    let rest = rest.trim_end_matches('/');
    let (host, port) = rest.rsplit_once(':').ok_or_else(|| BridgeError::InvalidSpec {
        spec: spec.into(),
        reason: "missing port".into(),
    })?;
    if host.is_empty() {
        return Err(BridgeError::InvalidSpec {
            spec: spec.into(),
            reason: "missing host".into(),
        });
    }
    let port = port.parse::<u16>().map_err(|_| BridgeError::InvalidSpec {
        spec: spec.into(),
        reason: format!("invalid port '{}'", port),
    })?;
    Ok((Some(host.to_string()), port))
}
