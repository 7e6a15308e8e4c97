//! Rhai bindings for the OSC bridge.
//!
//! Registers the script-facing entry points:
//!
//! ```rhai
//! let srv = osc_listen("7770");
//! srv.add_method("/fader", "if", |idx, level| print(`${idx} -> ${level}`));
//!
//! let out = osc_address("osc.udp://127.0.0.1:57110/");
//! out.send("/s_new", ["default", 1001, 0, 1]);
//! ```
//!
//! Both constructors report failure as a `false` value rather than raising,
//! so scripts can probe for a free port without a try/catch. Send and
//! registration errors are ordinary script errors.

use crate::bridge::ScriptContext;
use crate::client::OscAddress;
use crate::server::{OscMethod, OscServer};
use rhai::{Array, Dynamic, Engine, EvalAltResult, FnPtr, AST};
use std::sync::Arc;

/// Open a listening endpoint, or `false` if the spec is unusable or the
/// port cannot be bound.
fn osc_listen(spec: &str) -> Dynamic {
    match OscServer::bind(spec) {
        Ok(server) => Dynamic::from(server),
        Err(e) => {
            log::error!("[OSC] cannot listen on '{}': {}", spec, e);
            Dynamic::FALSE
        }
    }
}

/// Open a remote address, or `false` if the spec is unusable.
fn osc_address(spec: &str) -> Dynamic {
    match OscAddress::open(spec) {
        Ok(addr) => Dynamic::from(addr),
        Err(e) => {
            log::error!("[OSC] cannot open address '{}': {}", spec, e);
            Dynamic::FALSE
        }
    }
}

fn add_method(
    server: &mut OscServer,
    path: &str,
    types: &str,
    callback: FnPtr,
) -> Result<OscMethod, Box<EvalAltResult>> {
    server
        .add_method(path, types, callback)
        .map_err(|e| Box::new(EvalAltResult::from(e.to_string())) as Box<EvalAltResult>)
}

fn osc_send(addr: &mut OscAddress, path: &str, args: Array) -> Result<(), Box<EvalAltResult>> {
    addr.send(path, &args)
        .map_err(|e| Box::new(EvalAltResult::ErrorSystem("OSC send error".into(), e.into())))
}

fn osc_send_empty(addr: &mut OscAddress, path: &str) -> Result<(), Box<EvalAltResult>> {
    addr.send(path, &[])
        .map_err(|e| Box::new(EvalAltResult::ErrorSystem("OSC send error".into(), e.into())))
}

fn server_port(server: &mut OscServer) -> i64 {
    server.port() as i64
}

fn method_path(method: &mut OscMethod) -> String {
    method.path().to_string()
}

fn method_types(method: &mut OscMethod) -> String {
    method.types().to_string()
}

fn address_target(addr: &mut OscAddress) -> String {
    addr.target().to_string()
}

/// Register the OSC API with a Rhai engine.
pub fn register(engine: &mut Engine) {
    engine.register_type_with_name::<OscServer>("OscServer");
    engine.register_type_with_name::<OscAddress>("OscAddress");
    engine.register_type_with_name::<OscMethod>("OscMethod");

    engine.register_fn("osc_listen", osc_listen);
    engine.register_fn("osc_address", osc_address);

    engine.register_fn("add_method", add_method);
    engine.register_fn("port", server_port);

    engine.register_fn("osc_send", osc_send);
    engine.register_fn("osc_send", osc_send_empty);
    engine.register_fn("send", osc_send);
    engine.register_fn("send", osc_send_empty);
    engine.register_fn("target", address_target);

    engine.register_fn("path", method_path);
    engine.register_fn("types", method_types);
}

/// Compile a script on an engine carrying the OSC API and install the
/// resulting context, so incoming messages can reach the callbacks the
/// script registers when it is run.
///
/// Convenience for hosts that keep one engine and one script; returns the
/// shared handles for running the script and for a later re-install.
pub fn install_script(
    mut engine: Engine,
    script: &str,
) -> Result<(Arc<Engine>, Arc<AST>), Box<EvalAltResult>> {
    register(&mut engine);
    let ast = engine.compile(script)?;
    let engine = Arc::new(engine);
    let ast = Arc::new(ast);
    ScriptContext::new(engine.clone(), ast.clone()).install();
    Ok((engine, ast))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_report_failure_as_value() {
        let listener = osc_listen("just-nonsense");
        assert_eq!(listener.as_bool(), Ok(false));

        let addr = osc_address("osc.tcp://127.0.0.1:9000/");
        assert_eq!(addr.as_bool(), Ok(false));
    }

    #[test]
    fn test_constructors_return_handles() {
        let listener = osc_listen("0");
        assert!(listener.clone().try_cast::<OscServer>().is_some());

        let addr = osc_address("osc.udp://127.0.0.1:9000/");
        assert!(addr.try_cast::<OscAddress>().is_some());
    }
}
