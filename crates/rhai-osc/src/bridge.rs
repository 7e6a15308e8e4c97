//! Safe delivery of incoming messages to script callbacks.
//!
//! The listener thread that receives OSC messages is a plain native thread;
//! it is not evaluating a script and must not build or touch script values
//! on its own. Everything script-side goes through [`ScriptContext::enter`],
//! the single serialization point: entering blocks until the context is
//! free, and a thread that is already inside re-enters immediately. Before
//! that point a dispatch works on plain wire data only.
//!
//! Faults inside a dispatch (an undecodable argument, a script error raised
//! by the callback) are logged and contained here. Nothing unwinds back
//! into the listener loop, and the message always counts as handled.

use crate::codec;
use rhai::{Dynamic, Engine, FnPtr, AST};
use std::cell::Cell;
use std::sync::{Arc, LazyLock, Mutex, RwLock};

/// The process-wide installed context, if any.
static INSTALLED: LazyLock<RwLock<Option<ScriptContext>>> =
    LazyLock::new(|| RwLock::new(None));

thread_local! {
    /// Whether the current thread is already inside [`ScriptContext::enter`].
    static IN_CONTEXT: Cell<bool> = const { Cell::new(false) };
}

/// The evaluation state a native thread needs to invoke script callables:
/// the engine the script's functions were registered on and the AST they
/// were compiled into.
///
/// Cloning is cheap; all clones share one entry gate.
#[derive(Clone)]
pub struct ScriptContext {
    engine: Arc<Engine>,
    ast: Arc<AST>,
    /// Entry gate serializing context use across native threads.
    gate: Arc<Mutex<()>>,
}

impl ScriptContext {
    /// Wrap an engine and a compiled script into a shareable context.
    pub fn new(engine: Arc<Engine>, ast: Arc<AST>) -> Self {
        Self {
            engine,
            ast,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Make this context the one incoming messages are delivered to.
    ///
    /// Replaces any previously installed context. Endpoints created before
    /// the install start delivering once it is in place; messages arriving
    /// while no context is installed are dropped with a warning.
    pub fn install(self) {
        INSTALLED.write().unwrap().replace(self);
    }

    /// Remove the installed context. Subsequent messages are dropped until
    /// another context is installed.
    pub fn uninstall() {
        INSTALLED.write().unwrap().take();
    }

    /// The currently installed context, if any.
    pub fn current() -> Option<ScriptContext> {
        INSTALLED.read().unwrap().clone()
    }

    /// Run `f` inside the context.
    ///
    /// Blocks until the context is free. Safe to call from any native
    /// thread, and re-entrant: a thread already inside the context proceeds
    /// immediately instead of deadlocking on the gate.
    pub fn enter<R>(&self, f: impl FnOnce(&Engine, &AST) -> R) -> R {
        let outermost = !IN_CONTEXT.with(|c| c.get());
        let _gate = if outermost {
            Some(self.gate.lock().unwrap())
        } else {
            None
        };
        IN_CONTEXT.with(|c| c.set(true));
        let result = f(&self.engine, &self.ast);
        IN_CONTEXT.with(|c| c.set(!outermost));
        result
    }
}

impl std::fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptContext").finish_non_exhaustive()
    }
}

/// The raw materials of one incoming call, captured on the listener thread
/// before any script value exists.
pub struct RawDispatch<'a> {
    /// Destination path of the message.
    pub path: &'a str,
    /// Type signature the dispatch table matched on.
    pub types: &'a str,
    /// Wire arguments, still undecoded.
    pub args: &'a [rosc::OscType],
}

/// Deliver one matched message to its callback.
///
/// Enters the installed context, decodes the arguments in wire order and
/// invokes the callback with exactly one script value per wire argument
/// (zero arguments is a valid call). If any argument fails to decode the
/// callback is not invoked at all. Always returns normally so the listener
/// thread treats the message as handled.
pub fn dispatch(raw: RawDispatch<'_>, callback: &FnPtr) {
    let Some(ctx) = ScriptContext::current() else {
        log::warn!(
            "[OSC] no script context installed, dropping message for {} ({})",
            raw.path,
            raw.types
        );
        return;
    };

    ctx.enter(|engine, ast| {
        let mut decoded = Vec::with_capacity(raw.args.len());
        for arg in raw.args {
            match codec::decode_arg(arg) {
                Ok(value) => decoded.push(value),
                Err(e) => {
                    log::error!(
                        "[OSC] cannot decode argument for {} ({}): {}",
                        raw.path,
                        raw.types,
                        e
                    );
                    return;
                }
            }
        }

        if let Err(e) = callback.call::<Dynamic>(engine, ast, decoded) {
            log::error!("[OSC] callback for {} ({}) failed: {}", raw.path, raw.types, e);
        }
    });
}

#[cfg(test)]
pub(crate) static CONTEXT_TEST_LOCK: Mutex<()> = Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn empty_context() -> ScriptContext {
        let engine = Engine::new();
        let ast = engine.compile("").unwrap();
        ScriptContext::new(Arc::new(engine), Arc::new(ast))
    }

    #[test]
    fn test_enter_is_reentrant() {
        let ctx = empty_context();
        let value = ctx.enter(|_, _| ctx.enter(|_, _| 7));
        assert_eq!(value, 7);
    }

    #[test]
    fn test_enter_from_multiple_threads() {
        let ctx = empty_context();
        let other = ctx.clone();
        let handle = std::thread::spawn(move || {
            other.enter(|_, _| {
                std::thread::sleep(Duration::from_millis(20));
                1
            })
        });
        let local = ctx.enter(|_, _| 2);
        assert_eq!(handle.join().unwrap(), 1);
        assert_eq!(local, 2);
    }

    #[test]
    fn test_dispatch_without_context_is_dropped() {
        let _guard = CONTEXT_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        ScriptContext::uninstall();

        let callback = FnPtr::new("nobody").unwrap();
        dispatch(
            RawDispatch {
                path: "/x",
                types: "",
                args: &[],
            },
            &callback,
        );
    }

    #[test]
    fn test_dispatch_aborts_on_decode_failure() {
        let _guard = CONTEXT_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut engine = Engine::new();
        engine.register_fn("mark", move |v: i64| {
            let _ = tx.send(v);
        });
        let ast = engine
            .compile("fn on_value(v) { mark(v); }")
            .unwrap();
        ScriptContext::new(Arc::new(engine), Arc::new(ast)).install();

        let callback = FnPtr::new("on_value").unwrap();

        // Blob argument: the callback must not run at all.
        dispatch(
            RawDispatch {
                path: "/x",
                types: "i",
                args: &[rosc::OscType::Int(1), rosc::OscType::Blob(vec![0])],
            },
            &callback,
        );
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        // A clean message still goes through afterwards.
        dispatch(
            RawDispatch {
                path: "/x",
                types: "i",
                args: &[rosc::OscType::Int(5)],
            },
            &callback,
        );
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 5);

        ScriptContext::uninstall();
    }
}
