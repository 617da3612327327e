//! Callback channels between the page and the driver
//!
//! The driver exposes named functions into the page's global scope; the page
//! calls them by name when the form reports an event. A missing name is a
//! silent no-op.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, trace};
use serde_json::{Map, Value};

use crate::launcher::LaunchTarget;

/// A driver-side function callable from inside the page.
pub type ExposedFn = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Name the page calls once its entry point is ready for a config.
pub const LAUNCHER_READY: &str = "launcherReady";

/// Message passed to `launcherReady`.
pub const AWAIT_MSG: &str = "SYSTEM_LAUNCHER_READY";

/// Outbound event kinds reported by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Focus,
    Blur,
    Change,
    Click,
    Invalid,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Focus,
        Channel::Blur,
        Channel::Change,
        Channel::Click,
        Channel::Invalid,
    ];

    /// Global name the driver exposes for this channel.
    pub fn exposed_name(self) -> &'static str {
        match self {
            Channel::Focus => "oneFocus",
            Channel::Blur => "oneBlur",
            Channel::Change => "oneChange",
            Channel::Click => "oneClick",
            Channel::Invalid => "oneInvalid",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.exposed_name())
    }
}

/// An argument produced by the form for an outbound callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    /// A function handle. Functions cannot leave the page.
    Function,
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Value(Value::String(value.to_string()))
    }
}

impl From<Map<String, Value>> for Arg {
    fn from(value: Map<String, Value>) -> Self {
        Arg::Value(Value::Object(value))
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Value(Value::Bool(value))
    }
}

/// Replace function-valued arguments with `null`.
pub fn strip_functions(args: Vec<Arg>) -> Vec<Value> {
    args.into_iter()
        .map(|arg| match arg {
            Arg::Value(v) => v,
            Arg::Function => Value::Null,
        })
        .collect()
}

/// The page's global scope: exposed functions and the launch target slot.
#[derive(Default)]
pub struct Globals {
    functions: RwLock<HashMap<String, ExposedFn>>,
    launch_target: RwLock<Option<LaunchTarget>>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` under `name`, replacing any earlier registration.
    pub fn expose(&self, name: &str, f: ExposedFn) {
        let mut map = self.functions.write().unwrap_or_else(PoisonError::into_inner);
        if map.insert(name.to_string(), f).is_some() {
            debug!("replaced exposed function {}", name);
        }
    }

    pub fn is_exposed(&self, name: &str) -> bool {
        self.functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Call `name` if it is exposed. Returns whether anything was called.
    pub fn invoke(&self, name: &str, args: &[Value]) -> bool {
        // Clone out of the lock so the callback may expose further functions.
        let f = self
            .functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        match f {
            Some(f) => {
                f(args);
                true
            }
            None => {
                trace!("{} not exposed, dropping call", name);
                false
            }
        }
    }

    pub fn attach_launch_target(&self, target: LaunchTarget) {
        *self
            .launch_target
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(target);
    }

    pub fn detach_launch_target(&self) {
        *self
            .launch_target
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn launch_target(&self) -> Option<LaunchTarget> {
        self.launch_target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Event sink handed to the renderer at mount time.
#[derive(Clone)]
pub struct FormEvents {
    globals: Arc<Globals>,
}

impl FormEvents {
    pub fn new(globals: Arc<Globals>) -> Self {
        Self { globals }
    }

    /// Forward an event to its exposed channel, if there is one.
    pub fn emit(&self, channel: Channel, args: Vec<Arg>) -> bool {
        let params = strip_functions(args);
        self.globals.invoke(channel.exposed_name(), &params)
    }

    pub fn focus(&self, name: &str, data: &Map<String, Value>) {
        self.emit(Channel::Focus, vec![name.into(), data.clone().into()]);
    }

    pub fn blur(&self, name: &str, data: &Map<String, Value>) {
        self.emit(Channel::Blur, vec![name.into(), data.clone().into()]);
    }

    pub fn change(&self, data: &Map<String, Value>, initial: bool) {
        self.emit(Channel::Change, vec![data.clone().into(), initial.into()]);
    }

    pub fn invalid(&self, name: &str, msg: &str, payload: &Map<String, Value>) {
        self.emit(
            Channel::Invalid,
            vec![name.into(), msg.into(), payload.clone().into()],
        );
    }

    /// Button click: `(name, event, data, payload, onValueChange, onChange)`.
    pub fn click(&self, name: &str, data: &Map<String, Value>, payload: &Map<String, Value>) {
        self.emit(
            Channel::Click,
            vec![
                name.into(),
                Arg::Function,
                data.clone().into(),
                payload.clone().into(),
                Arg::Function,
                Arg::Function,
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn missing_channel_is_a_noop() {
        let events = FormEvents::new(Arc::new(Globals::new()));
        assert!(!events.emit(Channel::Change, vec![json!({}).into()]));
    }

    #[test]
    fn functions_are_stripped_before_forwarding() {
        let globals = Arc::new(Globals::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        globals.expose(
            "oneClick",
            Arc::new(move |args: &[Value]| sink.lock().unwrap().extend_from_slice(args)),
        );
        let events = FormEvents::new(globals);
        events.click("btn", &Map::new(), &Map::new());
        let args = seen.lock().unwrap();
        assert_eq!(args.len(), 6);
        assert_eq!(args[0], json!("btn"));
        assert_eq!(args[1], Value::Null);
        assert_eq!(args[5], Value::Null);
    }

    #[test]
    fn expose_replaces() {
        let globals = Globals::new();
        let hits = Arc::new(Mutex::new(0));
        let first = hits.clone();
        let second = hits.clone();
        globals.expose("f", Arc::new(move |_: &[Value]| *first.lock().unwrap() += 100));
        globals.expose("f", Arc::new(move |_: &[Value]| *second.lock().unwrap() += 1));
        assert!(globals.invoke("f", &[]));
        assert_eq!(*hits.lock().unwrap(), 1);
    }
}
