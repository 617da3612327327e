//! Launching a schema into a page and wiring its callbacks.

use std::sync::Arc;

use log::{info, warn};
use serde_json::{json, Map, Value};

use super::ready::{wait_for_launch_target, wait_for_ready};
use super::retry::retry;
use crate::channel::{Channel, ExposedFn};
use crate::codec;
use crate::gate::ReadinessGate;
use crate::launcher::WireConfig;
use crate::locator::{Locator, WaitState};
use crate::page::Page;
use crate::renderer::READY_TEST_ID;
use crate::schema::FieldNode;
use crate::Result;

type Object = Map<String, Value>;

fn object_at(args: &[Value], i: usize) -> Object {
    args.get(i)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn str_at(args: &[Value], i: usize) -> &str {
    args.get(i).and_then(Value::as_str).unwrap_or_default()
}

/// Driver-side handlers for the form's outbound channels.
///
/// The default logs focus, blur and change events and leaves click and
/// invalid unhandled.
#[derive(Clone)]
pub struct Callbacks {
    handlers: Vec<(Channel, Option<ExposedFn>)>,
}

impl Default for Callbacks {
    fn default() -> Self {
        Self::logging()
    }
}

impl Callbacks {
    /// No handlers at all.
    pub fn none() -> Self {
        Self {
            handlers: Channel::ALL.iter().map(|c| (*c, None)).collect(),
        }
    }

    pub fn logging() -> Self {
        Self::none()
            .on_focus(|name, data| info!("{}", json!({"type": "focus", "name": name, "data": data})))
            .on_blur(|name, data| info!("{}", json!({"type": "blur", "name": name, "data": data})))
            .on_change(|data, initial| {
                info!("{}", json!({"type": "change", "data": data, "initial": initial}))
            })
    }

    /// Install a raw handler receiving the channel's arguments as sent.
    pub fn set(mut self, channel: Channel, f: ExposedFn) -> Self {
        for slot in &mut self.handlers {
            if slot.0 == channel {
                slot.1 = Some(f);
                return self;
            }
        }
        self.handlers.push((channel, Some(f)));
        self
    }

    pub fn get(&self, channel: Channel) -> Option<&ExposedFn> {
        self.handlers
            .iter()
            .find(|(c, _)| *c == channel)
            .and_then(|(_, f)| f.as_ref())
    }

    pub fn on_focus<F>(self, f: F) -> Self
    where
        F: Fn(&str, &Object) + Send + Sync + 'static,
    {
        self.set(
            Channel::Focus,
            Arc::new(move |args: &[Value]| f(str_at(args, 0), &object_at(args, 1))),
        )
    }

    pub fn on_blur<F>(self, f: F) -> Self
    where
        F: Fn(&str, &Object) + Send + Sync + 'static,
    {
        self.set(
            Channel::Blur,
            Arc::new(move |args: &[Value]| f(str_at(args, 0), &object_at(args, 1))),
        )
    }

    /// `f(data, initial)`
    pub fn on_change<F>(self, f: F) -> Self
    where
        F: Fn(&Object, bool) + Send + Sync + 'static,
    {
        self.set(
            Channel::Change,
            Arc::new(move |args: &[Value]| {
                let initial = args.get(1).and_then(Value::as_bool).unwrap_or(false);
                f(&object_at(args, 0), initial)
            }),
        )
    }

    /// `f(name, data, payload)`; the event and the two setter handles the
    /// form passes are dropped at the page boundary.
    pub fn on_click<F>(self, f: F) -> Self
    where
        F: Fn(&str, &Object, &Object) + Send + Sync + 'static,
    {
        self.set(
            Channel::Click,
            Arc::new(move |args: &[Value]| {
                f(str_at(args, 0), &object_at(args, 2), &object_at(args, 3))
            }),
        )
    }

    /// `f(name, message, payload)`
    pub fn on_invalid<F>(self, f: F) -> Self
    where
        F: Fn(&str, &str, &Object) + Send + Sync + 'static,
    {
        self.set(
            Channel::Invalid,
            Arc::new(move |args: &[Value]| f(str_at(args, 0), str_at(args, 1), &object_at(args, 2))),
        )
    }
}

/// Initial data, payload and callbacks for a rendered form.
#[derive(Clone, Default)]
pub struct RenderOptions {
    pub data: Object,
    pub payload: Object,
    pub callbacks: Callbacks,
}

fn into_object(value: Value, what: &str) -> Object {
    match value {
        Value::Object(map) => map,
        Value::Null => Object::new(),
        other => {
            warn!("{} must be an object, ignoring {}", what, other);
            Object::new()
        }
    }
}

impl RenderOptions {
    pub fn data(mut self, data: Value) -> Self {
        self.data = into_object(data, "data");
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = into_object(payload, "payload");
        self
    }

    pub fn callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn on_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&Object, bool) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.on_change(f);
        self
    }

    pub fn on_click<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &Object, &Object) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.on_click(f);
        self
    }

    pub fn on_invalid<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str, &Object) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.on_invalid(f);
        self
    }

    pub fn on_focus<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &Object) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.on_focus(f);
        self
    }

    pub fn on_blur<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &Object) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.on_blur(f);
        self
    }
}

/// Launch `fields` into an already loaded harness page and wait for the
/// form to mount. Returns a locator for the form root.
///
/// Callbacks are exposed before the launch so no event is missed. The
/// caller's schema is left untouched.
pub async fn render_fields(page: &Page, fields: &[FieldNode], options: &RenderOptions) -> Result<Locator> {
    let wire = WireConfig {
        fields: codec::encode_fields(fields)?,
        data: options.data.clone(),
        payload: options.payload.clone(),
    };
    for channel in Channel::ALL {
        if let Some(f) = options.callbacks.get(channel) {
            page.expose_shared(channel.exposed_name(), f.clone());
        }
    }

    let gate = ReadinessGate::from_config(page.config());
    let target = wait_for_launch_target(page, &gate).await?;
    target.launch(wire).await?;

    let root = page.get_by_test_id(READY_TEST_ID);
    root.wait_for(WaitState::Visible).await?;
    Ok(root)
}

/// Load the host fresh and render `fields`, retrying the whole sequence up
/// to the configured retry count.
pub async fn launch_fields(page: &Page, fields: &[FieldNode], options: &RenderOptions) -> Result<Locator> {
    retry(page.config().retry_count, move || async move {
        wait_for_ready(page).await?;
        render_fields(page, fields, options).await
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn click_adapter_skips_function_slots() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let callbacks = Callbacks::none().on_click(move |name, data, payload| {
            *sink.lock().unwrap() = Some((name.to_string(), data.clone(), payload.clone()));
        });
        let f = callbacks.get(Channel::Click).unwrap();
        f(&[
            json!("btn"),
            Value::Null,
            json!({"a": 1}),
            json!({"p": true}),
            Value::Null,
            Value::Null,
        ]);
        let (name, data, payload) = seen.lock().unwrap().take().unwrap();
        assert_eq!(name, "btn");
        assert_eq!(Value::Object(data), json!({"a": 1}));
        assert_eq!(Value::Object(payload), json!({"p": true}));
    }

    #[test]
    fn default_callbacks_leave_click_unhandled() {
        let callbacks = Callbacks::default();
        assert!(callbacks.get(Channel::Change).is_some());
        assert!(callbacks.get(Channel::Click).is_none());
        assert!(callbacks.get(Channel::Invalid).is_none());
    }

    #[test]
    fn non_object_data_is_ignored() {
        let options = RenderOptions::default().data(json!([1, 2]));
        assert!(options.data.is_empty());
    }
}
