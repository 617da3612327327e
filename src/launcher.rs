//! In-page launch bridge
//!
//! The host entry subscribes to a [`Launcher`] at startup; the driver later
//! hands it a [`WireConfig`] through a [`LaunchTarget`] handle. The config is
//! decoded and published once per page load. Concurrent or repeated launches
//! wait for that single pass and all observe the same result.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{watch, OnceCell};

use crate::codec;
use crate::flatten::deep_flat;
use crate::schema::FieldNode;
use crate::Result;

/// Launch config as transmitted: encoded fields plus plain data and payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    pub fields: Vec<Value>,
    pub data: Map<String, Value>,
    pub payload: Map<String, Value>,
}

/// Decoded launch config, ready for the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchConfig {
    pub fields: Vec<FieldNode>,
    pub data: Map<String, Value>,
    pub payload: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    /// No rendering root has subscribed yet
    Unmounted,
    /// Subscribed, no config published
    AwaitingConfig,
    /// Config published
    Mounted,
}

pub struct Launcher {
    slot: watch::Sender<Option<Arc<LaunchConfig>>>,
    result: OnceCell<Arc<LaunchConfig>>,
    subscribed: AtomicBool,
    runs: AtomicUsize,
}

impl Launcher {
    pub fn new() -> Arc<Self> {
        let (slot, _) = watch::channel(None);
        Arc::new(Self {
            slot,
            result: OnceCell::new(),
            subscribed: AtomicBool::new(false),
            runs: AtomicUsize::new(0),
        })
    }

    pub fn state(&self) -> LaunchState {
        if self.result.initialized() {
            LaunchState::Mounted
        } else if self.subscribed.load(Ordering::Acquire) {
            LaunchState::AwaitingConfig
        } else {
            LaunchState::Unmounted
        }
    }

    /// Called by the rendering root at startup.
    pub fn subscribe(&self) -> Subscription {
        self.subscribed.store(true, Ordering::Release);
        Subscription {
            rx: self.slot.subscribe(),
        }
    }

    /// Decode and publish `config`, or join the pass already in flight.
    pub async fn launch(&self, config: WireConfig) -> Result<Arc<LaunchConfig>> {
        if self.result.initialized() {
            debug!("launch ignored, config already published");
        }
        let published = self
            .result
            .get_or_try_init(|| async move {
                self.runs.fetch_add(1, Ordering::AcqRel);
                let fields = codec::decode_fields(config.fields)?;
                info!(
                    "launching {} fields ({} nodes), {} data keys",
                    fields.len(),
                    deep_flat(&fields).len(),
                    config.data.len()
                );
                debug!("data: {}", Value::Object(config.data.clone()));
                let decoded = Arc::new(LaunchConfig {
                    fields,
                    data: config.data,
                    payload: config.payload,
                });
                self.slot.send_replace(Some(decoded.clone()));
                Ok::<_, crate::Error>(decoded)
            })
            .await?;
        Ok(published.clone())
    }

    /// Number of decode/publish passes that actually ran.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::Acquire)
    }

    pub fn published(&self) -> Option<Arc<LaunchConfig>> {
        self.result.get().cloned()
    }
}

/// Receiving side held by the rendering root.
pub struct Subscription {
    rx: watch::Receiver<Option<Arc<LaunchConfig>>>,
}

impl Subscription {
    /// Wait for the published config. Resolves immediately if it was
    /// published before this call. `None` if the launcher went away.
    pub async fn config(mut self) -> Option<Arc<LaunchConfig>> {
        let guard = self.rx.wait_for(Option::is_some).await.ok()?;
        guard.clone()
    }
}

/// Capability handle the driver uses to launch a form.
#[derive(Clone)]
pub struct LaunchTarget {
    launcher: Arc<Launcher>,
}

impl fmt::Debug for LaunchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchTarget")
            .field("state", &self.state())
            .field("runs", &self.launcher.runs())
            .finish()
    }
}

impl LaunchTarget {
    pub fn new(launcher: Arc<Launcher>) -> Self {
        Self { launcher }
    }

    pub async fn launch(&self, config: WireConfig) -> Result<Arc<LaunchConfig>> {
        self.launcher.launch(config).await
    }

    pub fn state(&self) -> LaunchState {
        self.launcher.state()
    }

    pub fn launcher(&self) -> &Arc<Launcher> {
        &self.launcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;

    fn wire(name: &str) -> WireConfig {
        let fields = vec![FieldNode::new(FieldType::Text).name(name)];
        WireConfig {
            fields: codec::encode_fields(&fields).unwrap(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn state_machine_walks_forward() {
        let launcher = Launcher::new();
        assert_eq!(launcher.state(), LaunchState::Unmounted);
        let sub = launcher.subscribe();
        assert_eq!(launcher.state(), LaunchState::AwaitingConfig);
        launcher.launch(wire("a")).await.unwrap();
        assert_eq!(launcher.state(), LaunchState::Mounted);
        let cfg = sub.config().await.unwrap();
        assert_eq!(cfg.fields[0].name.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn later_launch_returns_first_config() {
        let launcher = Launcher::new();
        launcher.launch(wire("first")).await.unwrap();
        let second = launcher.launch(wire("second")).await.unwrap();
        assert_eq!(second.fields[0].name.as_deref(), Some("first"));
        assert_eq!(launcher.runs(), 1);
    }

    #[tokio::test]
    async fn failed_decode_leaves_cell_empty() {
        let launcher = Launcher::new();
        let bad = WireConfig {
            fields: vec![json!({"type": "\"nope\""})],
            ..Default::default()
        };
        assert!(launcher.launch(bad).await.is_err());
        assert!(launcher.published().is_none());
        launcher.launch(wire("ok")).await.unwrap();
        assert_eq!(launcher.runs(), 2);
    }

    #[test]
    fn target_debug_reports_state() {
        let target = LaunchTarget::new(Launcher::new());
        let shown = format!("{:?}", target);
        assert!(shown.contains("Unmounted"), "{}", shown);
        assert!(shown.contains("runs: 0"), "{}", shown);
    }

    #[test]
    fn wire_config_defaults_missing_parts() {
        let cfg: WireConfig = serde_json::from_value(json!({"fields": []})).unwrap();
        assert!(cfg.data.is_empty());
        assert!(cfg.payload.is_empty());
    }
}
