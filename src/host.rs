//! Host application booted by the page
//!
//! Opened with the harness flag, the host subscribes to a fresh launcher,
//! announces itself through `launcherReady` and waits for a config. Opened
//! without it, the host shows a static placeholder form.

use std::sync::Arc;

use log::{debug, warn};
use serde_json::Value;
use url::Url;

use crate::channel::{Globals, AWAIT_MSG, LAUNCHER_READY};
use crate::gate::ReadinessGate;
use crate::launcher::{LaunchConfig, Launcher};
use crate::schema::{FieldNode, FieldType};
use crate::HarnessConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    /// `about:blank` and friends: nothing is booted
    Blank,
    /// Harness flag present: wait for a launch config
    Harness,
    /// Opened directly: placeholder form
    Standalone,
}

impl HostMode {
    pub fn detect(url: &Url, config: &HarnessConfig) -> Self {
        if url.scheme() == "about" {
            return HostMode::Blank;
        }
        if url.query_pairs().any(|(k, _)| k == config.launch_flag.as_str()) {
            HostMode::Harness
        } else {
            HostMode::Standalone
        }
    }
}

pub const STANDALONE_MESSAGE: &str = "You need to start that app from harness context";

/// Form shown when the host is opened outside the harness.
pub fn standalone_config() -> LaunchConfig {
    LaunchConfig {
        fields: vec![FieldNode::new(FieldType::Typography).prop("placeholder", STANDALONE_MESSAGE)],
        ..Default::default()
    }
}

/// Harness entry: subscribe, announce readiness, then wait for the config.
pub async fn run_entry(
    launcher: Arc<Launcher>,
    globals: Arc<Globals>,
    gate: ReadinessGate,
) -> Option<Arc<LaunchConfig>> {
    let subscription = launcher.subscribe();
    wait_for_environment(&globals, &gate).await;
    let config = subscription.config().await;
    if config.is_none() {
        debug!("launcher dropped before publishing a config");
    }
    config
}

async fn wait_for_environment(globals: &Globals, gate: &ReadinessGate) {
    let found = gate
        .poll(|attempt| {
            if globals.is_exposed(LAUNCHER_READY) {
                return true;
            }
            if attempt > 0 {
                debug!("{} not mounted. attempt={}", LAUNCHER_READY, attempt);
            }
            false
        })
        .await;
    if found {
        globals.invoke(LAUNCHER_READY, &[Value::String(AWAIT_MSG.to_string())]);
    } else {
        warn!(
            "{} never exposed after {} attempts, waiting for config anyway",
            LAUNCHER_READY, gate.max_attempts
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn mode_detection() {
        let config = HarnessConfig::default();
        let detect = |s: &str| HostMode::detect(&Url::parse(s).unwrap(), &config);
        assert_eq!(detect("about:blank"), HostMode::Blank);
        assert_eq!(detect("http://localhost:3000/?playwrite"), HostMode::Harness);
        assert_eq!(detect("http://localhost:3000/?playwrite=1&x=2"), HostMode::Harness);
        assert_eq!(detect("http://localhost:3000/"), HostMode::Standalone);
    }

    #[tokio::test]
    async fn entry_announces_and_waits() {
        let globals = Arc::new(Globals::new());
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        globals.expose(
            LAUNCHER_READY,
            Arc::new(move |args: &[Value]| sink.lock().unwrap().extend_from_slice(args)),
        );
        let launcher = Launcher::new();
        let gate = ReadinessGate::new(Duration::from_millis(1), 10);
        let entry = tokio::spawn(run_entry(launcher.clone(), globals, gate));

        let fields = vec![FieldNode::new(FieldType::Text).name("x")];
        let wire = crate::WireConfig {
            fields: crate::codec::encode_fields(&fields).unwrap(),
            ..Default::default()
        };
        launcher.launch(wire).await.unwrap();
        let config = entry.await.unwrap().unwrap();
        assert_eq!(config.fields.len(), 1);
        assert_eq!(*messages.lock().unwrap(), vec![Value::String(AWAIT_MSG.into())]);
    }

    #[tokio::test]
    async fn entry_waits_for_config_without_ready_hook() {
        let globals = Arc::new(Globals::new());
        let launcher = Launcher::new();
        let gate = ReadinessGate::new(Duration::from_millis(1), 3);
        let entry = tokio::spawn(run_entry(launcher.clone(), globals.clone(), gate));

        // Let the environment poll run out before launching.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!entry.is_finished());
        assert!(!globals.is_exposed(LAUNCHER_READY));

        let fields = vec![FieldNode::new(FieldType::Text).name("late")];
        let wire = crate::WireConfig {
            fields: crate::codec::encode_fields(&fields).unwrap(),
            ..Default::default()
        };
        launcher.launch(wire).await.unwrap();
        let config = entry.await.unwrap().unwrap();
        assert_eq!(config.fields[0].name.as_deref(), Some("late"));
    }
}
