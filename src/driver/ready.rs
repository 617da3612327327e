//! Loading the host fresh and locating its launch target.

use log::{debug, warn};
use serde_json::Value;

use crate::channel::LAUNCHER_READY;
use crate::gate::{ReadinessGate, ReadySignal};
use crate::launcher::LaunchTarget;
use crate::page::Page;
use crate::{Error, Result};

/// Load the host in harness mode and wait until its entry announces itself.
///
/// The page is sent to the blank URL first so the host always boots fresh.
/// Returns `Ok(false)` when the announcement never arrives within the gate's
/// ceiling; the launch that follows then fails on its own terms.
pub async fn wait_for_ready(page: &Page) -> Result<bool> {
    let config = page.config();
    let signal = ReadySignal::new();
    let firing = signal.clone();
    page.expose_function(LAUNCHER_READY, move |args: &[Value]| {
        debug!("{} called with {:?}", LAUNCHER_READY, args);
        firing.fire();
    });

    page.goto(&config.blank_url).await?;
    page.goto(config.launch_url()?.as_str()).await?;

    let gate = ReadinessGate::from_config(config);
    let ready = gate.wait_signal(&signal).await;
    if !ready {
        warn!(
            "host did not call {} within {} attempts",
            LAUNCHER_READY, gate.max_attempts
        );
    }
    Ok(ready)
}

/// Poll the page's attach point for the launch target.
pub async fn wait_for_launch_target(page: &Page, gate: &ReadinessGate) -> Result<LaunchTarget> {
    let mut found = None;
    gate.poll(|attempt| {
        found = page.launch_target();
        if found.is_none() && attempt > 0 {
            debug!("launch target not attached. attempt={}", attempt);
        }
        found.is_some()
    })
    .await;
    found.ok_or(Error::LaunchTargetMissing(gate.max_attempts))
}
