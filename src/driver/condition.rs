//! Polling for driver-side conditions.

use std::time::Duration;

use crate::HarnessConfig;

/// Check `f` until it holds or `condition_max_attempts` checks have run,
/// sleeping `condition_interval_ms` between them. Running out is silent:
/// the return value says whether the condition was met.
pub async fn wait_for_condition<F>(config: &HarnessConfig, mut f: F) -> bool
where
    F: FnMut() -> bool,
{
    let interval = Duration::from_millis(config.condition_interval_ms);
    for _ in 0..config.condition_max_attempts {
        if f() {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}
