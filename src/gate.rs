//! Bounded readiness polling and the one-shot ready signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::HarnessConfig;

/// Polls a condition on a fixed interval up to a fixed number of attempts.
///
/// Running out of attempts is not an error here: the gate reports `false` and
/// the caller's next operation produces the meaningful failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessGate {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl ReadinessGate {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.poll_interval(), config.max_attempts)
    }

    /// Call `check(attempt)` until it returns true or attempts run out.
    pub async fn poll<F>(&self, mut check: F) -> bool
    where
        F: FnMut(u32) -> bool,
    {
        for attempt in 0..self.max_attempts {
            if check(attempt) {
                return true;
            }
            if attempt + 1 < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        false
    }

    /// Wait for `signal`, waking early when it fires.
    pub async fn wait_signal(&self, signal: &ReadySignal) -> bool {
        for _ in 0..self.max_attempts {
            if signal.is_fired() {
                return true;
            }
            let _ = tokio::time::timeout(self.interval, signal.inner.notify.notified()).await;
        }
        signal.is_fired()
    }
}

struct SignalInner {
    fired: AtomicBool,
    notify: Notify,
}

/// One-shot readiness flag. Fires at most once and never resets.
#[derive(Clone)]
pub struct ReadySignal {
    inner: Arc<SignalInner>,
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadySignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                fired: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Fire the signal. Returns `false` if it had already fired.
    pub fn fire(&self) -> bool {
        let first = self
            .inner
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    pub fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn poll_gives_up_after_ceiling() {
        let gate = ReadinessGate::new(Duration::from_millis(1), 5);
        let mut calls = 0;
        let ok = gate
            .poll(|_| {
                calls += 1;
                false
            })
            .await;
        assert!(!ok);
        assert_eq!(calls, 5);
    }

    #[tokio::test]
    async fn poll_stops_on_success() {
        let gate = ReadinessGate::new(Duration::from_millis(1), 50);
        let ok = gate.poll(|attempt| attempt == 3).await;
        assert!(ok);
    }

    #[tokio::test]
    async fn signal_wakes_waiter_early() {
        let gate = ReadinessGate::new(Duration::from_secs(5), 3);
        let signal = ReadySignal::new();
        let firing = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            firing.fire();
        });
        let started = Instant::now();
        assert!(gate.wait_signal(&signal).await);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn signal_fires_once() {
        let signal = ReadySignal::new();
        assert!(signal.fire());
        assert!(!signal.fire());
        assert!(signal.is_fired());
    }
}
