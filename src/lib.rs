//! oneharness
//!
//! End-to-end launch bridge and driver helpers for testing a declarative form
//! renderer. A driver builds a field schema, hands it to a page through the
//! page's launch target, and then drives and observes the mounted form.
//!
//! # Features
//!
//! - **Launch bridge**: schemas with callback recipes are encoded, sent into
//!   the page and decoded exactly once per page load
//! - **Callback channels**: focus/blur/change/click/invalid events are
//!   forwarded to functions the driver exposes
//! - **Driver helpers**: readiness gate, retry, render, write text, wait for
//!   condition, mouse moves
//! - **Headless renderer** (default `headless` feature): a small in-process
//!   renderer so scenarios run without a browser
//!
//! # Example
//!
//! ```no_run
//! use oneharness::driver::{launch_fields, RenderOptions};
//! use oneharness::schema::{FieldNode, FieldType};
//! use oneharness::{Browser, HarnessConfig};
//!
//! # async fn run() -> oneharness::Result<()> {
//! let browser = Browser::new(Some(HarnessConfig::default())).await?;
//! let page = browser.new_page().await?;
//!
//! let fields = vec![FieldNode::new(FieldType::Text).name("text").test_id("text-field")];
//! let options = RenderOptions::default().data(serde_json::json!({"text": "Hello world"}));
//! let root = launch_fields(&page, &fields, &options).await?;
//! let value = root.get_by_test_id("text-field").get_by_role(oneharness::dom::Role::Textbox).input_value().await?;
//! assert_eq!(value, "Hello world");
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

pub mod error;
pub use error::{Error, Result};

pub mod channel;
pub mod codec;
pub mod dom;
pub mod driver;
pub mod flatten;
pub mod gate;
pub mod host;
pub mod launcher;
pub mod locator;
pub mod page;
pub mod recipe;
pub mod renderer;
pub mod schema;

pub use launcher::{LaunchConfig, LaunchTarget, WireConfig};
pub use locator::{Locator, WaitState};
pub use page::{Browser, Page};

/// Configuration for browsers, pages and driver helpers
///
/// Defaults match a local dev server on port 3000 and the timings the
/// harness was tuned with. Tests usually shrink the intervals.
///
/// # Examples
///
/// ```
/// let cfg = oneharness::HarnessConfig::default();
/// assert_eq!(cfg.retry_count, 5);
/// assert!(cfg.launch_url().unwrap().as_str().contains("playwrite"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Host application URL
    pub base_url: String,
    /// Query flag that boots the host in harness mode
    pub launch_flag: String,
    /// Page visited first to force a clean reload
    pub blank_url: String,
    /// Interval between readiness and locator polls in milliseconds
    pub poll_interval_ms: u64,
    /// Readiness polls before giving up
    pub max_attempts: u32,
    /// Upper bound for locator waits in milliseconds
    pub timeout_ms: u64,
    /// Attempts for the whole launch sequence
    pub retry_count: usize,
    /// Pause after writing text in milliseconds
    pub settle_delay_ms: u64,
    /// Interval between `wait_for_condition` checks in milliseconds
    pub condition_interval_ms: u64,
    /// Checks before `wait_for_condition` gives up
    pub condition_max_attempts: u32,
    /// Total pause spread over one `move_mouse` path in milliseconds
    pub mouse_total_delay_ms: u64,
    /// Interpolation steps per mouse path leg
    pub mouse_steps: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/".to_string(),
            launch_flag: "playwrite".to_string(),
            blank_url: "about:blank".to_string(),
            poll_interval_ms: 50,
            max_attempts: 100,
            timeout_ms: 30000,
            retry_count: driver::retry::DEFAULT_RETRY_COUNT,
            settle_delay_ms: 1000,
            condition_interval_ms: 50,
            condition_max_attempts: 100,
            mouse_total_delay_ms: 800,
            mouse_steps: 10,
        }
    }
}

impl HarnessConfig {
    /// Load a config from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        let config: HarnessConfig = serde_json::from_str(&text)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::ConfigError("max_attempts must be positive".into()));
        }
        if self.retry_count == 0 {
            return Err(Error::ConfigError("retry_count must be positive".into()));
        }
        if self.launch_flag.is_empty() {
            return Err(Error::ConfigError("launch_flag must not be empty".into()));
        }
        Url::parse(&self.base_url)
            .map_err(|e| Error::ConfigError(format!("base_url: {}", e)))?;
        Url::parse(&self.blank_url)
            .map_err(|e| Error::ConfigError(format!("blank_url: {}", e)))?;
        Ok(())
    }

    /// Host URL with the harness flag set.
    pub fn launch_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.query_pairs_mut().append_key_only(&self.launch_flag);
        Ok(url)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
