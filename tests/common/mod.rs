#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use oneharness::{Browser, HarnessConfig, Page};
use serde_json::{Map, Value};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Default config with every interval shrunk for tests.
pub fn fast_config() -> HarnessConfig {
    HarnessConfig {
        poll_interval_ms: 2,
        max_attempts: 200,
        timeout_ms: 2000,
        retry_count: 3,
        settle_delay_ms: 5,
        condition_interval_ms: 1,
        condition_max_attempts: 50,
        mouse_total_delay_ms: 10,
        mouse_steps: 4,
        ..Default::default()
    }
}

pub async fn open_page() -> Page {
    init_logger();
    let browser = Browser::new(Some(fast_config())).await.expect("browser");
    browser.new_page().await.expect("page")
}

/// Shared slot for the last change callback's data.
pub type DataRef = Arc<Mutex<Option<Map<String, Value>>>>;

pub fn data_ref() -> DataRef {
    Arc::new(Mutex::new(None))
}
