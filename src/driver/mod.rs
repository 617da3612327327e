//! Helpers used by end-to-end scenarios
//!
//! Everything here runs on the driver side and talks to the page only
//! through [`Page`](crate::Page) and its locators.

pub mod condition;
pub mod input;
pub mod ready;
pub mod render;
pub mod retry;

pub use condition::wait_for_condition;
pub use input::{move_mouse, write_text};
pub use ready::{wait_for_launch_target, wait_for_ready};
pub use render::{launch_fields, render_fields, Callbacks, RenderOptions};
pub use retry::{retry, DEFAULT_RETRY_COUNT};
