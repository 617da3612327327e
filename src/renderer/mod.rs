//! Renderer seam
//!
//! The form renderer under test is a black box behind [`FormRenderer`]: it
//! takes a decoded [`LaunchConfig`] plus an event sink, and hands back a
//! [`MountedForm`] the page can query and dispatch input to.

use std::sync::Arc;

use crate::channel::FormEvents;
use crate::dom::Element;
use crate::launcher::LaunchConfig;
use crate::Result;

#[cfg(feature = "headless")]
pub mod headless;

#[cfg(feature = "headless")]
pub use headless::HeadlessOne;

/// Test id carried by the root element once the form is mounted.
pub const READY_TEST_ID: &str = "react-declarative__oneGenesisReady";

/// User input the page can deliver to a mounted form.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Click,
    Focus,
    Blur,
    /// Replace the text of an input
    Fill(String),
}

pub trait FormRenderer: Send + Sync {
    fn mount(&self, config: Arc<LaunchConfig>, events: FormEvents) -> Result<Box<dyn MountedForm>>;
}

pub trait MountedForm: Send {
    /// Current element tree. The root carries [`READY_TEST_ID`].
    fn tree(&self) -> Element;

    /// Deliver `action` to the field with preorder index `key`.
    fn dispatch(&mut self, key: usize, action: Action) -> Result<()>;
}
