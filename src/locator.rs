//! Lazy element locators
//!
//! A [`Locator`] is a page plus a selector chain. Nothing is resolved until
//! an action or query runs, and every resolution sees the page's current
//! tree.

use std::time::Instant;

use log::trace;

use crate::dom::{Role, Selector};
use crate::page::{Page, Probe};
use crate::renderer::Action;
use crate::{Error, Result};

/// Element state a locator can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// Present in the tree
    Attached,
    /// Not present in the tree
    Detached,
    /// Present, and it and all of its ancestors are visible
    Visible,
    /// Absent or not visible
    Hidden,
}

impl WaitState {
    fn holds(self, probe: &Probe) -> bool {
        match self {
            WaitState::Attached => probe.element.is_some(),
            WaitState::Detached => probe.element.is_none(),
            WaitState::Visible => probe.element.is_some() && probe.visible,
            WaitState::Hidden => probe.element.is_none() || !probe.visible,
        }
    }
}

#[derive(Clone)]
pub struct Locator {
    page: Page,
    chain: Vec<Selector>,
}

impl std::fmt::Debug for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locator").field("chain", &self.chain).finish()
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let steps: Vec<String> = self.chain.iter().map(ToString::to_string).collect();
        f.write_str(&steps.join(" >> "))
    }
}

impl Locator {
    pub fn new(page: Page, chain: Vec<Selector>) -> Self {
        Self { page, chain }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.chain
    }

    fn descend(&self, selector: Selector) -> Self {
        let mut chain = self.chain.clone();
        chain.push(selector);
        Self {
            page: self.page.clone(),
            chain,
        }
    }

    pub fn get_by_test_id(&self, test_id: &str) -> Self {
        self.descend(Selector::TestId(test_id.to_string()))
    }

    pub fn get_by_role(&self, role: Role) -> Self {
        self.descend(Selector::Role(role))
    }

    pub fn get_by_label(&self, label: &str) -> Self {
        self.descend(Selector::Label(label.to_string()))
    }

    pub fn get_by_text(&self, text: &str) -> Self {
        self.descend(Selector::Text(text.to_string()))
    }

    async fn probe(&self) -> Result<Probe> {
        self.page.probe(&self.chain).await
    }

    /// Poll until `state` holds, bounded by the page's timeout.
    pub async fn wait_for(&self, state: WaitState) -> Result<()> {
        let config = self.page.config();
        let timeout = config.timeout();
        let interval = config.poll_interval();
        let started = Instant::now();
        loop {
            if state.holds(&self.probe().await?) {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                trace!("{} never reached {:?}", self, state);
                return Err(Error::Timeout(config.timeout_ms));
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn act(&self, action: Action) -> Result<()> {
        self.wait_for(WaitState::Visible).await?;
        trace!("{:?} on {}", action, self);
        self.page.dispatch(&self.chain, action).await
    }

    pub async fn click(&self) -> Result<()> {
        self.act(Action::Click).await
    }

    /// Replace the input's text.
    pub async fn fill(&self, text: &str) -> Result<()> {
        self.act(Action::Fill(text.to_string())).await
    }

    pub async fn focus(&self) -> Result<()> {
        self.act(Action::Focus).await
    }

    pub async fn blur(&self) -> Result<()> {
        self.act(Action::Blur).await
    }

    async fn element(&self) -> Result<crate::dom::Element> {
        self.probe()
            .await?
            .element
            .ok_or_else(|| Error::ElementNotFound(self.to_string()))
    }

    pub async fn input_value(&self) -> Result<String> {
        let el = self.element().await?;
        el.value
            .ok_or_else(|| Error::RenderError(format!("{} is not an input", self)))
    }

    /// Visible text of the element and its descendants.
    pub async fn text_content(&self) -> Result<String> {
        Ok(self.element().await?.inner_text())
    }

    pub async fn is_visible(&self) -> Result<bool> {
        Ok(WaitState::Visible.holds(&self.probe().await?))
    }

    pub async fn is_disabled(&self) -> Result<bool> {
        Ok(self.element().await?.disabled)
    }

    pub async fn is_readonly(&self) -> Result<bool> {
        Ok(self.element().await?.readonly)
    }

    pub async fn is_checked(&self) -> Result<bool> {
        Ok(self.element().await?.checked.unwrap_or(false))
    }

    pub async fn invalid_message(&self) -> Result<Option<String>> {
        Ok(self.element().await?.invalid)
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.probe().await?.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;

    #[test]
    fn wait_states_against_probes() {
        let absent = Probe::default();
        let hidden = Probe {
            element: Some(Element::new(Role::Text)),
            visible: false,
            count: 1,
        };
        let shown = Probe {
            visible: true,
            ..hidden.clone()
        };
        assert!(WaitState::Detached.holds(&absent));
        assert!(WaitState::Hidden.holds(&absent));
        assert!(WaitState::Attached.holds(&hidden));
        assert!(WaitState::Hidden.holds(&hidden));
        assert!(!WaitState::Visible.holds(&hidden));
        assert!(WaitState::Visible.holds(&shown));
        assert!(!WaitState::Detached.holds(&shown));
    }
}
