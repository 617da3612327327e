//! Rendered element tree
//!
//! The renderer produces a fresh [`Element`] tree after every state change.
//! Locators resolve against it; snapshots serialise it to text.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Accessible role of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Root,
    Group,
    Textbox,
    Button,
    Checkbox,
    Radio,
    Progress,
    Text,
    Generic,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Root => "root",
            Role::Group => "group",
            Role::Textbox => "textbox",
            Role::Button => "button",
            Role::Checkbox => "checkbox",
            Role::Radio => "radio",
            Role::Progress => "progress",
            Role::Text => "text",
            Role::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Preorder index of the field this element belongs to
    pub key: Option<usize>,
    pub test_id: Option<String>,
    pub role: Role,
    pub label: Option<String>,
    pub text: String,
    pub value: Option<String>,
    pub checked: Option<bool>,
    pub disabled: bool,
    pub readonly: bool,
    pub visible: bool,
    pub invalid: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(role: Role) -> Self {
        Self {
            key: None,
            test_id: None,
            role,
            label: None,
            text: String::new(),
            value: None,
            checked: None,
            disabled: false,
            readonly: false,
            visible: true,
            invalid: None,
            children: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: usize) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_test_id(mut self, test_id: Option<&str>) -> Self {
        self.test_id = test_id.map(str::to_string);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Own text plus all visible descendant text, space separated.
    pub fn inner_text(&self) -> String {
        let mut parts = Vec::new();
        collect_text(self, &mut parts);
        parts.join(" ")
    }

    fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::TestId(id) => self.test_id.as_deref() == Some(id.as_str()),
            Selector::Role(role) => self.role == *role,
            Selector::Label(label) => self.label.as_deref() == Some(label.as_str()),
            Selector::Text(text) => self.text.contains(text.as_str()),
        }
    }
}

fn collect_text(el: &Element, parts: &mut Vec<String>) {
    if !el.visible {
        return;
    }
    if !el.text.is_empty() {
        parts.push(el.text.clone());
    }
    if let Some(msg) = &el.invalid {
        parts.push(msg.clone());
    }
    for c in &el.children {
        collect_text(c, parts);
    }
}

/// How a locator step picks elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// `data-testid` attribute
    TestId(String),
    Role(Role),
    /// Accessible label (field title)
    Label(String),
    /// Substring of the element's own text
    Text(String),
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::TestId(id) => write!(f, "test-id={}", id),
            Selector::Role(role) => write!(f, "role={}", role.as_str()),
            Selector::Label(label) => write!(f, "label={}", label),
            Selector::Text(text) => write!(f, "text={}", text),
        }
    }
}

/// Resolve a selector chain. The first step searches the whole tree including
/// `root`; each later step searches strict descendants of the previous match.
pub fn resolve<'a>(root: &'a Element, chain: &[Selector]) -> Option<&'a Element> {
    let (first, rest) = chain.split_first()?;
    let mut current = find_first(root, first, true)?;
    for sel in rest {
        current = find_first(current, sel, false)?;
    }
    Some(current)
}

/// Count matches of the last step below the resolved prefix.
pub fn count(root: &Element, chain: &[Selector]) -> usize {
    let Some((last, prefix)) = chain.split_last() else {
        return 0;
    };
    if prefix.is_empty() {
        let mut n = 0;
        count_in(root, last, true, &mut n);
        return n;
    }
    match resolve(root, prefix) {
        Some(scope) => {
            let mut n = 0;
            count_in(scope, last, false, &mut n);
            n
        }
        None => 0,
    }
}

fn find_first<'a>(el: &'a Element, sel: &Selector, include_self: bool) -> Option<&'a Element> {
    if include_self && el.matches(sel) {
        return Some(el);
    }
    el.children.iter().find_map(|c| find_first(c, sel, true))
}

fn count_in(el: &Element, sel: &Selector, include_self: bool, n: &mut usize) {
    if include_self && el.matches(sel) {
        *n += 1;
    }
    for c in &el.children {
        count_in(c, sel, true, n);
    }
}

/// Whether `target` and all of its ancestors are visible.
pub fn is_effectively_visible(root: &Element, chain: &[Selector]) -> bool {
    fn walk(el: &Element, target: *const Element) -> Option<bool> {
        if std::ptr::eq(el, target) {
            return Some(el.visible);
        }
        for c in &el.children {
            if let Some(v) = walk(c, target) {
                return Some(v && el.visible);
            }
        }
        None
    }
    match resolve(root, chain) {
        Some(target) => walk(root, target).unwrap_or(false),
        None => false,
    }
}

/// Text snapshot of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub url: String,
    /// Visible text, space separated
    pub text: String,
    /// Indented outline of the element tree
    pub outline: String,
}

impl Snapshot {
    pub fn capture(url: &str, root: &Element) -> Self {
        let mut outline = String::new();
        write_outline(root, 0, &mut outline);
        Self {
            url: url.to_string(),
            text: root.inner_text(),
            outline,
        }
    }

    /// Hex sha256 of the outline. Stable across runs for identical trees.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.outline.as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn write_outline(el: &Element, depth: usize, out: &mut String) {
    let _ = write!(out, "{}{}", "  ".repeat(depth), el.role.as_str());
    if let Some(id) = &el.test_id {
        let _ = write!(out, " #{}", id);
    }
    if let Some(label) = &el.label {
        let _ = write!(out, " [{}]", label);
    }
    if !el.text.is_empty() {
        let _ = write!(out, " {:?}", el.text);
    }
    if let Some(v) = &el.value {
        let _ = write!(out, " value={:?}", v);
    }
    if let Some(c) = el.checked {
        let _ = write!(out, " checked={}", c);
    }
    if el.disabled {
        out.push_str(" disabled");
    }
    if el.readonly {
        out.push_str(" readonly");
    }
    if !el.visible {
        out.push_str(" hidden");
    }
    if let Some(msg) = &el.invalid {
        let _ = write!(out, " invalid={:?}", msg);
    }
    out.push('\n');
    for c in &el.children {
        write_outline(c, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        let mut root = Element::new(Role::Root).with_test_id(Some("root"));
        let mut field = Element::new(Role::Group)
            .with_key(0)
            .with_test_id(Some("text-field"));
        let mut input = Element::new(Role::Textbox).with_key(0);
        input.value = Some("Hello".into());
        field.children.push(input);
        root.children.push(field);
        let mut hidden = Element::new(Role::Text).with_text("secret");
        hidden.visible = false;
        root.children.push(hidden);
        root
    }

    #[test]
    fn chain_descends_into_matches() {
        let root = sample();
        let el = resolve(
            &root,
            &[Selector::TestId("text-field".into()), Selector::Role(Role::Textbox)],
        )
        .unwrap();
        assert_eq!(el.value.as_deref(), Some("Hello"));
        assert!(resolve(&root, &[Selector::Role(Role::Button)]).is_none());
    }

    #[test]
    fn later_steps_exclude_the_scope_itself() {
        let root = sample();
        let chain = [Selector::TestId("root".into()), Selector::Role(Role::Root)];
        assert!(resolve(&root, &chain).is_none());
    }

    #[test]
    fn hidden_text_is_not_inner_text() {
        let root = sample();
        assert!(!root.inner_text().contains("secret"));
        assert!(!is_effectively_visible(&root, &[Selector::Text("secret".into())]));
        assert!(is_effectively_visible(&root, &[Selector::Role(Role::Textbox)]));
    }

    #[test]
    fn digest_is_stable() {
        let a = Snapshot::capture("about:blank", &sample());
        let b = Snapshot::capture("about:blank", &sample());
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }
}
