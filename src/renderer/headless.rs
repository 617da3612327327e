//! HeadlessOne: a small in-process form renderer.
//!
//! Covers enough of the declarative field vocabulary to drive end-to-end
//! scenarios without a browser: value binding, computed values, toggles,
//! buttons with click recipes, visibility/disabled/readonly/invalid flags and
//! input templates. Unknown kinds render as generic elements.

use std::sync::Arc;

use log::debug;
use serde_json::{Map, Value};

use super::{Action, FormRenderer, MountedForm, READY_TEST_ID};
use crate::channel::FormEvents;
use crate::dom::{Element, Role};
use crate::flatten::deep_flat;
use crate::launcher::LaunchConfig;
use crate::recipe::{display_value, is_truthy, Scope};
use crate::schema::{FieldNode, FieldType};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessOne;

impl HeadlessOne {
    pub fn new() -> Self {
        HeadlessOne
    }
}

impl FormRenderer for HeadlessOne {
    fn mount(&self, config: Arc<LaunchConfig>, events: FormEvents) -> Result<Box<dyn MountedForm>> {
        Ok(Box::new(HeadlessForm::new(&config, events)))
    }
}

/// How a field kind behaves on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Container,
    Input,
    Toggle,
    Radio,
    Button,
    Typography,
    Progress,
    Silent,
    Generic,
}

fn kind_of(ty: FieldType) -> Kind {
    match ty {
        t if t.is_container() => Kind::Container,
        FieldType::Text
        | FieldType::Date
        | FieldType::Time
        | FieldType::Combo
        | FieldType::Complete
        | FieldType::Choose
        | FieldType::Items
        | FieldType::Slider
        | FieldType::Rating
        | FieldType::File
        | FieldType::Dict
        | FieldType::Tree => Kind::Input,
        FieldType::Checkbox | FieldType::Switch | FieldType::YesNo => Kind::Toggle,
        FieldType::Radio => Kind::Radio,
        FieldType::Button | FieldType::Icon => Kind::Button,
        FieldType::Typography | FieldType::Line => Kind::Typography,
        FieldType::Progress => Kind::Progress,
        FieldType::Init | FieldType::Phony => Kind::Silent,
        _ => Kind::Generic,
    }
}

struct HeadlessForm {
    fields: Vec<FieldNode>,
    data: Map<String, Value>,
    payload: Map<String, Value>,
    events: FormEvents,
    focused: Option<usize>,
}

impl HeadlessForm {
    fn new(config: &LaunchConfig, events: FormEvents) -> Self {
        let mut data = config.data.clone();
        for node in deep_flat(&config.fields) {
            let (Some(name), Some(default)) = (&node.name, node.value("defaultValue")) else {
                continue;
            };
            if !data.contains_key(name) {
                data.insert(name.clone(), default.clone());
            }
        }
        Self {
            fields: config.fields.clone(),
            data,
            payload: config.payload.clone(),
            events,
            focused: None,
        }
    }

    fn scope(&self) -> Scope<'_> {
        Scope::new(&self.data, &self.payload)
    }

    /// Recipe `dynamic` wins over static `fixed`; both absent means false.
    fn flag(&self, node: &FieldNode, dynamic: &str, fixed: &str) -> bool {
        match node.callback(dynamic) {
            Some(recipe) => recipe.test(&self.scope()),
            None => node.value(fixed).is_some_and(is_truthy),
        }
    }

    fn is_visible(&self, node: &FieldNode) -> bool {
        let shown = node
            .callback("isVisible")
            .map_or(true, |r| r.test(&self.scope()));
        shown && !node.value("hidden").is_some_and(is_truthy)
    }

    fn is_disabled(&self, node: &FieldNode) -> bool {
        self.flag(node, "isDisabled", "disabled")
    }

    fn is_readonly(&self, node: &FieldNode) -> bool {
        self.flag(node, "isReadonly", "readonly")
    }

    fn raw_value(&self, node: &FieldNode) -> Value {
        node.name
            .as_ref()
            .and_then(|n| self.data.get(n))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn display(&self, node: &FieldNode) -> String {
        let raw = self.raw_value(node);
        match node.callback("compute") {
            Some(recipe) => display_value(&recipe.evaluate(&self.scope().with_value(&raw))),
            None => display_value(&raw),
        }
    }

    fn invalid_message(&self, node: &FieldNode) -> Option<String> {
        if let Some(recipe) = node.callback("isInvalid") {
            let raw = self.raw_value(node);
            return match recipe.evaluate(&self.scope().with_value(&raw)) {
                Value::String(s) if !s.is_empty() => Some(s),
                v if is_truthy(&v) && !v.is_string() => Some("Invalid".to_string()),
                _ => None,
            };
        }
        let required = node
            .value("validation")
            .and_then(|v| v.get("required"))
            .is_some_and(is_truthy);
        if required && !is_truthy(&self.raw_value(node)) {
            return Some("Required".to_string());
        }
        None
    }

    fn render_node(&self, node: &FieldNode, counter: &mut usize) -> Element {
        let key = *counter;
        *counter += 1;

        let title = node.str_prop("title").map(str::to_string);
        let test_id = node.test_id_value();
        let mut el = match kind_of(node.field_type) {
            Kind::Container => {
                let mut group = Element::new(Role::Group).with_key(key).with_test_id(test_id);
                group.label = title.clone();
                group.text = title.clone().unwrap_or_default();
                group
            }
            Kind::Input => {
                let mut input = Element::new(Role::Textbox).with_key(key);
                input.label = title.clone();
                input.value = Some(self.display(node));
                input.disabled = self.is_disabled(node);
                input.readonly = self.is_readonly(node) || node.callback("compute").is_some();
                input.invalid = self.invalid_message(node);
                let mut wrapper = Element::new(Role::Group).with_key(key).with_test_id(test_id);
                wrapper.text = title.clone().unwrap_or_default();
                wrapper.disabled = input.disabled;
                wrapper.children.push(input);
                wrapper
            }
            Kind::Toggle | Kind::Radio => {
                let is_radio = node.field_type == FieldType::Radio;
                let mut input =
                    Element::new(if is_radio { Role::Radio } else { Role::Checkbox }).with_key(key);
                input.label = title.clone();
                input.text = title.clone().unwrap_or_default();
                input.checked = Some(if is_radio {
                    node.value("radioValue") == Some(&self.raw_value(node))
                } else {
                    is_truthy(&self.raw_value(node))
                });
                input.disabled = self.is_disabled(node);
                input.readonly = self.is_readonly(node);
                input.invalid = self.invalid_message(node);
                let mut wrapper = Element::new(Role::Group).with_key(key).with_test_id(test_id);
                wrapper.disabled = input.disabled;
                wrapper.children.push(input);
                wrapper
            }
            Kind::Button => {
                let mut button = Element::new(Role::Button).with_key(key);
                button.text = title
                    .clone()
                    .or_else(|| node.str_prop("icon").map(str::to_string))
                    .unwrap_or_default();
                button.label = title.clone();
                button.disabled = self.is_disabled(node);
                let mut wrapper = Element::new(Role::Group).with_key(key).with_test_id(test_id);
                wrapper.disabled = button.disabled;
                wrapper.children.push(button);
                wrapper
            }
            Kind::Typography => {
                let text = if node.callback("compute").is_some() || node.name.is_some() {
                    self.display(node)
                } else {
                    node.str_prop("placeholder")
                        .map(str::to_string)
                        .or(title.clone())
                        .unwrap_or_default()
                };
                Element::new(Role::Text)
                    .with_key(key)
                    .with_test_id(test_id)
                    .with_text(text)
            }
            Kind::Progress => {
                let mut progress = Element::new(Role::Progress).with_key(key).with_test_id(test_id);
                progress.value = Some(self.display(node));
                progress.label = title.clone();
                progress
            }
            Kind::Silent => {
                let mut silent = Element::new(Role::Generic).with_key(key).with_test_id(test_id);
                silent.visible = false;
                silent
            }
            Kind::Generic => Element::new(Role::Generic)
                .with_key(key)
                .with_test_id(test_id)
                .with_text(title.clone().unwrap_or_default()),
        };

        // Descendants always consume keys so they stay aligned with deep_flat.
        let mut children: Vec<Element> = node
            .fields
            .iter()
            .map(|f| self.render_node(f, counter))
            .collect();
        if let Some(child) = &node.child {
            children.push(self.render_node(child, counter));
        }
        let condition_holds = node.field_type != FieldType::Condition
            || node
                .callback("condition")
                .map_or(true, |r| r.test(&self.scope()));
        if condition_holds {
            el.children.extend(children);
        }

        if el.visible {
            el.visible = self.is_visible(node);
        }
        el
    }

    fn node_at(&self, key: usize) -> Result<FieldNode> {
        deep_flat(&self.fields)
            .get(key)
            .map(|n| (*n).clone())
            .ok_or_else(|| Error::ElementNotFound(format!("field #{}", key)))
    }

    fn changed(&self) {
        self.events.change(&self.data, false);
        for node in deep_flat(&self.fields) {
            let Some(name) = &node.name else { continue };
            if let Some(msg) = self.invalid_message(node) {
                self.events.invalid(name, &msg, &self.payload);
            }
        }
    }

    fn click(&mut self, key: usize, node: &FieldNode) -> Result<()> {
        let name = node.name.clone().unwrap_or_default();
        if self.is_disabled(node) {
            debug!("click on disabled field #{} ignored", key);
            return Ok(());
        }
        match kind_of(node.field_type) {
            Kind::Button => {
                self.events.click(&name, &self.data, &self.payload);
                if let Some(recipe) = node.callback("click") {
                    let outcome = recipe.evaluate(&self.scope());
                    if let Value::Object(next) = outcome {
                        self.data = next;
                        self.changed();
                    }
                }
            }
            Kind::Toggle if !self.is_readonly(node) && !name.is_empty() => {
                let next = !is_truthy(&self.raw_value(node));
                self.data.insert(name, Value::Bool(next));
                self.changed();
            }
            Kind::Radio if !self.is_readonly(node) && !name.is_empty() => {
                let value = node.value("radioValue").cloned().unwrap_or(Value::Null);
                self.data.insert(name, value);
                self.changed();
            }
            Kind::Input => {
                self.focused = Some(key);
                self.events.focus(&name, &self.data);
            }
            _ => {}
        }
        Ok(())
    }

    fn fill(&mut self, key: usize, node: &FieldNode, text: &str) -> Result<()> {
        let editable = kind_of(node.field_type) == Kind::Input
            && !self.is_disabled(node)
            && !self.is_readonly(node)
            && node.callback("compute").is_none();
        let Some(name) = node.name.clone().filter(|_| editable) else {
            return Err(Error::RenderError(format!("field #{} is not editable", key)));
        };
        let formatted = match node.str_prop("inputFormatterTemplate") {
            Some(template) => {
                let symbol = node
                    .str_prop("inputFormatterSymbol")
                    .and_then(|s| s.chars().next())
                    .unwrap_or('0');
                format_template(template, symbol, text)
            }
            None => text.to_string(),
        };
        self.data.insert(name, Value::String(formatted));
        self.changed();
        Ok(())
    }
}

impl MountedForm for HeadlessForm {
    fn tree(&self) -> Element {
        let mut root = Element::new(Role::Root).with_test_id(Some(READY_TEST_ID));
        let mut counter = 0;
        for node in &self.fields {
            let el = self.render_node(node, &mut counter);
            root.children.push(el);
        }
        root
    }

    fn dispatch(&mut self, key: usize, action: Action) -> Result<()> {
        let node = self.node_at(key)?;
        let name = node.name.clone().unwrap_or_default();
        match action {
            Action::Click => self.click(key, &node),
            Action::Fill(text) => self.fill(key, &node, &text),
            Action::Focus => {
                self.focused = Some(key);
                self.events.focus(&name, &self.data);
                Ok(())
            }
            Action::Blur => {
                if self.focused == Some(key) {
                    self.focused = None;
                }
                self.events.blur(&name, &self.data);
                Ok(())
            }
        }
    }
}

/// Lay `raw` into `template`: each `symbol` slot takes the next input char,
/// other template chars are literals. Input chars equal to the literal at
/// their position are absorbed. Stops when the input runs out.
pub fn format_template(template: &str, symbol: char, raw: &str) -> String {
    let mut input = raw.chars().peekable();
    let mut out = String::new();
    for t in template.chars() {
        let Some(&next) = input.peek() else { break };
        if t == symbol {
            out.push(next);
            input.next();
        } else {
            out.push(t);
            if next == t {
                input.next();
            }
        }
    }
    out
}
