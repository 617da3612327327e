//! Field schema model
//!
//! A schema is an ordered list of [`FieldNode`]s. Containers carry nested
//! `fields` (or a single `child`); every node carries an open set of
//! properties, each either a structural JSON value or a callback [`Recipe`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::recipe::Recipe;
use crate::Error;

/// Every field and layout kind understood by the renderer, keyed by its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum FieldType {
    Layout,
    Switch,
    YesNo,
    Line,
    File,
    Group,
    Paper,
    Outline,
    Expansion,
    Radio,
    Checkbox,
    Button,
    Icon,
    Text,
    Date,
    Time,
    Progress,
    Component,
    Slider,
    Combo,
    Choose,
    Tree,
    Dict,
    Init,
    Phony,
    Complete,
    Items,
    Rating,
    Typography,
    Fragment,
    Div,
    Box,
    Tabs,
    Hero,
    Center,
    Stretch,
    Condition,
}

/// Tag table. Decoding a `type` property always goes through this table.
pub const FIELD_TABLE: &[(&str, FieldType)] = &[
    ("custom-layout", FieldType::Layout),
    ("switch-field", FieldType::Switch),
    ("yesno-field", FieldType::YesNo),
    ("line-field", FieldType::Line),
    ("file-field", FieldType::File),
    ("group-layout", FieldType::Group),
    ("paper-layout", FieldType::Paper),
    ("outline-layout", FieldType::Outline),
    ("expansion-layout", FieldType::Expansion),
    ("radio-field", FieldType::Radio),
    ("checkbox-field", FieldType::Checkbox),
    ("button-field", FieldType::Button),
    ("icon-field", FieldType::Icon),
    ("text-field", FieldType::Text),
    ("date-field", FieldType::Date),
    ("time-field", FieldType::Time),
    ("progress-field", FieldType::Progress),
    ("component-field", FieldType::Component),
    ("slider-field", FieldType::Slider),
    ("combo-field", FieldType::Combo),
    ("choose-field", FieldType::Choose),
    ("tree-field", FieldType::Tree),
    ("dict-field", FieldType::Dict),
    ("init-field", FieldType::Init),
    ("phony-field", FieldType::Phony),
    ("complete-field", FieldType::Complete),
    ("items-field", FieldType::Items),
    ("rating-field", FieldType::Rating),
    ("typography-field", FieldType::Typography),
    ("fragment-layout", FieldType::Fragment),
    ("div-layout", FieldType::Div),
    ("box-layout", FieldType::Box),
    ("tabs-layout", FieldType::Tabs),
    ("hero-layout", FieldType::Hero),
    ("center-layout", FieldType::Center),
    ("stretch-layout", FieldType::Stretch),
    ("condition-layout", FieldType::Condition),
];

impl FieldType {
    /// Look up a tag such as `"text-field"`.
    pub fn from_tag(tag: &str) -> Option<FieldType> {
        FIELD_TABLE
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, ty)| *ty)
    }

    /// The kebab-case tag used on the wire.
    pub fn tag(self) -> &'static str {
        FIELD_TABLE
            .iter()
            .find(|(_, ty)| *ty == self)
            .map(|(t, _)| *t)
            .unwrap_or("custom-layout")
    }

    /// Layout kinds that hold nested fields rather than a value.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            FieldType::Layout
                | FieldType::Group
                | FieldType::Paper
                | FieldType::Outline
                | FieldType::Expansion
                | FieldType::Fragment
                | FieldType::Div
                | FieldType::Box
                | FieldType::Tabs
                | FieldType::Hero
                | FieldType::Center
                | FieldType::Stretch
                | FieldType::Condition
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::from_tag(s).ok_or_else(|| Error::UnknownFieldType(s.to_string()))
    }
}

impl TryFrom<String> for FieldType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldType> for &'static str {
    fn from(value: FieldType) -> Self {
        value.tag()
    }
}

/// Marker object wrapping a recipe so it can share a property slot with
/// structural JSON values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeSlot {
    #[serde(rename = "$recipe")]
    pub recipe: Recipe,
}

/// Key of the marker object used for recipe-valued properties.
pub const RECIPE_KEY: &str = "$recipe";

/// A single property value of a field node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prop {
    /// A callback, evaluated by the renderer
    Recipe(RecipeSlot),
    /// A plain JSON value (scalar, array or object)
    Value(Value),
}

impl Prop {
    pub fn as_recipe(&self) -> Option<&Recipe> {
        match self {
            Prop::Recipe(slot) => Some(&slot.recipe),
            Prop::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Prop::Value(v) => Some(v),
            Prop::Recipe(_) => None,
        }
    }
}

impl From<Recipe> for Prop {
    fn from(recipe: Recipe) -> Self {
        Prop::Recipe(RecipeSlot { recipe })
    }
}

impl From<Value> for Prop {
    fn from(value: Value) -> Self {
        Prop::Value(value)
    }
}

/// One field or layout container in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Binding key into the form data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child: Option<Box<FieldNode>>,

    /// Type-specific properties (`title`, `testId`, `compute`, ...)
    #[serde(flatten)]
    pub props: BTreeMap<String, Prop>,
}

impl FieldNode {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            name: None,
            fields: Vec::new(),
            child: None,
            props: BTreeMap::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn test_id(self, id: impl Into<String>) -> Self {
        self.prop("testId", Value::String(id.into()))
    }

    pub fn title(self, title: impl Into<String>) -> Self {
        self.prop("title", Value::String(title.into()))
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), Prop::Value(value.into()));
        self
    }

    pub fn recipe(mut self, key: impl Into<String>, recipe: Recipe) -> Self {
        self.props.insert(key.into(), recipe.into());
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldNode>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_child(mut self, child: FieldNode) -> Self {
        self.child = Some(Box::new(child));
        self
    }

    /// Structural value of `key`, if it is not a recipe.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.props.get(key).and_then(Prop::as_value)
    }

    /// Recipe bound to `key`, if any.
    pub fn callback(&self, key: &str) -> Option<&Recipe> {
        self.props.get(key).and_then(Prop::as_recipe)
    }

    /// String value of `key`, if it is a JSON string.
    pub fn str_prop(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(Value::as_str)
    }

    pub fn test_id_value(&self) -> Option<&str> {
        self.str_prop("testId")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_tag_round_trips_through_the_table() {
        for (tag, ty) in FIELD_TABLE {
            assert_eq!(FieldType::from_tag(tag), Some(*ty));
            assert_eq!(ty.tag(), *tag);
        }
        assert_eq!(FIELD_TABLE.len(), 37);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "lasagna-field".parse::<FieldType>().unwrap_err();
        assert!(matches!(err, Error::UnknownFieldType(t) if t == "lasagna-field"));
    }

    #[test]
    fn node_serializes_with_flat_props() {
        let node = FieldNode::new(FieldType::Text)
            .name("text")
            .test_id("text-field")
            .recipe("compute", Recipe::Const { value: json!("x") });
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(v["type"], "text-field");
        assert_eq!(v["name"], "text");
        assert_eq!(v["testId"], "text-field");
        assert_eq!(v["compute"]["$recipe"]["kind"], "const");
        assert!(v.get("fields").is_none());

        let back: FieldNode = serde_json::from_value(v).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn object_with_extra_keys_is_a_plain_value() {
        let v = json!({"type": "text-field", "sx": {"$recipe": {"kind": "echo"}, "x": 1}});
        let node: FieldNode = serde_json::from_value(v).unwrap();
        assert!(node.callback("sx").is_none());
        assert!(node.value("sx").is_some());
    }
}
