//! Value codec for the launch wire format
//!
//! On the driver side every node-local property is turned into text unless it
//! is a structural array or object, which travel as-is. Callback recipes count
//! as text values even though they are stored as marker objects. On the page
//! side text is parsed back; anything that does not parse stays an opaque
//! string.

use log::trace;
use serde_json::{Map, Value};

use crate::flatten::{is_nesting_key, visit_wire_mut};
use crate::schema::{FieldNode, FieldType, RECIPE_KEY};
use crate::{Error, Result};

/// Encode one property value for transmission.
pub fn encode_value(value: &Value) -> Value {
    match value {
        v if is_recipe_marker(v) => Value::String(v.to_string()),
        Value::Array(_) | Value::Object(_) => value.clone(),
        scalar => Value::String(scalar.to_string()),
    }
}

/// Decode one transmitted property value. Never fails.
pub fn decode_value(value: Value) -> Value {
    match value {
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => parsed,
            Err(_) => {
                trace!("keeping opaque token {:?}", text);
                Value::String(text)
            }
        },
        other => other,
    }
}

/// Decode a transmitted `type` value and map it through the tag table.
pub fn decode_type(value: Value) -> Result<FieldType> {
    match decode_value(value) {
        Value::String(tag) => FieldType::from_tag(&tag).ok_or(Error::UnknownFieldType(tag)),
        other => Err(Error::UnknownFieldType(other.to_string())),
    }
}

fn is_recipe_marker(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.len() == 1 && map.contains_key(RECIPE_KEY))
}

/// Encode a schema for transmission. The caller's schema is left untouched.
pub fn encode_fields(fields: &[FieldNode]) -> Result<Vec<Value>> {
    let mut wire = match serde_json::to_value(fields)? {
        Value::Array(nodes) => nodes,
        other => return Err(Error::CodecError(format!("schema encoded as {}", other))),
    };
    visit_wire_mut(&mut wire, &mut |node: &mut Map<String, Value>| {
        for (key, value) in node.iter_mut() {
            if is_nesting_key(key) {
                continue;
            }
            *value = encode_value(value);
        }
        Ok(())
    })?;
    Ok(wire)
}

/// Decode a transmitted schema back into typed nodes.
pub fn decode_fields(mut wire: Vec<Value>) -> Result<Vec<FieldNode>> {
    visit_wire_mut(&mut wire, &mut |node: &mut Map<String, Value>| {
        let raw_type = node
            .remove("type")
            .ok_or_else(|| Error::CodecError("field without type".to_string()))?;
        let field_type = decode_type(raw_type)?;
        for (key, value) in node.iter_mut() {
            if is_nesting_key(key) {
                continue;
            }
            *value = decode_value(std::mem::take(value));
        }
        node.insert("type".to_string(), Value::String(field_type.tag().to_string()));
        Ok(())
    })?;
    Ok(serde_json::from_value(Value::Array(wire))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::Recipe;
    use serde_json::json;

    #[test]
    fn scalars_become_text_and_structures_pass_through() {
        assert_eq!(encode_value(&json!("Hello")), json!("\"Hello\""));
        assert_eq!(encode_value(&json!(3)), json!("3"));
        assert_eq!(encode_value(&json!(true)), json!("true"));
        assert_eq!(encode_value(&json!(["a"])), json!(["a"]));
        assert_eq!(encode_value(&json!({"a": 1})), json!({"a": 1}));
    }

    #[test]
    fn unparseable_text_stays_opaque() {
        assert_eq!(decode_value(json!("not json {")), json!("not json {"));
        assert_eq!(decode_value(json!("\"quoted\"")), json!("quoted"));
        assert_eq!(decode_value(json!(12)), json!(12));
    }

    #[test]
    fn bare_and_quoted_tags_both_resolve() {
        assert_eq!(decode_type(json!("text-field")).unwrap(), FieldType::Text);
        assert_eq!(decode_type(json!("\"group-layout\"")).unwrap(), FieldType::Group);
        assert!(matches!(
            decode_type(json!("nope")),
            Err(Error::UnknownFieldType(t)) if t == "nope"
        ));
    }

    #[test]
    fn encode_does_not_touch_nesting_keys() {
        let fields = vec![FieldNode::new(FieldType::Group)
            .with_fields(vec![FieldNode::new(FieldType::Text).name("inner")])];
        let wire = encode_fields(&fields).unwrap();
        assert!(wire[0]["fields"].is_array());
        assert_eq!(wire[0]["fields"][0]["name"], json!("\"inner\""));
        assert_eq!(wire[0]["type"], json!("\"group-layout\""));
    }

    #[test]
    fn recipe_travels_as_text() {
        let fields = vec![FieldNode::new(FieldType::Button).recipe("isDisabled", Recipe::Echo)];
        let wire = encode_fields(&fields).unwrap();
        assert!(wire[0]["isDisabled"].is_string());
        let back = decode_fields(wire).unwrap();
        assert_eq!(back[0].callback("isDisabled"), Some(&Recipe::Echo));
    }

    #[test]
    fn missing_type_is_an_error() {
        let err = decode_fields(vec![json!({"name": "\"x\""})]).unwrap_err();
        assert!(matches!(err, Error::CodecError(_)));
    }
}
