// Configuration validation against a schema. Runs before a data source read.

use super::{json_type, Attribute, AttributeKind, ElementType, Mode, NestedAttributes, Schema};
use crate::diag::{AttributePath, Diagnostics};
use serde_json::{Map as JsonMap, Value};

/// Checks `config` against `schema` and returns every problem found.
pub fn validate_config(schema: &Schema, config: &Value) -> Diagnostics {
    let mut diags = Diagnostics::new();
    match config {
        Value::Object(obj) => validate_object(&schema.attributes, obj, &AttributePath::root(), &mut diags),
        other => diags.add_error(
            "Invalid Configuration",
            format!("configuration must be an object, got {}", json_type(other)),
        ),
    }
    diags
}

fn validate_object(
    nested: &NestedAttributes,
    obj: &JsonMap<String, Value>,
    path: &AttributePath,
    diags: &mut Diagnostics,
) {
    for name in obj.keys() {
        if nested.get(name).is_none() {
            diags.add_attribute_error(
                &path.attribute(name),
                "Unsupported argument",
                format!("An argument named {:?} is not expected here.", name),
            );
        }
    }

    for (name, attribute) in &nested.attributes {
        let attr_path = path.attribute(name);
        let value = obj.get(name).unwrap_or(&Value::Null);
        match (attribute.mode, value.is_null()) {
            (Mode::Required, true) => diags.add_attribute_error(
                &attr_path,
                "Missing required argument",
                format!("The argument {:?} is required, but no definition was found.", name),
            ),
            (Mode::Computed, false) => diags.add_attribute_error(
                &attr_path,
                "Invalid Configuration for Read-Only Attribute",
                format!("Cannot set value for the {:?} attribute: it is computed by the provider.", name),
            ),
            (_, false) => validate_attribute(attribute, value, &attr_path, diags),
            (_, true) => {}
        }
    }
}

fn validate_attribute(attribute: &Attribute, value: &Value, path: &AttributePath, diags: &mut Diagnostics) {
    let shape_ok = match &attribute.kind {
        AttributeKind::String => expect(value.is_string(), "string", value, path, diags),
        AttributeKind::Int64 => expect(value.as_i64().is_some(), "int64", value, path, diags),
        AttributeKind::Float64 => expect(value.is_number(), "float64", value, path, diags),
        AttributeKind::Bool => expect(value.is_boolean(), "bool", value, path, diags),
        AttributeKind::Map(element) => match value.as_object() {
            Some(entries) => {
                for (key, item) in entries {
                    validate_element(*element, item, &path.key(key), diags);
                }
                true
            }
            None => expect(false, "map", value, path, diags),
        },
        AttributeKind::List(element) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    validate_element(*element, item, &path.index(i), diags);
                }
                true
            }
            None => expect(false, "list", value, path, diags),
        },
        AttributeKind::Object(nested) => match value.as_object() {
            Some(obj) => {
                validate_object(nested, obj, path, diags);
                true
            }
            None => expect(false, "object", value, path, diags),
        },
        AttributeKind::ListNested(nested) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    match item.as_object() {
                        Some(obj) => validate_object(nested, obj, &path.index(i), diags),
                        None => {
                            expect(false, "object", item, &path.index(i), diags);
                        }
                    }
                }
                true
            }
            None => expect(false, "list", value, path, diags),
        },
        AttributeKind::MapNested(nested) => match value.as_object() {
            Some(entries) => {
                for (key, item) in entries {
                    match item.as_object() {
                        Some(obj) => validate_object(nested, obj, &path.key(key), diags),
                        None => {
                            expect(false, "object", item, &path.key(key), diags);
                        }
                    }
                }
                true
            }
            None => expect(false, "map", value, path, diags),
        },
    };

    if shape_ok {
        for validator in &attribute.validators {
            validator.validate(path, value, diags);
        }
    }
}

fn validate_element(element: ElementType, value: &Value, path: &AttributePath, diags: &mut Diagnostics) {
    if value.is_null() {
        diags.add_attribute_error(path, "Invalid Attribute Value", "collection elements must not be null");
        return;
    }
    let (ok, expected) = match element {
        ElementType::String => (value.is_string(), "string"),
        ElementType::Int64 => (value.as_i64().is_some(), "int64"),
        ElementType::Float64 => (value.is_number(), "float64"),
        ElementType::Bool => (value.is_boolean(), "bool"),
    };
    expect(ok, expected, value, path, diags);
}

fn expect(ok: bool, expected: &str, value: &Value, path: &AttributePath, diags: &mut Diagnostics) -> bool {
    if !ok {
        diags.add_attribute_error(
            path,
            "Incorrect attribute value type",
            format!("Inappropriate value for attribute: {} required, got {}.", expected, json_type(value)),
        );
    }
    ok
}
