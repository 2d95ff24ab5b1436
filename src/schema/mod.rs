//! Attribute schema for manifest data sources.
//!
//! A [`Schema`] describes the configuration a data source accepts, the way the Terraform
//! plugin framework does: a tree of named attributes, each with a kind, a mode
//! (required, optional or computed), a description and validators.
//!
//! Every attribute knows two names: the configuration name (snake_case) and the name the
//! value takes in the rendered manifest (camelCase JSON). [`Schema::manifest_value`]
//! uses the pair to turn a configuration into a manifest document.

pub mod convert;
pub mod validate;

use crate::error::Error;
use crate::validators::Validator;
use serde::Serialize;
use serde_json::{Map as JsonMap, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Required,
    Optional,
    Computed,
}

/// Primitive element type of list and map attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    String,
    Int64,
    Float64,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "element", rename_all = "snake_case")]
pub enum AttributeKind {
    String,
    Int64,
    Float64,
    Bool,
    Map(ElementType),
    List(ElementType),
    Object(NestedAttributes),
    ListNested(NestedAttributes),
    MapNested(NestedAttributes),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NestedAttributes {
    pub attributes: BTreeMap<String, Attribute>,
}

impl NestedAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    #[serde(flatten)]
    pub kind: AttributeKind,
    pub mode: Mode,
    /// Key used in the manifest; `None` for attributes that exist only in state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_name: Option<String>,
    pub description: String,
    pub markdown_description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
}

impl Attribute {
    pub fn new(kind: AttributeKind, mode: Mode) -> Self {
        Self {
            kind,
            mode,
            json_name: None,
            description: String::new(),
            markdown_description: String::new(),
            validators: Vec::new(),
        }
    }

    pub fn required(kind: AttributeKind) -> Self {
        Self::new(kind, Mode::Required)
    }

    pub fn optional(kind: AttributeKind) -> Self {
        Self::new(kind, Mode::Optional)
    }

    pub fn computed(kind: AttributeKind) -> Self {
        Self::new(kind, Mode::Computed)
    }

    pub fn json(mut self, name: &str) -> Self {
        self.json_name = Some(name.to_string());
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self.markdown_description = description.to_string();
        self
    }

    pub fn validate_with(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn nested(&self) -> Option<&NestedAttributes> {
        match &self.kind {
            AttributeKind::Object(n) | AttributeKind::ListNested(n) | AttributeKind::MapNested(n) => {
                Some(n)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub description: String,
    pub markdown_description: String,
    pub attributes: NestedAttributes,
}

impl Schema {
    pub fn new(description: &str, attributes: NestedAttributes) -> Self {
        Self {
            description: description.to_string(),
            markdown_description: description.to_string(),
            attributes,
        }
    }

    /// Rewrites a configuration object into the manifest document it describes:
    /// attribute names become manifest keys, nulls and state-only attributes are dropped.
    pub fn manifest_value(&self, config: &Value) -> Result<Value, Error> {
        match config {
            Value::Object(obj) => Ok(Value::Object(rekey_object(&self.attributes, obj)?)),
            other => Err(Error::Decode {
                message: format!("configuration must be an object, got {}", json_type(other)),
            }),
        }
    }
}

fn rekey_object(
    nested: &NestedAttributes,
    obj: &JsonMap<String, Value>,
) -> Result<JsonMap<String, Value>, Error> {
    let mut out = JsonMap::new();
    for (name, value) in obj {
        if value.is_null() {
            continue;
        }
        let attribute = nested.get(name).ok_or_else(|| Error::Decode {
            message: format!("unexpected attribute {:?}", name),
        })?;
        let Some(json_name) = &attribute.json_name else {
            continue;
        };
        out.insert(json_name.clone(), rekey_value(attribute, value)?);
    }
    Ok(out)
}

fn rekey_value(attribute: &Attribute, value: &Value) -> Result<Value, Error> {
    let mismatch = |expected: &str| Error::Decode {
        message: format!("expected {}, got {}", expected, json_type(value)),
    };
    match (&attribute.kind, value) {
        (AttributeKind::Object(nested), Value::Object(obj)) => {
            Ok(Value::Object(rekey_object(nested, obj)?))
        }
        (AttributeKind::Object(_), _) => Err(mismatch("object")),
        (AttributeKind::ListNested(nested), Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| match item {
                Value::Object(obj) => rekey_object(nested, obj).map(Value::Object),
                _ => Err(mismatch("list of objects")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (AttributeKind::ListNested(_), _) => Err(mismatch("list")),
        (AttributeKind::MapNested(nested), Value::Object(entries)) => {
            let mut out = JsonMap::new();
            for (key, item) in entries {
                match item {
                    Value::Object(obj) => {
                        out.insert(key.clone(), Value::Object(rekey_object(nested, obj)?));
                    }
                    Value::Null => {}
                    _ => return Err(mismatch("map of objects")),
                }
            }
            Ok(Value::Object(out))
        }
        (AttributeKind::MapNested(_), _) => Err(mismatch("map")),
        (AttributeKind::Map(_), Value::Object(entries)) => Ok(Value::Object(
            entries
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )),
        (AttributeKind::List(_), Value::Array(items)) => Ok(Value::Array(
            items.iter().filter(|v| !v.is_null()).cloned().collect(),
        )),
        _ => Ok(value.clone()),
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
