//! JSON Schema to attribute conversion.
//!
//! Spec types derive [`schemars::JsonSchema`]; their generated schema is walked here to
//! produce the attribute tree of a manifest data source. Doc comments on the Rust types
//! become attribute descriptions, `Option` fields become optional attributes and
//! externally tagged enums become nested objects with an exactly-one-of rule.

use super::{Attribute, AttributeKind, ElementType, Mode, NestedAttributes};
use crate::error::Error;
use crate::utilities::to_snake_case;
use crate::validators::Validator;
use schemars::generate::SchemaSettings;
use schemars::JsonSchema;
use serde_json::Value;
use std::collections::BTreeMap;

/// Builds the attribute tree for `T`.
pub fn attributes_for<T: JsonSchema>() -> Result<NestedAttributes, Error> {
    let generator = SchemaSettings::draft2020_12()
        .with(|s| s.inline_subschemas = true)
        .into_generator();
    let schema = generator.into_root_schema_for::<T>();
    let root = serde_json::to_value(&schema)?;
    attributes_from_json_schema(&root)
}

/// Builds an attribute tree from a JSON Schema document whose root is an object schema.
pub fn attributes_from_json_schema(root: &Value) -> Result<NestedAttributes, Error> {
    let converter = Converter { root };
    let schema = converter.normalize(root, "")?;
    converter.object_attributes(schema, "")
}

struct Converter<'a> {
    root: &'a Value,
}

impl<'a> Converter<'a> {
    /// Follows `$ref`, single-entry `allOf` and nullable `anyOf`/`oneOf` wrappers.
    fn normalize(&self, mut schema: &'a Value, path: &str) -> Result<&'a Value, Error> {
        for _ in 0..32 {
            if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
                schema = self.lookup(reference, path)?;
                continue;
            }
            if let Some(all) = schema.get("allOf").and_then(Value::as_array) {
                if all.len() == 1 && schema.get("properties").is_none() {
                    schema = &all[0];
                    continue;
                }
            }
            let union = schema.get("anyOf").or_else(|| schema.get("oneOf")).and_then(Value::as_array);
            if let Some(variants) = union {
                let non_null: Vec<&Value> = variants.iter().filter(|v| !is_null_schema(v)).collect();
                if non_null.len() == 1 && non_null.len() < variants.len() {
                    schema = non_null[0];
                    continue;
                }
            }
            return Ok(schema);
        }
        Err(Error::schema(path, "reference chain too deep"))
    }

    fn lookup(&self, reference: &str, path: &str) -> Result<&'a Value, Error> {
        let pointer = reference
            .strip_prefix('#')
            .ok_or_else(|| Error::schema(path, format!("external reference {reference} is not supported")))?;
        self.root
            .pointer(pointer)
            .ok_or_else(|| Error::schema(path, format!("unresolved reference {reference}")))
    }

    fn object_attributes(&self, schema: &'a Value, path: &str) -> Result<NestedAttributes, Error> {
        let mut properties: BTreeMap<String, &'a Value> = BTreeMap::new();
        let mut required: Vec<String> = Vec::new();
        self.collect_properties(schema, path, &mut properties, &mut required)?;

        let mut nested = NestedAttributes::new();
        for (json_name, property) in properties {
            let property_path = join(path, &json_name);
            let mode = if required.contains(&json_name) {
                Mode::Required
            } else {
                Mode::Optional
            };
            let attribute = self.attribute(property, mode, &property_path)?.json(&json_name);
            insert_unique(&mut nested, to_snake_case(&json_name), attribute, &property_path)?;
        }
        Ok(nested)
    }

    // Gathers properties from the schema and any `allOf` members merged into it.
    fn collect_properties(
        &self,
        schema: &'a Value,
        path: &str,
        properties: &mut BTreeMap<String, &'a Value>,
        required: &mut Vec<String>,
    ) -> Result<(), Error> {
        let schema = self.normalize(schema, path)?;
        if let Some(props) = schema.get("properties").and_then(Value::as_object) {
            for (k, v) in props {
                properties.insert(k.clone(), v);
            }
        }
        if let Some(req) = schema.get("required").and_then(Value::as_array) {
            required.extend(req.iter().filter_map(Value::as_str).map(str::to_string));
        }
        if let Some(all) = schema.get("allOf").and_then(Value::as_array) {
            for member in all {
                self.collect_properties(member, path, properties, required)?;
            }
        }
        Ok(())
    }

    fn attribute(&self, raw: &'a Value, mode: Mode, path: &str) -> Result<Attribute, Error> {
        let schema = self.normalize(raw, path)?;
        let description = description_of(raw).or_else(|| description_of(schema)).unwrap_or_default();

        if let Some(values) = string_enum(schema) {
            return Ok(Attribute::new(AttributeKind::String, mode)
                .describe(&description)
                .validate_with(Validator::OneOf(values)));
        }
        if let Some(variants) = self.union_variants(schema, path)? {
            let mut nested = NestedAttributes::new();
            let mut names = Vec::new();
            for (json_name, payload, variant_description) in variants {
                let tf_name = to_snake_case(&json_name);
                let variant_path = join(path, &json_name);
                let mut attribute = self.attribute(payload, Mode::Optional, &variant_path)?.json(&json_name);
                if attribute.description.is_empty() {
                    if let Some(d) = variant_description {
                        attribute = attribute.describe(&d);
                    }
                }
                names.push(tf_name.clone());
                insert_unique(&mut nested, tf_name, attribute, &variant_path)?;
            }
            names.sort();
            return Ok(Attribute::new(AttributeKind::Object(nested), mode)
                .describe(&description)
                .validate_with(Validator::ExactlyOneOf(names)));
        }

        let kind = match primary_type(schema) {
            Some("string") => AttributeKind::String,
            Some("integer") => {
                let (min, max) = (bound(schema, "minimum"), bound(schema, "maximum"));
                if min.is_some() || max.is_some() {
                    return Ok(Attribute::new(AttributeKind::Int64, mode)
                        .describe(&description)
                        .validate_with(Validator::IntRange { min, max }));
                }
                AttributeKind::Int64
            }
            Some("number") => AttributeKind::Float64,
            Some("boolean") => AttributeKind::Bool,
            Some("array") => {
                let items = schema
                    .get("items")
                    .ok_or_else(|| Error::schema(path, "array without items"))?;
                let items = self.normalize(items, path)?;
                match self.element_type(items) {
                    Some(element) => AttributeKind::List(element),
                    None => AttributeKind::ListNested(self.nested_of(items, path)?),
                }
            }
            Some("object") | None if has_properties(schema) => {
                AttributeKind::Object(self.object_attributes(schema, path)?)
            }
            Some("object") => match schema.get("additionalProperties") {
                Some(Value::Object(_)) => {
                    let values = self.normalize(&schema["additionalProperties"], path)?;
                    match self.element_type(values) {
                        Some(element) => AttributeKind::Map(element),
                        None => AttributeKind::MapNested(self.nested_of(values, path)?),
                    }
                }
                _ => AttributeKind::Map(ElementType::String),
            },
            other => {
                return Err(Error::schema(
                    path,
                    format!("cannot map JSON Schema type {:?} to an attribute", other),
                ))
            }
        };
        Ok(Attribute::new(kind, mode).describe(&description))
    }

    // Element schemas of lists and maps that are objects or unions become nested attributes.
    fn nested_of(&self, schema: &'a Value, path: &str) -> Result<NestedAttributes, Error> {
        if has_properties(schema) {
            return self.object_attributes(schema, path);
        }
        Err(Error::schema(path, "collection elements must be primitives or objects"))
    }

    fn element_type(&self, schema: &Value) -> Option<ElementType> {
        if string_enum(schema).is_some() {
            return Some(ElementType::String);
        }
        match primary_type(schema) {
            Some("string") => Some(ElementType::String),
            Some("integer") => Some(ElementType::Int64),
            Some("number") => Some(ElementType::Float64),
            Some("boolean") => Some(ElementType::Bool),
            _ => None,
        }
    }

    /// Recognizes an externally tagged enum: every variant is an object with exactly one
    /// required property. Returns the variant names with their payload schemas and the
    /// variants' own descriptions.
    fn union_variants(&self, schema: &'a Value, path: &str) -> Result<Option<Vec<Variant<'a>>>, Error> {
        let Some(variants) = schema.get("oneOf").or_else(|| schema.get("anyOf")).and_then(Value::as_array) else {
            return Ok(None);
        };
        let mut out = Vec::new();
        for variant in variants.iter().filter(|v| !is_null_schema(v)) {
            let variant = self.normalize(variant, path)?;
            let props = variant.get("properties").and_then(Value::as_object);
            match props {
                Some(props) if props.len() == 1 => {
                    if let Some((name, payload)) = props.iter().next() {
                        out.push((name.clone(), payload, description_of(variant)));
                    }
                }
                _ => {
                    return Err(Error::schema(
                        path,
                        "only externally tagged enums with data variants are supported",
                    ))
                }
            }
        }
        Ok(Some(out))
    }
}

type Variant<'a> = (String, &'a Value, Option<String>);

// Distinct JSON names can fold to the same snake_case name, e.g. `fooBar` and `foo_bar`.
fn insert_unique(nested: &mut NestedAttributes, name: String, attribute: Attribute, path: &str) -> Result<(), Error> {
    if nested.attributes.contains_key(&name) {
        return Err(Error::schema(path, format!("attribute name collision on {:?}", name)));
    }
    nested.attributes.insert(name, attribute);
    Ok(())
}

/// Integer bound of an integer schema; fractional bounds are ignored.
fn bound(schema: &Value, keyword: &str) -> Option<i64> {
    schema.get(keyword).and_then(Value::as_i64)
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn is_null_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("null") || schema.get("const") == Some(&Value::Null)
}

fn has_properties(schema: &Value) -> bool {
    schema.get("properties").is_some() || schema.get("allOf").is_some()
}

/// First non-null entry of `type`, which may be a string or an array.
fn primary_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(t) => Some(t.as_str()),
        Value::Array(types) => types.iter().filter_map(Value::as_str).find(|t| *t != "null"),
        _ => None,
    }
}

fn description_of(schema: &Value) -> Option<String> {
    schema
        .get("description")
        .or_else(|| schema.get("title"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// String enums come as `enum`, as `const`, or as a `oneOf` of documented constants.
fn string_enum(schema: &Value) -> Option<Vec<String>> {
    if let Some(values) = schema.get("enum").and_then(Value::as_array) {
        let strings: Vec<String> = values.iter().filter_map(Value::as_str).map(str::to_string).collect();
        return (!strings.is_empty()).then_some(strings);
    }
    if let Some(c) = schema.get("const").and_then(Value::as_str) {
        return Some(vec![c.to_string()]);
    }
    let variants = schema.get("oneOf").or_else(|| schema.get("anyOf"))?.as_array()?;
    let mut strings = Vec::new();
    for variant in variants.iter().filter(|v| !is_null_schema(v)) {
        strings.extend(string_enum(variant)?);
    }
    (!strings.is_empty()).then_some(strings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    /// Probe description.
    #[derive(Serialize, Deserialize, JsonSchema)]
    #[serde(rename_all = "camelCase")]
    struct Probe {
        /// Address to probe.
        endpoint: String,
        /// Fail when slower than this many milliseconds.
        threshold_millis: Option<i64>,
        skip_tls_verify: Option<bool>,
        ratio: Option<f64>,
        codes: Option<Vec<i64>>,
        headers: Option<BTreeMap<String, String>>,
        auth: Option<Auth>,
        steps: Option<Vec<Step>>,
        method: Option<Method>,
        retries: Option<u32>,
    }

    #[derive(Serialize, Deserialize, JsonSchema)]
    #[serde(rename_all = "camelCase")]
    struct Auth {
        username: Option<String>,
        /// Where to read the password from.
        password_from: Option<Source>,
    }

    #[derive(Serialize, Deserialize, JsonSchema)]
    #[serde(rename_all = "camelCase")]
    enum Source {
        /// Key of a Secret.
        SecretKeyRef(Key),
        /// Service account token.
        ServiceAccount(String),
    }

    #[derive(Serialize, Deserialize, JsonSchema)]
    struct Key {
        name: String,
        key: String,
    }

    #[derive(Serialize, Deserialize, JsonSchema)]
    struct Step {
        name: Option<String>,
    }

    #[derive(Serialize, Deserialize, JsonSchema)]
    #[serde(rename_all = "UPPERCASE")]
    enum Method {
        Get,
        Post,
    }

    fn probe() -> NestedAttributes {
        attributes_for::<Probe>().unwrap()
    }

    #[test]
    fn test_primitive_kinds_and_modes() {
        let attrs = probe();
        let endpoint = attrs.get("endpoint").unwrap();
        assert_eq!(endpoint.kind, AttributeKind::String);
        assert_eq!(endpoint.mode, Mode::Required);
        assert_eq!(endpoint.json_name.as_deref(), Some("endpoint"));
        assert_eq!(endpoint.description, "Address to probe.");

        let threshold = attrs.get("threshold_millis").unwrap();
        assert_eq!(threshold.kind, AttributeKind::Int64);
        assert_eq!(threshold.mode, Mode::Optional);
        assert_eq!(threshold.json_name.as_deref(), Some("thresholdMillis"));

        assert_eq!(attrs.get("skip_tls_verify").unwrap().kind, AttributeKind::Bool);
        assert_eq!(attrs.get("ratio").unwrap().kind, AttributeKind::Float64);
    }

    #[test]
    fn test_collections() {
        let attrs = probe();
        assert_eq!(attrs.get("codes").unwrap().kind, AttributeKind::List(ElementType::Int64));
        assert_eq!(attrs.get("headers").unwrap().kind, AttributeKind::Map(ElementType::String));
        match &attrs.get("steps").unwrap().kind {
            AttributeKind::ListNested(nested) => assert!(nested.get("name").is_some()),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_string_enum_gets_one_of() {
        let method = probe().get("method").cloned().unwrap();
        assert_eq!(method.kind, AttributeKind::String);
        assert_eq!(
            method.validators,
            vec![Validator::OneOf(vec!["GET".to_string(), "POST".to_string()])]
        );
    }

    #[test]
    fn test_tagged_union_becomes_exactly_one_of_object() {
        let attrs = probe();
        let auth = attrs.get("auth").unwrap().nested().unwrap();
        let from = auth.get("password_from").unwrap();
        assert_eq!(from.description, "Where to read the password from.");
        assert_eq!(
            from.validators,
            vec![Validator::ExactlyOneOf(vec![
                "secret_key_ref".to_string(),
                "service_account".to_string()
            ])]
        );
        let variants = from.nested().unwrap();
        let secret = variants.get("secret_key_ref").unwrap();
        assert_eq!(secret.json_name.as_deref(), Some("secretKeyRef"));
        assert_eq!(secret.mode, Mode::Optional);
        assert_eq!(secret.nested().unwrap().get("key").unwrap().mode, Mode::Required);
        assert_eq!(variants.get("service_account").unwrap().kind, AttributeKind::String);
        assert_eq!(secret.description, "Key of a Secret.");
        assert_eq!(variants.get("service_account").unwrap().description, "Service account token.");
    }

    #[test]
    fn test_unsigned_integer_gets_lower_bound() {
        let attrs = probe();
        let retries = attrs.get("retries").unwrap();
        assert_eq!(retries.kind, AttributeKind::Int64);
        assert!(matches!(
            retries.validators.as_slice(),
            [Validator::IntRange { min: Some(0), .. }]
        ));
        assert!(attrs.get("threshold_millis").unwrap().validators.is_empty());
    }

    #[test]
    fn test_snake_case_collision_is_an_error() {
        let root = json!({
            "type": "object",
            "properties": {
                "fooBar": {"type": "string"},
                "foo_bar": {"type": "string"}
            }
        });
        let err = attributes_from_json_schema(&root).unwrap_err();
        assert!(err.to_string().contains("attribute name collision"));
    }

    #[test]
    fn test_refs_are_resolved() {
        let root = json!({
            "type": "object",
            "properties": {
                "target": {"$ref": "#/$defs/Target", "description": "Outer text"}
            },
            "$defs": {
                "Target": {
                    "type": "object",
                    "description": "Inner text",
                    "properties": {"host": {"type": "string"}},
                    "required": ["host"]
                }
            }
        });
        let attrs = attributes_from_json_schema(&root).unwrap();
        let target = attrs.get("target").unwrap();
        assert_eq!(target.description, "Outer text");
        assert_eq!(target.nested().unwrap().get("host").unwrap().mode, Mode::Required);
    }

    #[test]
    fn test_unresolved_ref_is_an_error() {
        let root = json!({
            "type": "object",
            "properties": {"target": {"$ref": "#/$defs/Missing"}}
        });
        let err = attributes_from_json_schema(&root).unwrap_err();
        assert!(err.to_string().contains("target"));
    }
}
