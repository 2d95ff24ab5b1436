// Helpers shared by every manifest data source.

use crate::diag::Diagnostic;
use crate::error::Error;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Serializes `value` to YAML the way `sigs.k8s.io/yaml` does: through a JSON document
/// first, so map keys come out sorted and only JSON-representable values pass.
pub fn marshal_yaml<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_value(value).map_err(|e| Error::Marshal {
        message: e.to_string(),
    })?;
    serde_yaml::to_string(&SortedKeys(&json)).map_err(|e| Error::Marshal {
        message: e.to_string(),
    })
}

// serde_json may be built with `preserve_order`, so key order is enforced here.
struct SortedKeys<'a>(&'a Value);

impl Serialize for SortedKeys<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                let mut out = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    out.serialize_entry(key, &SortedKeys(value))?;
                }
                out.end()
            }
            Value::Array(items) => serializer.collect_seq(items.iter().map(SortedKeys)),
            other => other.serialize(serializer),
        }
    }
}

pub fn marshal_yaml_error(err: &Error) -> Diagnostic {
    Diagnostic::error(
        "Unable to marshal YAML",
        format!(
            "An unexpected error occurred while marshalling the manifest into YAML. \
             Please report this issue to the provider developers.\n\nError: {}",
            err
        ),
    )
}

pub fn decode_config_error(err: &Error) -> Diagnostic {
    Diagnostic::error(
        "Unable to decode configuration",
        format!("The configuration could not be mapped onto the manifest model.\n\nError: {}", err),
    )
}

/// Converts a camelCase JSON property name into the snake_case attribute name,
/// keeping acronyms together: `skipTLSVerify` becomes `skip_tls_verify`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == '.' || c == ' ' {
            if !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_lower);
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}
