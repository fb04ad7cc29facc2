//! Field access over `serde_yaml::Value` trees.
//!
//! Controller descriptions are parsed by explicit functions in each generator
//! crate; these helpers keep the probing for optional keys in one place.

use serde_yaml::Value;

use crate::error::{GenError, Result};

/// A named child of a collection node such as `target` or `link`.
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    /// `None` when a sequence item has no `name` key.
    pub name: Option<&'a str>,
    pub node: &'a Value,
    pub position: usize,
}

/// Look up `key` in a mapping node.
pub fn get<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    node.as_mapping().and_then(|m| m.get(key))
}

pub fn has_key(node: &Value, key: &str) -> bool {
    get(node, key).is_some()
}

/// Text of a scalar node. Strings, numbers and booleans are accepted.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A scalar field rendered as text; empty strings count as absent.
pub fn str_field(node: &Value, key: &str) -> Option<String> {
    get(node, key)
        .and_then(scalar_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Like [`str_field`] but missing is an error.
pub fn required_str(node: &Value, key: &str, context: &str) -> Result<String> {
    str_field(node, key).ok_or_else(|| GenError::MissingField {
        context: context.to_string(),
        field: key.to_string(),
    })
}

/// An unsigned integer field. Present but not an integer is an error.
pub fn u64_field(node: &Value, key: &str, context: &str) -> Result<Option<u64>> {
    let Some(value) = get(node, key) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => parse_integer(s.trim()),
        Value::Null => return Ok(None),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| GenError::InvalidValue {
        context: context.to_string(),
        detail: format!("`{key}` must be a non-negative integer"),
    })
}

fn parse_integer(text: &str) -> Option<u64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

/// A boolean field; `true`/`false` strings are accepted as well.
pub fn bool_field(node: &Value, key: &str) -> Option<bool> {
    match get(node, key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Children of a collection node.
///
/// Accepts a mapping `name: body` or a sequence of mappings carrying a
/// `name` key. A null or missing node yields no entries.
pub fn named_entries<'a>(node: Option<&'a Value>, context: &str) -> Result<Vec<Entry<'a>>> {
    match node {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Mapping(map)) => Ok(map
            .iter()
            .enumerate()
            .map(|(position, (key, body))| Entry {
                name: key.as_str(),
                node: body,
                position,
            })
            .collect()),
        Some(Value::Sequence(items)) => Ok(items
            .iter()
            .enumerate()
            .map(|(position, item)| Entry {
                name: get(item, "name").and_then(Value::as_str),
                node: item,
                position,
            })
            .collect()),
        Some(_) => Err(GenError::InvalidNode {
            context: context.to_string(),
        }),
    }
}

/// Sequence items of `key`, or the single node itself when it is a mapping.
pub fn items<'a>(node: &'a Value, key: &str) -> Vec<&'a Value> {
    match get(node, key) {
        Some(Value::Sequence(seq)) => seq.iter().collect(),
        Some(v @ Value::Mapping(_)) => vec![v],
        _ => Vec::new(),
    }
}

pub fn ensure_mapping(node: &Value, context: &str) -> Result<()> {
    if node.is_mapping() {
        Ok(())
    } else {
        Err(GenError::InvalidNode {
            context: context.to_string(),
        })
    }
}
