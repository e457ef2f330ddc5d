//! Recursive key-presence templates for parsed responses.

use std::collections::BTreeMap;

use serde_json::Value;

use super::ValidationError;
use crate::coordinator::ConfigurationError;

/// Expected response shape.
///
/// A [`Prototype::Required`] leaf only demands that its key exists. A
/// [`Prototype::Node`] demands that its key exists, holds a container, and
/// satisfies the nested prototype. Keys the prototype does not mention are
/// always allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prototype {
    Required,
    Node(BTreeMap<String, Prototype>),
}

impl Prototype {
    /// Builds an internal node from `(key, child)` pairs.
    pub fn node<K: Into<String>>(children: impl IntoIterator<Item = (K, Prototype)>) -> Self {
        Self::Node(children.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds a node whose children are all required leaves.
    pub fn keys<K: Into<String>>(keys: impl IntoIterator<Item = K>) -> Self {
        Self::node(keys.into_iter().map(|k| (k, Self::Required)))
    }

    /// Builds a prototype from a JSON template.
    ///
    /// Objects become nodes; `true`, strings, and `null` mark required leaves.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MalformedPrototype`] for numbers, `false`,
    /// or arrays anywhere in the template.
    pub fn from_value(template: &Value) -> Result<Self, ConfigurationError> {
        Self::from_value_at(template, "")
    }

    fn from_value_at(template: &Value, path: &str) -> Result<Self, ConfigurationError> {
        match template {
            Value::Object(map) => {
                let mut children = BTreeMap::new();
                for (key, child) in map {
                    let child_path = join_path(path, key);
                    children.insert(key.clone(), Self::from_value_at(child, &child_path)?);
                }
                Ok(Self::Node(children))
            }
            Value::Bool(true) | Value::String(_) | Value::Null => Ok(Self::Required),
            other => Err(ConfigurationError::malformed_prototype(
                path,
                format!("unsupported marker {other}"),
            )),
        }
    }

    /// Checks that `value` has every key this prototype names.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingKey`] or
    /// [`ValidationError::NotContainer`] naming the first offending path.
    pub fn check(&self, value: &Value) -> Result<(), ValidationError> {
        self.check_at(value, "")
    }

    fn check_at(&self, value: &Value, path: &str) -> Result<(), ValidationError> {
        let Self::Node(children) = self else {
            return Ok(());
        };
        if !is_container(value) {
            return Err(ValidationError::not_container(path));
        }
        for (key, child) in children {
            let child_path = join_path(path, key);
            let Some(child_value) = lookup(value, key) else {
                return Err(ValidationError::missing_key(child_path));
            };
            child.check_at(child_value, &child_path)?;
        }
        Ok(())
    }
}

/// Objects and arrays count as containers.
pub(crate) fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Arrays are addressed by decimal index keys.
fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}
