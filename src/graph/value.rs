//! Property values with deferred references.
//!
//! A property is either a literal, an [`Output`] naming an attribute of
//! another resource that only exists once that resource has been created,
//! or a template interleaving text and outputs. Every output found in a
//! node's properties is also a dependency edge of that node.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Index of a node inside its [`ResourceGraph`](super::ResourceGraph).
///
/// Ids are non-owning and only ever used for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(usize);

/// Deferred reference to an attribute of another resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Output {
    /// Resource exposing the attribute.
    pub resource: ResourceId,
    /// Attribute name, e.g. `id` or `public_ip`.
    pub attribute: String,
}

/// A property value, generic over the representation of deferred references.
///
/// Inside the graph references are [`Output`]s; once emitted they become
/// engine handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Value<R> {
    /// Deferred attribute of another resource.
    Output(R),
    /// Text with interpolated outputs.
    Template(Vec<TemplatePart<R>>),
    /// Sensitive string, redacted whenever serialized.
    #[serde(serialize_with = "redact")]
    Secret(String),
    /// Plain string.
    #[serde(untagged)]
    String(String),
    /// Integer.
    #[serde(untagged)]
    Integer(i64),
    /// Boolean.
    #[serde(untagged)]
    Bool(bool),
    /// Ordered list.
    #[serde(untagged)]
    List(Vec<Value<R>>),
    /// String-keyed map.
    #[serde(untagged)]
    Map(BTreeMap<String, Value<R>>),
}

/// One segment of a [`Value::Template`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplatePart<R> {
    /// Literal text.
    Text(String),
    /// Interpolated output.
    Output(R),
    /// Interpolated secret.
    #[serde(serialize_with = "redact")]
    Secret(String),
}

/// Placeholder written instead of a secret.
pub const REDACTED: &str = "********";

fn redact<T: ?Sized, S: Serializer>(_: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(REDACTED)
}

/// Property value as stored in the graph.
pub type PropertyValue = Value<Output>;

/// Properties of a node, keyed by provider property name.
pub type Properties = BTreeMap<String, PropertyValue>;

impl ResourceId {
    /// Wraps a raw index.
    #[must_use]
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    /// References an attribute of this resource.
    #[must_use]
    pub fn output(self, attribute: impl Into<String>) -> Output {
        Output {
            resource: self,
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.attribute)
    }
}

impl<R> Value<R> {
    /// Builds a list from anything convertible into values.
    pub fn list<T: Into<Self>>(items: impl IntoIterator<Item = T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Builds a map from key/value pairs.
    pub fn map<K: Into<String>, T: Into<Self>>(entries: impl IntoIterator<Item = (K, T)>) -> Self {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Collects every deferred reference, depth first.
    pub fn outputs(&self) -> Vec<&R> {
        let mut found = Vec::new();
        self.collect_outputs(&mut found);
        found
    }

    fn collect_outputs<'a>(&'a self, found: &mut Vec<&'a R>) {
        match self {
            Self::Output(r) => found.push(r),
            Self::Template(parts) => {
                found.extend(parts.iter().filter_map(|part| match part {
                    TemplatePart::Output(r) => Some(r),
                    TemplatePart::Text(_) | TemplatePart::Secret(_) => None,
                }));
            }
            Self::List(items) => {
                for item in items {
                    item.collect_outputs(found);
                }
            }
            Self::Map(entries) => {
                for value in entries.values() {
                    value.collect_outputs(found);
                }
            }
            Self::Secret(_) | Self::String(_) | Self::Integer(_) | Self::Bool(_) => {}
        }
    }

    /// Translates every deferred reference, keeping literals as they are.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    pub fn try_map_outputs<S, E>(
        &self,
        f: &mut impl FnMut(&R) -> Result<S, E>,
    ) -> Result<Value<S>, E> {
        Ok(match self {
            Self::Output(r) => Value::Output(f(r)?),
            Self::Template(parts) => {
                let mut mapped = Vec::with_capacity(parts.len());
                for part in parts {
                    mapped.push(match part {
                        TemplatePart::Text(text) => TemplatePart::Text(text.clone()),
                        TemplatePart::Output(r) => TemplatePart::Output(f(r)?),
                        TemplatePart::Secret(secret) => TemplatePart::Secret(secret.clone()),
                    });
                }
                Value::Template(mapped)
            }
            Self::List(items) => {
                let mut mapped = Vec::with_capacity(items.len());
                for item in items {
                    mapped.push(item.try_map_outputs(f)?);
                }
                Value::List(mapped)
            }
            Self::Map(entries) => {
                let mut mapped = BTreeMap::new();
                for (key, value) in entries {
                    mapped.insert(key.clone(), value.try_map_outputs(f)?);
                }
                Value::Map(mapped)
            }
            Self::Secret(s) => Value::Secret(s.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::Integer(*i),
            Self::Bool(b) => Value::Bool(*b),
        })
    }

    /// Returns the string literal, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl<R> TemplatePart<R> {
    /// Literal text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

impl<R> From<&str> for Value<R> {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl<R> From<String> for Value<R> {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<R> From<&String> for Value<R> {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl<R> From<i64> for Value<R> {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl<R> From<u32> for Value<R> {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl<R> From<u16> for Value<R> {
    fn from(value: u16) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl<R> From<bool> for Value<R> {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Output> for PropertyValue {
    fn from(value: Output) -> Self {
        Self::Output(value)
    }
}

impl<R> From<crate::network::CidrBlock> for Value<R> {
    fn from(value: crate::network::CidrBlock) -> Self {
        Self::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outputs_are_found_everywhere() {
        let a = ResourceId::new(0);
        let b = ResourceId::new(1);
        let value: PropertyValue = Value::map([
            ("plain", Value::from("x")),
            ("direct", Value::from(a.output("id"))),
            ("nested", Value::list([Value::from(b.output("name"))])),
            (
                "script",
                Value::Template(vec![
                    TemplatePart::text("HOST="),
                    TemplatePart::Output(b.output("address")),
                ]),
            ),
        ]);

        let found: Vec<String> = value.outputs().iter().map(ToString::to_string).collect();
        assert_eq!(found, vec!["#0.id", "#1.name", "#1.address"]);
    }

    #[test]
    fn test_try_map_outputs_translates_references() {
        let value: PropertyValue = Value::list([
            Value::from(ResourceId::new(2).output("id")),
            Value::from(7u32),
        ]);

        let mapped: Value<String> = value
            .try_map_outputs(&mut |o: &Output| Ok::<_, ()>(format!("res-{}", o.resource.index())))
            .unwrap();

        assert_eq!(
            mapped,
            Value::List(vec![Value::Output(String::from("res-2")), Value::Integer(7)])
        );
    }

    #[test]
    fn test_try_map_outputs_stops_on_error() {
        let value: PropertyValue = Value::from(ResourceId::new(0).output("id"));
        let result: Result<Value<()>, &str> =
            value.try_map_outputs(&mut |_: &Output| Err("unresolved"));
        assert_eq!(result, Err("unresolved"));
    }

    #[test]
    fn test_literal_serialization_is_untagged() {
        let value: PropertyValue = Value::map([("cidr", Value::from("10.0.0.0/16"))]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"cidr":"10.0.0.0/16"}"#);

        let output: PropertyValue = Value::from(ResourceId::new(3).output("id"));
        let json = serde_json::to_string(&output).unwrap();
        assert_eq!(json, r#"{"output":{"resource":3,"attribute":"id"}}"#);
    }

    #[test]
    fn test_secrets_are_redacted() {
        let value: PropertyValue = Value::Template(vec![
            TemplatePart::text("PASSWORD="),
            TemplatePart::Secret(String::from("hunter2")),
        ]);
        let json = serde_json::to_string(&value).unwrap();

        assert!(!json.contains("hunter2"));
        assert!(json.contains(REDACTED));

        let secret: PropertyValue = Value::Secret(String::from("hunter2"));
        assert_eq!(serde_json::to_string(&secret).unwrap(), r#"{"secret":"********"}"#);
    }
}
