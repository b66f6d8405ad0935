//! Manifest-side field handling: default tables, pruning and typed lookups.

use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::record::{ManifestEntry, SideCar, Stripped};

/// Builds a default table from `(key, value)` pairs.
pub fn table<I>(pairs: I) -> Mapping
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (Value::from(key), value))
        .collect()
}

/// Drops every entry whose value equals the default declared for its key.
/// Keys without a declared default are always kept.
pub fn prune(snapshot: Mapping, defaults: &Mapping) -> Mapping {
    snapshot
        .into_iter()
        .filter(|(key, value)| defaults.get(key) != Some(value))
        .collect()
}

/// Assembles a child entry: `id` first, `quirky` when set, then the fields
/// that differ from `defaults`.
pub(crate) fn child_entry(
    stripped: &Stripped,
    snapshot: Vec<(&'static str, Value)>,
    defaults: &Mapping,
    code: Option<(&str, &str)>,
) -> ManifestEntry {
    let mut fields = Mapping::new();
    fields.insert("id".into(), stripped.id.clone().into());
    if stripped.quirky {
        fields.insert("quirky".into(), true.into());
    }
    fields.extend(prune(table(snapshot), defaults));

    let side_car = code.map(|(ext, content)| SideCar {
        file_name: format!("{}.{}", stripped.id, ext),
        content: content.trim().to_string(),
    });

    ManifestEntry { fields, side_car }
}

pub(crate) fn is_quirky(entry: &Mapping) -> bool {
    matches!(entry.get("quirky"), Some(Value::Bool(true)))
}

pub(crate) fn opt_string(value: Option<&str>) -> Value {
    value.map_or(Value::Null, Value::from)
}

pub(crate) fn opt_bool(value: Option<bool>) -> Value {
    value.map_or(Value::Null, Value::from)
}

pub(crate) fn string_list<S: AsRef<str>>(values: &[S]) -> Value {
    Value::Sequence(values.iter().map(|v| Value::from(v.as_ref())).collect())
}

/// Typed read access to a manifest entry, falling back to a default table
/// for absent keys.
pub(crate) struct Fields<'a> {
    entry: &'a Mapping,
    defaults: &'a Mapping,
}

impl<'a> Fields<'a> {
    pub fn new(entry: &'a Mapping, defaults: &'a Mapping) -> Self {
        Self { entry, defaults }
    }

    fn value(&self, key: &str) -> Option<&'a Value> {
        self.entry.get(key).or_else(|| self.defaults.get(key))
    }

    fn shape(key: &str, expected: &str) -> Error {
        Error::ManifestShape {
            reason: format!("\"{}\" should be {}", key, expected),
        }
    }

    pub fn id(&self) -> Result<String> {
        match self.entry.get("id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(Error::ManifestField { field: "id".into() }),
        }
    }

    pub fn quirky(&self) -> bool {
        is_quirky(self.entry)
    }

    pub fn bool(&self, key: &str) -> Result<bool> {
        match self.value(key) {
            Some(Value::Bool(b)) => Ok(*b),
            None | Some(Value::Null) => Ok(false),
            Some(_) => Err(Self::shape(key, "a boolean")),
        }
    }

    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.value(key) {
            Some(Value::Bool(b)) => Ok(Some(*b)),
            None | Some(Value::Null) => Ok(None),
            Some(_) => Err(Self::shape(key, "a boolean or null")),
        }
    }

    /// Scalars are accepted and rendered as text, as YAML readily turns
    /// values such as `12` or `yes` into non-strings.
    pub fn opt_string(&self, key: &str) -> Result<Option<String>> {
        match self.value(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(_) => Err(Self::shape(key, "a string")),
        }
    }

    pub fn string(&self, key: &str) -> Result<String> {
        self.opt_string(key)?.ok_or_else(|| Error::ManifestField {
            field: key.to_string(),
        })
    }

    pub fn string_list(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.opt_string_list(key)?.unwrap_or_default())
    }

    /// `None` when the key is absent or null, so an empty list stays
    /// distinct from no list.
    pub fn opt_string_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.value(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(Self::shape(key, "a list of strings")),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(_) => Err(Self::shape(key, "a list of strings")),
        }
    }

    pub fn int(&self, key: &str) -> Result<i64> {
        match self.value(key) {
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| Self::shape(key, "an integer")),
            Some(Value::String(s)) => s.trim().parse().map_err(|_| Self::shape(key, "an integer")),
            None | Some(Value::Null) => Err(Error::ManifestField {
                field: key.to_string(),
            }),
            Some(_) => Err(Self::shape(key, "an integer")),
        }
    }
}
