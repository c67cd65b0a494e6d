//! Flat string keys for the key/value store.
//!
//! Every record and every status set is addressed by a [`Key`] serialized as
//! `namespace:model:attribute:value`. Two keys are the same key exactly when
//! their serialized forms are equal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Namespace shared by every key the system reads or writes.
pub const DEFAULT_NAMESPACE: &str = "gogocal.hcpss.org";

/// Separator between the four key fields.
pub const DELIMITER: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Fewer than four delimited fields
    #[error("malformed key {input:?}: expected 4 fields, found {found}")]
    MissingFields { input: String, found: usize },
}

/// A structured store key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key {
    namespace: String,
    model: String,
    attribute: String,
    value: String,
}

impl Key {
    /// Build a key in the default namespace.
    pub fn new(
        model: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE, model, attribute, value)
    }

    pub fn with_namespace(
        namespace: impl Into<String>,
        model: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            model: model.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Parse a serialized key.
    ///
    /// The value field keeps any delimiters that follow the third one, so
    /// `parse(key.to_string())` is lossless even for values containing `:`.
    pub fn parse(input: &str) -> Result<Self, KeyError> {
        let parts: Vec<&str> = input.splitn(4, DELIMITER).collect();
        match parts.as_slice() {
            [namespace, model, attribute, value] => Ok(Self::with_namespace(
                *namespace, *model, *attribute, *value,
            )),
            _ => Err(KeyError::MissingFields {
                input: input.to_string(),
                found: parts.len(),
            }),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{d}{}{d}{}{d}{}",
            self.namespace,
            self.model,
            self.attribute,
            self.value,
            d = DELIMITER
        )
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Key {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

// Equality is defined on the serialized form, not field by field.
impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Key {}

impl std::hash::Hash for Key {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

/// An ordered list of keys with set-style helpers.
///
/// Order matters: `diff` and `merge` both preserve the order in which keys
/// first appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyList(Vec<Key>);

impl KeyList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Parse every string, failing on the first malformed one.
    pub fn from_strings<I, S>(strings: I) -> Result<Self, KeyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        strings
            .into_iter()
            .map(|s| Key::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(Key::to_string).collect()
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.0.iter().any(|k| k == key)
    }

    pub fn push(&mut self, key: Key) {
        self.0.push(key);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Key> {
        self.0.iter()
    }

    /// Keys of `self` that are absent from `other`, in `self`'s order.
    pub fn diff(&self, other: &KeyList) -> KeyList {
        self.0
            .iter()
            .filter(|k| !other.contains(k))
            .cloned()
            .collect()
    }

    /// Append every key of `other` not already present.
    ///
    /// Duplicates inside `other` are collapsed too, so the result never holds
    /// the same key twice unless `self` already did.
    pub fn merge(&mut self, other: &KeyList) {
        for key in other.iter() {
            if !self.contains(key) {
                self.0.push(key.clone());
            }
        }
    }
}

impl FromIterator<Key> for KeyList {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for KeyList {
    type Item = Key;
    type IntoIter = std::vec::IntoIter<Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a KeyList {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Key>> for KeyList {
    fn from(keys: Vec<Key>) -> Self {
        Self(keys)
    }
}

/// Names of the status sets (and the in-flight hash) for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusKeys {
    pub to_process: String,
    pub to_delete: String,
    pub processed: String,
    pub failed: String,
    pub in_flight: String,
}

impl StatusKeys {
    pub fn for_namespace(namespace: &str) -> Self {
        let status = |name: &str| Key::with_namespace(namespace, "event", "status", name).to_string();
        Self {
            to_process: status("to-process"),
            to_delete: status("to-delete"),
            processed: status("processed"),
            failed: status("failed"),
            in_flight: status("in-flight"),
        }
    }
}

impl Default for StatusKeys {
    fn default() -> Self {
        Self::for_namespace(DEFAULT_NAMESPACE)
    }
}
