use serde::{Serialize, Serializer};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use crate::cgi::parser::split_indexed;

/// One coerced value from a camera response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(#[serde(serialize_with = "serialize_number")] f64),
    String(String),
    Map(ParsedResponse),
    List(Vec<Value>),
}

impl Value {
    pub(crate) fn empty_map() -> Self {
        Value::Map(ParsedResponse::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Integral numbers only; `0.5` yields `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ParsedResponse> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Integral numbers go out as integers, matching how the camera printed
/// them and how `Display` renders scalars.
fn serialize_number<S: Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*n as i64)
    } else {
        serializer.serialize_f64(*n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::Map(_) | Value::List(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

/// Structured form of a `key=value` camera response.
///
/// Keys are kept sorted so two parses of the same body compare equal and
/// print identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParsedResponse(BTreeMap<String, Value>);

impl ParsedResponse {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a value using the same dotted/indexed notation the camera
    /// uses for its keys, e.g. `Encode[0].MainFormat[0].Video.Width`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.').peekable();
        let mut current = self;

        while let Some(segment) = segments.next() {
            let value = match split_indexed(segment) {
                Some((name, index)) => current.get(name)?.as_list()?.get(index)?,
                None => current.get(segment)?,
            };

            if segments.peek().is_none() {
                return Some(value);
            }
            current = value.as_map()?;
        }

        None
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub(crate) fn entries_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.0
    }
}

impl<'a> IntoIterator for &'a ParsedResponse {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for ParsedResponse {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
