//! Input model for uploads and metadata updates.

use super::{EncodeError, UploadFile};

/// Leaf value of an upload.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Form-field representation: `Null` is empty, booleans are `1`/`0`.
    pub fn to_field_string(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(true) => "1".to_string(),
            Scalar::Bool(false) => "0".to_string(),
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(x) => x.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Null => serde_json::Value::Null,
            Scalar::Bool(b) => serde_json::Value::Bool(*b),
            Scalar::Int(n) => serde_json::Value::from(*n),
            Scalar::Float(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Scalar::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// One value of an [`UploadInput`]. Lists and maps are both collections; a
/// list's sub-keys are its indices.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadValue {
    Scalar(Scalar),
    List(Vec<UploadValue>),
    /// Ordered map; insertion order is kept through encoding.
    Map(Vec<(String, UploadValue)>),
    File(UploadFile),
}

impl UploadValue {
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<UploadValue>,
    {
        UploadValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<UploadValue>,
    {
        UploadValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// `(sub_key, value)` pairs of a collection, `None` for scalars and files.
    pub(crate) fn entries(&self) -> Option<Vec<(String, &UploadValue)>> {
        match self {
            UploadValue::List(items) => Some(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v))
                    .collect(),
            ),
            UploadValue::Map(entries) => {
                Some(entries.iter().map(|(k, v)| (k.clone(), v)).collect())
            }
            UploadValue::Scalar(_) | UploadValue::File(_) => None,
        }
    }

    /// Looks up a key of a map value.
    pub fn get(&self, key: &str) -> Option<&UploadValue> {
        match self {
            UploadValue::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// JSON form of the value. Files cannot be serialized; `name` identifies
    /// the part being built for the error.
    pub(crate) fn to_json(&self, name: &str) -> Result<serde_json::Value, EncodeError> {
        match self {
            UploadValue::Scalar(s) => Ok(s.to_json()),
            UploadValue::List(items) => items
                .iter()
                .map(|v| v.to_json(name))
                .collect::<Result<Vec<_>, _>>()
                .map(serde_json::Value::Array),
            UploadValue::Map(entries) => {
                let mut obj = serde_json::Map::with_capacity(entries.len());
                for (k, v) in entries {
                    obj.insert(k.clone(), v.to_json(name)?);
                }
                Ok(serde_json::Value::Object(obj))
            }
            UploadValue::File(_) => Err(EncodeError::NestedFile {
                name: name.to_string(),
            }),
        }
    }

    /// Builds a value tree from JSON (objects keep their key order).
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Scalar::Null.into(),
            serde_json::Value::Bool(b) => b.into(),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => i.into(),
                None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)).into(),
            },
            serde_json::Value::String(s) => s.into(),
            serde_json::Value::Array(items) => {
                UploadValue::List(items.into_iter().map(UploadValue::from_json).collect())
            }
            serde_json::Value::Object(obj) => UploadValue::Map(
                obj.into_iter()
                    .map(|(k, v)| (k, UploadValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Scalar> for UploadValue {
    fn from(s: Scalar) -> Self {
        UploadValue::Scalar(s)
    }
}

impl From<UploadFile> for UploadValue {
    fn from(f: UploadFile) -> Self {
        UploadValue::File(f)
    }
}

impl From<&str> for UploadValue {
    fn from(s: &str) -> Self {
        UploadValue::Scalar(Scalar::Text(s.to_string()))
    }
}

impl From<String> for UploadValue {
    fn from(s: String) -> Self {
        UploadValue::Scalar(Scalar::Text(s))
    }
}

impl From<i64> for UploadValue {
    fn from(n: i64) -> Self {
        UploadValue::Scalar(Scalar::Int(n))
    }
}

impl From<i32> for UploadValue {
    fn from(n: i32) -> Self {
        UploadValue::Scalar(Scalar::Int(n.into()))
    }
}

impl From<f64> for UploadValue {
    fn from(x: f64) -> Self {
        UploadValue::Scalar(Scalar::Float(x))
    }
}

impl From<bool> for UploadValue {
    fn from(b: bool) -> Self {
        UploadValue::Scalar(Scalar::Bool(b))
    }
}

/// Top-level input of an upload or metadata operation: ordered `(key, value)`
/// entries. Keys are unique; re-inserting a key replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadInput {
    entries: Vec<(String, UploadValue)>,
}

impl UploadInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<UploadValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<UploadValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&UploadValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UploadValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<UploadValue>> FromIterator<(K, V)> for UploadInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut input = UploadInput::new();
        for (k, v) in iter {
            input.insert(k, v);
        }
        input
    }
}
