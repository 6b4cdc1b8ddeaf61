//! Generic value model used as the codec's currency.
//!
//! `AvroValue` mirrors the value space of [`AvroSchema`](crate::schema::AvroSchema).
//! Encoders consume it, decoders produce it, and the host adapter in
//! [`convert`](crate::convert) maps it to and from host representations.
//! Decoded values own all their data; nothing borrows from the input span.

use bytes::Bytes;

/// Represents an Avro value.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroValue {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// Byte array
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Record fields as (name, value) pairs in schema order
    Record(Vec<(String, AvroValue)>),
    /// Enum variant (index and symbol name)
    Enum(i32, String),
    /// Array of values
    Array(Vec<AvroValue>),
    /// Map with unique string keys
    Map(Vec<(String, AvroValue)>),
    /// Union variant (member index and value)
    Union(i32, Box<AvroValue>),
    /// Fixed-size byte array
    Fixed(Vec<u8>),
}

impl AvroValue {
    /// Short variant name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AvroValue::Null => "null",
            AvroValue::Boolean(_) => "boolean",
            AvroValue::Int(_) => "int",
            AvroValue::Long(_) => "long",
            AvroValue::Float(_) => "float",
            AvroValue::Double(_) => "double",
            AvroValue::Bytes(_) => "bytes",
            AvroValue::String(_) => "string",
            AvroValue::Record(_) => "record",
            AvroValue::Enum(..) => "enum",
            AvroValue::Array(_) => "array",
            AvroValue::Map(_) => "map",
            AvroValue::Union(..) => "union",
            AvroValue::Fixed(_) => "fixed",
        }
    }

    /// Build a record value from (name, value) pairs.
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, AvroValue)>,
        K: Into<String>,
    {
        AvroValue::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a map value from (key, value) pairs.
    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, AvroValue)>,
        K: Into<String>,
    {
        AvroValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a union value selecting member `index`.
    pub fn union(index: i32, value: AvroValue) -> Self {
        AvroValue::Union(index, Box::new(value))
    }

    /// Look up a record field or map entry by name.
    pub fn get(&self, name: &str) -> Option<&AvroValue> {
        match self {
            AvroValue::Record(fields) | AvroValue::Map(fields) => {
                fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Unwrap any union wrappers, returning the selected member's value.
    pub fn unwrap_union(&self) -> &AvroValue {
        match self {
            AvroValue::Union(_, inner) => inner.unwrap_union(),
            other => other,
        }
    }

    /// True for `Null`, including a union whose selected member is null.
    pub fn is_null(&self) -> bool {
        matches!(self.unwrap_union(), AvroValue::Null)
    }

    /// View string content, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self.unwrap_union() {
            AvroValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// View raw byte content of bytes, fixed or string values.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self.unwrap_union() {
            AvroValue::Bytes(b) | AvroValue::Fixed(b) => Some(b),
            AvroValue::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

impl From<bool> for AvroValue {
    fn from(v: bool) -> Self {
        AvroValue::Boolean(v)
    }
}

impl From<i32> for AvroValue {
    fn from(v: i32) -> Self {
        AvroValue::Int(v)
    }
}

impl From<i64> for AvroValue {
    fn from(v: i64) -> Self {
        AvroValue::Long(v)
    }
}

impl From<f32> for AvroValue {
    fn from(v: f32) -> Self {
        AvroValue::Float(v)
    }
}

impl From<f64> for AvroValue {
    fn from(v: f64) -> Self {
        AvroValue::Double(v)
    }
}

impl From<&str> for AvroValue {
    fn from(v: &str) -> Self {
        AvroValue::String(v.to_string())
    }
}

impl From<String> for AvroValue {
    fn from(v: String) -> Self {
        AvroValue::String(v)
    }
}

impl From<Vec<u8>> for AvroValue {
    fn from(v: Vec<u8>) -> Self {
        AvroValue::Bytes(v)
    }
}

impl From<&[u8]> for AvroValue {
    fn from(v: &[u8]) -> Self {
        AvroValue::Bytes(v.to_vec())
    }
}

impl From<Bytes> for AvroValue {
    fn from(v: Bytes) -> Self {
        AvroValue::Bytes(v.to_vec())
    }
}

impl<T: Into<AvroValue>> From<Option<T>> for AvroValue {
    /// `None` becomes `Null`; the union member is chosen at encode time.
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => AvroValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_sources_are_equivalent() {
        let from_vec = AvroValue::from(b"data bytes".to_vec());
        let from_slice = AvroValue::from(&b"data bytes"[..]);
        let from_bytes = AvroValue::from(Bytes::from_static(b"data bytes"));
        assert_eq!(from_vec, from_slice);
        assert_eq!(from_vec, from_bytes);
    }

    #[test]
    fn test_option_maps_to_null() {
        assert_eq!(AvroValue::from(None::<i32>), AvroValue::Null);
        assert_eq!(AvroValue::from(Some(3)), AvroValue::Int(3));
    }

    #[test]
    fn test_record_get() {
        let record = AvroValue::record([("id", AvroValue::Long(1)), ("name", "x".into())]);
        assert_eq!(record.get("id"), Some(&AvroValue::Long(1)));
        assert_eq!(record.get("name").and_then(|v| v.as_str()), Some("x"));
        assert!(record.get("missing").is_none());
    }

    #[test]
    fn test_unwrap_union() {
        let v = AvroValue::union(1, AvroValue::Null);
        assert!(v.is_null());
        let v = AvroValue::union(0, AvroValue::String("foo".into()));
        assert_eq!(v.as_str(), Some("foo"));
    }
}
