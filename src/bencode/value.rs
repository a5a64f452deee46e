use bytes::Bytes;
use std::collections::BTreeMap;

/// A bencode dictionary: opaque byte-string keys mapped to values.
///
/// Kept in a `BTreeMap` so the ascending key order canonical bencode
/// requires on the wire is a property of the representation, not something
/// the encoder has to restore.
pub type Dictionary = BTreeMap<Bytes, Value>;

/// A bencode value.
///
/// Bencode has four data types: integers, byte strings, lists, and
/// dictionaries. Byte strings are opaque; they may contain NUL bytes and
/// are not required to be valid UTF-8.
///
/// Most consumers of decoded data are digging fields out of dictionaries
/// (the DHT envelope, metainfo), so besides the plain `as_*` accessors the
/// type carries fused `entry_*` lookups that combine the key lookup with
/// the type check.
///
/// # Examples
///
/// ```
/// use mdht::bencode::decode;
///
/// let value = decode(b"d3:agei30e4:name5:Alicee").unwrap();
/// assert_eq!(value.entry_str(b"name"), Some("Alice"));
/// assert_eq!(value.entry_integer(b"age"), Some(30));
/// assert_eq!(value.entry(b"missing"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A signed 64-bit integer.
    Integer(i64),
    /// An opaque byte string.
    Bytes(Bytes),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A dictionary with byte string keys, sorted by key.
    Dict(Dictionary),
}

impl Value {
    /// Byte string value from a UTF-8 string.
    pub fn string(s: &str) -> Self {
        Self::binary(s.as_bytes())
    }

    /// Byte string value copied from a slice.
    pub fn binary(bytes: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(bytes))
    }

    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        if let Value::Bytes(b) = self {
            Some(b)
        } else {
            None
        }
    }

    /// The byte string as UTF-8 text, if it is one and decodes cleanly.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()?).ok()
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        if let Value::List(l) = self {
            Some(l)
        } else {
            None
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        if let Value::Dict(d) = self {
            Some(d)
        } else {
            None
        }
    }

    /// Looks up a key, if this value is a dictionary holding it.
    pub fn entry(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict()?.get(key)
    }

    /// Integer field of a dictionary.
    pub fn entry_integer(&self, key: &[u8]) -> Option<i64> {
        self.entry(key)?.as_integer()
    }

    /// Byte string field of a dictionary.
    pub fn entry_bytes(&self, key: &[u8]) -> Option<&Bytes> {
        self.entry(key)?.as_bytes()
    }

    /// UTF-8 text field of a dictionary.
    pub fn entry_str(&self, key: &[u8]) -> Option<&str> {
        self.entry(key)?.as_str()
    }

    /// List field of a dictionary.
    pub fn entry_list(&self, key: &[u8]) -> Option<&[Value]> {
        self.entry(key)?.as_list()
    }

    /// Nested dictionary field of a dictionary.
    pub fn entry_dict(&self, key: &[u8]) -> Option<&Dictionary> {
        self.entry(key)?.as_dict()
    }
}
