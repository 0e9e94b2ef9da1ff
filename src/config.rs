//! The configuration tree.
//!
//! Configuration reaches the loader as a tree of [`Value`]s. Every leaf is
//! a scalar kept in its textual form, arrays keep their order, and maps keep
//! the order in which their keys were declared. Scalars are only
//! interpreted when a consumer asks for them as a float or a boolean. This
//! mirrors the loosely typed configuration language of the DNS server the
//! loader is part of. With the `serde` feature, a tree can be deserialized
//! from any self-describing serde format.

#[cfg(feature = "serde")]
use core::fmt;
use core::str::FromStr;

//------------ Value ---------------------------------------------------------

/// A node of the configuration tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    /// A scalar in its textual form.
    Scalar(String),

    /// An ordered list of values.
    Array(Vec<Value>),

    /// An ordered map from keys to values.
    Map(Map),
}

impl Value {
    /// Creates a scalar value.
    pub fn scalar(s: impl Into<String>) -> Self {
        Value::Scalar(s.into())
    }

    /// Returns whether the value is a map.
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Returns whether the value is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns whether the value is a scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Scalar(_))
    }

    /// Returns the value as a map if it is one.
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the value as an array if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Returns the text of a scalar value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Interprets a scalar value as a floating point number.
    pub fn as_f64(&self) -> Option<f64> {
        f64::from_str(self.as_str()?.trim()).ok()
    }

    /// Interprets a scalar value as a boolean.
    ///
    /// Accepts `true` and `false` in any case.
    pub fn as_bool(&self) -> Option<bool> {
        let s = self.as_str()?.trim();
        if s.eq_ignore_ascii_case("true") {
            Some(true)
        } else if s.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

//------------ Map -----------------------------------------------------------

/// An ordered map of configuration values.
///
/// Keys are unique. Lookup is linear which is fine for the handful of keys
/// a configuration map typically has.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Map {
    entries: Vec<(String, Value)>,
}

impl Map {
    /// Creates a new, empty map.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Returns whether the map contains `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the key and value at position `index`.
    pub fn get_index(&self, index: usize) -> Option<(&str, &Value)> {
        self.entries.get(index).map(|(k, v)| (k.as_str(), v))
    }

    /// Inserts a value, replacing and returning an earlier value for `key`.
    ///
    /// A replaced value keeps its position, a new key goes to the end.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(core::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Returns an iterator over the entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut res = Map::new();
        for (key, value) in iter {
            res.insert(key, value);
        }
        res
    }
}

//--- Deserialize

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(feature = "serde")]
struct ValueVisitor;

#[cfg(feature = "serde")]
impl<'de> serde::de::Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a scalar, a sequence, or a map")
    }

    fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Scalar(v.into()))
    }

    fn visit_string<E: serde::de::Error>(
        self,
        v: String,
    ) -> Result<Value, E> {
        Ok(Value::Scalar(v))
    }

    // An empty node, e.g., `key:` in YAML.
    fn visit_unit<E: serde::de::Error>(self) -> Result<Value, E> {
        Ok(Value::Scalar(String::new()))
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Value, E> {
        Ok(Value::Scalar(String::new()))
    }

    fn visit_seq<A: serde::de::SeqAccess<'de>>(
        self,
        mut seq: A,
    ) -> Result<Value, A::Error> {
        let mut res = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            res.push(item);
        }
        Ok(Value::Array(res))
    }

    fn visit_map<A: serde::de::MapAccess<'de>>(
        self,
        mut access: A,
    ) -> Result<Value, A::Error> {
        let mut res = Map::new();
        while let Some((key, value)) =
            access.next_entry::<Value, Value>()?
        {
            let key = match key {
                Value::Scalar(key) => key,
                _ => {
                    return Err(serde::de::Error::custom(
                        "map keys must be scalars",
                    ))
                }
            };
            if res.contains_key(&key) {
                return Err(serde::de::Error::custom(format_args!(
                    "duplicate key '{key}'"
                )));
            }
            res.entries.push((key, value));
        }
        Ok(Value::Map(res))
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn coercions() {
        assert_eq!(Value::from("0.75").as_f64(), Some(0.75));
        assert_eq!(Value::from("1").as_f64(), Some(1.0));
        assert_eq!(Value::from("half").as_f64(), None);
        assert_eq!(Value::from("TRUE").as_bool(), Some(true));
        assert_eq!(Value::from("false").as_bool(), Some(false));
        assert_eq!(Value::from("yes").as_bool(), None);
        assert_eq!(Value::from(vec!["true"]).as_bool(), None);
    }

    #[test]
    fn map_keeps_order() {
        let mut map: Map =
            [("b", "1"), ("a", "2"), ("c", "3")].into_iter().collect();
        assert_eq!(map.insert("a", "4"), Some(Value::from("2")));
        let keys: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a", "c"]);
        assert_eq!(map.get_index(1), Some(("a", &Value::from("4"))));
        assert_eq!(map.get("missing"), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_yaml() {
        let value: Value = serde_yaml::from_str(
            "zeta: [192.0.2.1, 192.0.2.2]\n\
             alpha:\n  up_thresh: 0.7\n  ignore_health: true\n  n: 5\n",
        )
        .unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get_index(0).unwrap().0, "zeta");
        assert_eq!(
            map.get("zeta").unwrap(),
            &Value::from(vec!["192.0.2.1", "192.0.2.2"])
        );
        let alpha = map.get("alpha").unwrap().as_map().unwrap();
        assert_eq!(alpha.get("up_thresh").unwrap().as_f64(), Some(0.7));
        assert_eq!(alpha.get("ignore_health").unwrap().as_bool(), Some(true));
        assert_eq!(alpha.get("n").unwrap().as_str(), Some("5"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_rejects_duplicates() {
        assert!(serde_yaml::from_str::<Value>("a: 1\na: 2\n").is_err());
    }
}
