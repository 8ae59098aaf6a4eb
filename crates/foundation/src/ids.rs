//! Building identifiers.
//!
//! Data sources and the filter service do not agree on whether an id is a
//! number or a string. `BuildingId` canonicalizes at construction: text that
//! is the decimal rendering of an integer becomes the integer form, so `42`
//! and `"42"` are the same id everywhere (equality, hashing, map lookups).
//! Other spellings such as `"042"` or `"+42"` stay distinct text ids.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::math::integral_f64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Repr {
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildingId(Repr);

impl BuildingId {
    pub fn from_int(n: i64) -> Self {
        Self(Repr::Int(n))
    }

    /// Builds an id from text, trimming whitespace. Only the canonical decimal
    /// form of an integer (`"42"`, `"-7"`) folds to the numeric id.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.parse::<i64>() {
            Ok(n) if n.to_string() == trimmed => Self(Repr::Int(n)),
            _ => Self(Repr::Text(trimmed.to_string())),
        }
    }

    /// Integral floats fold to the numeric form; anything else keeps its
    /// textual rendering.
    pub fn from_f64(v: f64) -> Self {
        match integral_f64(v) {
            Some(n) => Self(Repr::Int(n)),
            None => Self(Repr::Text(v.to_string())),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.0, Repr::Int(_))
    }

    /// Numeric reading of a textual id that is not a canonical integer
    /// (`"042"`, `"42.0"`, `"4.2e1"`). `None` for numeric ids and non-numeric
    /// text.
    pub fn numeric_alternate(&self) -> Option<Self> {
        match &self.0 {
            Repr::Int(_) => None,
            Repr::Text(s) => {
                let v = s.parse::<f64>().ok()?;
                integral_f64(v).map(Self::from_int)
            }
        }
    }
}

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Int(n) => write!(f, "{n}"),
            Repr::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for BuildingId {
    fn from(n: i64) -> Self {
        Self::from_int(n)
    }
}

impl From<&str> for BuildingId {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl From<String> for BuildingId {
    fn from(text: String) -> Self {
        Self::from_text(&text)
    }
}

impl Serialize for BuildingId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            Repr::Int(n) => serializer.serialize_i64(*n),
            Repr::Text(s) => serializer.serialize_str(s),
        }
    }
}

struct BuildingIdVisitor;

impl Visitor<'_> for BuildingIdVisitor {
    type Value = BuildingId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a building id (integer or string)")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(BuildingId::from_int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        match i64::try_from(v) {
            Ok(n) => Ok(BuildingId::from_int(n)),
            Err(_) => Ok(BuildingId(Repr::Text(v.to_string()))),
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(BuildingId::from_f64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(BuildingId::from_text(v))
    }
}

impl<'de> Deserialize<'de> for BuildingId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(BuildingIdVisitor)
    }
}
