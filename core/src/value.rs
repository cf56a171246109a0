use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned vertex identifier.
pub type VertexId = u64;

/// Property name to value. Ordered so serialized output is stable.
pub type PropertyBundle = BTreeMap<String, Value>;

/// The closed set of vertex labels in the social network schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexLabel {
    Person,
    Post,
    Comment,
    Forum,
    Company,
    University,
    City,
    Country,
    Continent,
    Tag,
    TagClass,
}

impl VertexLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            VertexLabel::Person => "person",
            VertexLabel::Post => "post",
            VertexLabel::Comment => "comment",
            VertexLabel::Forum => "forum",
            VertexLabel::Company => "company",
            VertexLabel::University => "university",
            VertexLabel::City => "city",
            VertexLabel::Country => "country",
            VertexLabel::Continent => "continent",
            VertexLabel::Tag => "tag",
            VertexLabel::TagClass => "tag_class",
        }
    }

    /// Posts and comments are both messages.
    pub fn is_message(self) -> bool {
        matches!(self, VertexLabel::Post | VertexLabel::Comment)
    }
}

impl fmt::Display for VertexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VertexLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "person" => Ok(VertexLabel::Person),
            "post" => Ok(VertexLabel::Post),
            "comment" => Ok(VertexLabel::Comment),
            "forum" => Ok(VertexLabel::Forum),
            "company" => Ok(VertexLabel::Company),
            "university" => Ok(VertexLabel::University),
            "city" => Ok(VertexLabel::City),
            "country" => Ok(VertexLabel::Country),
            "continent" => Ok(VertexLabel::Continent),
            "tag" => Ok(VertexLabel::Tag),
            "tag_class" | "tagclass" => Ok(VertexLabel::TagClass),
            other => Err(format!("unknown vertex label '{}'", other)),
        }
    }
}

/// A schema-less property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Date(DateTime<Utc>),
    /// Multi-valued property (emails, languages).
    List(Vec<String>),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Str(_) => 0,
            Value::Int(_) => 1,
            Value::Float(_) => 2,
            Value::Date(_) => 3,
            Value::List(_) => 4,
        }
    }

    /// Total order: variant first, then content. Floats use `total_cmp`.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Equality as a filter sees it: a list matches a string it contains.
    pub fn matches(&self, expected: &Value) -> bool {
        match (self, expected) {
            (Value::List(items), Value::Str(s)) => items.iter().any(|i| i == s),
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            _ => self == expected,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

/// Compare two optional values; absent values sort after present ones.
pub(crate) fn cmp_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
