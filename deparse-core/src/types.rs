use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

// ===== RECORD TYPES =====
// Records are keyed by rule name. BTreeMap keeps iteration in name order so
// serialized output is identical from run to run.

/// Rule name -> aggregated value.
pub type Record = BTreeMap<String, Value>;

/// Output of evaluating every rule against one line. Always holds an entry
/// per rule, even when nothing matched.
pub type LineRecord = Record;

/// Output of folding every line of a stream together.
pub type CumulativeRecord = Record;

/// Dynamic value produced by transforms and stored in records.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Serialized as `YYYY-MM-DD`
    Date(NaiveDate),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Null, or a list/map with no entries
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::List(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Date(_) => "date",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
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

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

// ===== CAPTURES =====

/// Raw groups produced by one regex match, borrowed from the scanned line.
///
/// With zero or one capture group a match yields `Single`; with more it
/// yields `Groups` in group order. Groups that did not participate in the
/// match come through as empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture<'t> {
    Single(&'t str),
    Groups(Vec<&'t str>),
}

impl<'t> Capture<'t> {
    /// Positional arguments handed to a transform
    pub fn args(&self) -> Vec<&'t str> {
        match self {
            Capture::Single(s) => vec![*s],
            Capture::Groups(groups) => groups.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values() {
        assert!(Value::Null.is_empty());
        assert!(Value::List(vec![]).is_empty());
        assert!(Value::Map(BTreeMap::new()).is_empty());
        assert!(!Value::Int(0).is_empty());
        assert!(!Value::Str(String::new()).is_empty());
    }

    #[test]
    fn test_date_serializes_as_iso_string() {
        let date = NaiveDate::from_ymd_opt(2015, 1, 14).unwrap();
        let json = serde_json::to_string(&Value::Date(date)).unwrap();
        assert_eq!(json, "\"2015-01-14\"");
    }

    #[test]
    fn test_untagged_serialization() {
        let value = Value::from(vec![Value::Int(1), Value::from("a"), Value::Null]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[1,"a",null]"#);
    }

    #[test]
    fn test_display_nested() {
        let mut entries = BTreeMap::new();
        entries.insert("k".to_string(), Value::from(vec![1, 2]));
        assert_eq!(Value::Map(entries).to_string(), "{k: [1, 2]}");
    }

    #[test]
    fn test_capture_args() {
        assert_eq!(Capture::Single("8").args(), vec!["8"]);
        assert_eq!(Capture::Groups(vec!["8", "am"]).args(), vec!["8", "am"]);
    }
}
