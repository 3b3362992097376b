// Named transforms available to YAML rule files without any Rust code.

use anyhow::Context;
use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::registry::FunctionTable;
use super::transform::{single_arg, skip, Extracted, Transform};
use crate::types::Value;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

impl FunctionTable {
    /// Table pre-filled with the built-in transforms
    pub fn builtins() -> Self {
        FunctionTable::new()
            .with("echo", echo())
            .with("str", echo())
            .with("int", int())
            .with("float", float())
            .with("date", date())
            .with("lower", lower())
            .with("upper", upper())
            .with("trim", trim())
            .with("list", list())
            .with("pair", pair())
            .with("nonempty", nonempty())
    }
}

/// One group -> string; several groups -> list of strings
pub fn echo() -> Transform {
    Transform::map(|args| {
        Ok(match args {
            [only] => Value::from(*only),
            _ => Value::from(args.to_vec()),
        })
    })
}

pub fn int() -> Transform {
    Transform::map_one(|s| {
        s.trim()
            .parse::<i64>()
            .with_context(|| format!("'{s}' is not an integer"))
    })
}

pub fn float() -> Transform {
    Transform::map_one(|s| {
        s.trim()
            .parse::<f64>()
            .with_context(|| format!("'{s}' is not a number"))
    })
}

/// ISO calendar date, `YYYY-MM-DD`
pub fn date() -> Transform {
    Transform::map_one(|s| {
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .with_context(|| format!("'{s}' is not a {DATE_FORMAT} date"))
    })
}

pub fn lower() -> Transform {
    Transform::map_one(|s| Ok(s.to_lowercase()))
}

pub fn upper() -> Transform {
    Transform::map_one(|s| Ok(s.to_uppercase()))
}

pub fn trim() -> Transform {
    Transform::map_one(|s| Ok(s.trim().to_string()))
}

/// Every group as a list, even when there is only one
pub fn list() -> Transform {
    Transform::map(|args| Ok(Value::from(args.to_vec())))
}

/// Two groups -> `{first: second}`, for map rules
pub fn pair() -> Transform {
    Transform::map(|args| match args {
        [key, value] => {
            let mut entry = BTreeMap::new();
            entry.insert(key.to_string(), Value::from(*value));
            Ok(Value::Map(entry))
        }
        _ => anyhow::bail!("pair expects 2 capture groups, got {}", args.len()),
    })
}

/// Like `echo` for one group, but drops empty captures
pub fn nonempty() -> Transform {
    Transform::from_fn(|args| {
        let s = single_arg(args)?;
        if s.is_empty() {
            return skip();
        }
        Ok(Extracted::keep(s))
    })
}
