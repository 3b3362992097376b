use serde::{Deserialize, Serialize};

use super::transform::Transform;
use crate::error::{Error, Result};
use crate::expression::Expression;
use crate::types::Value;

/// How the values of one rule are combined, both between matches on one
/// line and between lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Last non-null match on a line; promoted to a list across lines
    #[default]
    Single,
    /// Every match, in order
    List,
    /// Shallow merge of map values, later keys win
    Map,
}

impl Aggregation {
    /// Fresh per-line accumulator
    pub fn empty(&self) -> Value {
        match self {
            Aggregation::Single => Value::Null,
            Aggregation::List => Value::List(Vec::new()),
            Aggregation::Map => Value::Map(Default::default()),
        }
    }

    /// Folds one transformed match into the line accumulator of `rule`.
    pub fn merge_line(&self, rule: &str, acc: Value, value: Value) -> Result<Value> {
        match self {
            Aggregation::Single => Ok(merge_single(acc, value)),
            Aggregation::List => Ok(match acc {
                Value::List(mut items) => {
                    items.push(value);
                    Value::List(items)
                }
                other => promote(other, value),
            }),
            Aggregation::Map => match (acc, value) {
                (acc, Value::Null) => Ok(acc),
                (Value::Map(mut entries), Value::Map(part)) => {
                    entries.extend(part);
                    Ok(Value::Map(entries))
                }
                (_, value) => Err(Error::NotAMapping {
                    rule: rule.to_string(),
                    value,
                }),
            },
        }
    }

    /// Folds a later line's value into the cumulative value. Never drops
    /// data from either side except where a map key is overwritten.
    pub fn merge_across(&self, prior: Value, part: Value) -> Value {
        match self {
            Aggregation::Single => promote(prior, part),
            Aggregation::List => match (prior, part) {
                (prior, Value::Null) => prior,
                (Value::List(mut items), Value::List(more)) => {
                    items.extend(more);
                    Value::List(items)
                }
                (prior, part) => promote(prior, part),
            },
            Aggregation::Map => match (prior, part) {
                (prior, Value::Null) => prior,
                (Value::Map(mut entries), Value::Map(more)) => {
                    entries.extend(more);
                    Value::Map(entries)
                }
                (prior, part) => promote(prior, part),
            },
        }
    }
}

/// `new` replaces `old` unless it is null. Falsy values such as `0` or `""`
/// still replace.
pub fn merge_single(old: Value, new: Value) -> Value {
    if new.is_null() {
        old
    } else {
        new
    }
}

/// Combines two values without losing either: a list absorbs the new value,
/// two scalars become a two-element list. Nulls on either side are ignored.
pub fn promote(prior: Value, part: Value) -> Value {
    match (prior, part) {
        (prior, Value::Null) => prior,
        (Value::Null, part) => part,
        (Value::List(mut items), part) => {
            items.push(part);
            Value::List(items)
        }
        (prior, part) => Value::List(vec![prior, part]),
    }
}

/// Where a rule gets its post-processing function from.
#[derive(Debug, Clone)]
pub enum Binding {
    /// Supplied with the rule
    Explicit(Transform),
    /// Looked up by name in the parser's method table on first use
    Method(String),
    /// Not chosen yet; the registry turns this into `Method("f_<name>")`
    Convention,
}

/// A rule declaration: pattern, post-processing and aggregation.
#[derive(Debug, Clone)]
pub struct Rule {
    expression: Expression,
    binding: Binding,
    aggregation: Aggregation,
}

impl Rule {
    /// Single-valued rule whose transform is the `f_<name>` method.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            expression: Expression::new(pattern),
            binding: Binding::Convention,
            aggregation: Aggregation::Single,
        }
    }

    pub fn single(pattern: impl Into<String>) -> Self {
        Self::new(pattern)
    }

    pub fn list(pattern: impl Into<String>) -> Self {
        Self::new(pattern).aggregate(Aggregation::List)
    }

    pub fn map(pattern: impl Into<String>) -> Self {
        Self::new(pattern).aggregate(Aggregation::Map)
    }

    pub fn aggregate(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.binding = Binding::Explicit(transform);
        self
    }

    /// Bind to a named method instead of `f_<name>`
    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.binding = Binding::Method(name.into());
        self
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    pub(crate) fn bind_convention(&mut self, name: &str) {
        if matches!(self.binding, Binding::Convention) {
            self.binding = Binding::Method(convention_name(name));
        }
    }
}

/// Method name a rule falls back to when declared without a transform
pub fn convention_name(rule: &str) -> String {
    format!("f_{rule}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn map(pairs: &[(&str, i64)]) -> Value {
        Value::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Value::Int(*v)))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn test_merge_single_returns_new_value() {
        assert_eq!(merge_single("old".into(), "new".into()), Value::from("new"));
    }

    #[test]
    fn test_merge_single_preserves_old_when_new_is_null() {
        assert_eq!(merge_single("old".into(), Value::Null), Value::from("old"));
    }

    #[test]
    fn test_merge_single_overwrites_with_falsy() {
        assert_eq!(merge_single("old".into(), Value::Int(0)), Value::Int(0));
        assert_eq!(merge_single("old".into(), "".into()), Value::from(""));
        assert_eq!(merge_single(Value::Int(1), false.into()), Value::Bool(false));
    }

    #[test]
    fn test_list_merge_line_appends_in_order() {
        let agg = Aggregation::List;
        let acc = agg.empty();
        let acc = agg.merge_line("n", acc, Value::Int(1)).unwrap();
        let acc = agg.merge_line("n", acc, Value::Int(2)).unwrap();
        assert_eq!(acc, Value::from(vec![1, 2]));
    }

    #[test]
    fn test_map_merge_line_later_keys_win() {
        let agg = Aggregation::Map;
        let acc = agg.merge_line("m", agg.empty(), map(&[("a", 1), ("b", 2)])).unwrap();
        let acc = agg.merge_line("m", acc, map(&[("b", 3), ("c", 4)])).unwrap();
        assert_eq!(acc, map(&[("a", 1), ("b", 3), ("c", 4)]));
    }

    #[test]
    fn test_map_merge_line_rejects_scalars() {
        let err = Aggregation::Map
            .merge_line("m", Aggregation::Map.empty(), Value::Int(1))
            .unwrap_err();
        assert!(matches!(err, Error::NotAMapping { ref rule, .. } if rule == "m"));
    }

    #[test]
    fn test_single_merge_across_promotes_to_list() {
        let agg = Aggregation::Single;
        let merged = agg.merge_across(Value::Int(3), Value::Int(4));
        assert_eq!(merged, Value::from(vec![3, 4]));
        let merged = agg.merge_across(merged, Value::Int(5));
        assert_eq!(merged, Value::from(vec![3, 4, 5]));
    }

    #[test]
    fn test_single_merge_across_ignores_nulls() {
        let agg = Aggregation::Single;
        assert_eq!(agg.merge_across(Value::Null, Value::Int(4)), Value::Int(4));
        assert_eq!(agg.merge_across(Value::Int(3), Value::Null), Value::Int(3));
    }

    #[test]
    fn test_list_merge_across_concatenates() {
        let merged = Aggregation::List.merge_across(Value::from(vec![3]), Value::from(vec![4, 5]));
        assert_eq!(merged, Value::from(vec![3, 4, 5]));
    }

    #[test]
    fn test_map_merge_across_shallow_merges() {
        let merged = Aggregation::Map.merge_across(map(&[("a", 1)]), map(&[("a", 2), ("b", 3)]));
        assert_eq!(merged, map(&[("a", 2), ("b", 3)]));
    }

    #[test]
    fn test_map_merge_across_keeps_non_map_prior() {
        let merged = Aggregation::Map.merge_across(Value::from("legacy"), map(&[("a", 1)]));
        assert_eq!(merged, Value::List(vec![Value::from("legacy"), map(&[("a", 1)])]));
        assert_eq!(
            Aggregation::Map.merge_across(Value::Null, map(&[("a", 1)])),
            map(&[("a", 1)])
        );
    }

    #[test]
    fn test_rule_binding_defaults_to_convention() {
        let mut rule = Rule::new(r"\d+");
        assert!(matches!(rule.binding(), Binding::Convention));
        rule.bind_convention("price");
        assert!(matches!(rule.binding(), Binding::Method(name) if name == "f_price"));
    }

    #[test]
    fn test_explicit_binding_survives_convention_pass() {
        let mut rule = Rule::list(r"\d+").method("f_echo");
        rule.bind_convention("numbers");
        assert!(matches!(rule.binding(), Binding::Method(name) if name == "f_echo"));
        assert_eq!(rule.aggregation(), Aggregation::List);
    }

    #[test]
    fn test_aggregation_deserializes_lowercase() {
        let agg: Aggregation = serde_yaml::from_str("list").unwrap();
        assert_eq!(agg, Aggregation::List);
    }
}
