use once_cell::sync::OnceCell;
use std::collections::{BTreeMap, HashMap};

use super::declaration::{Binding, Rule};
use super::transform::Transform;
use crate::error::{Error, Result};

/// Name -> transform table that rules bound by name are resolved against.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<String, Transform>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, transform: Transform) -> Option<Transform> {
        self.functions.insert(name.into(), transform)
    }

    pub fn with(mut self, name: impl Into<String>, transform: Transform) -> Self {
        self.insert(name, transform);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Transform> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Adds every entry of `other`, replacing same-named functions
    pub fn extend(&mut self, other: FunctionTable) {
        self.functions.extend(other.functions);
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// A rule owned by the registry, with its lazily resolved transform.
#[derive(Debug)]
pub struct Declaration {
    name: String,
    rule: Rule,
    resolved: OnceCell<Transform>,
}

impl Declaration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }
}

/// The rules of one parser, keyed by name.
///
/// Method lookups happen the first time a rule has a match to process, so
/// methods may be registered before or after the rules that use them.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: BTreeMap<String, Declaration>,
    methods: FunctionTable,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule. Rules declared without a transform are bound to
    /// `f_<name>` here.
    pub fn register(&mut self, name: impl Into<String>, mut rule: Rule) -> Result<()> {
        let name = name.into();
        if self.rules.contains_key(&name) {
            return Err(Error::DuplicateRule { name });
        }

        rule.bind_convention(&name);
        self.rules.insert(
            name.clone(),
            Declaration {
                name,
                rule,
                resolved: OnceCell::new(),
            },
        );
        Ok(())
    }

    pub fn add_method(&mut self, name: impl Into<String>, transform: Transform) {
        self.methods.insert(name, transform);
    }

    pub fn add_methods(&mut self, methods: FunctionTable) {
        self.methods.extend(methods);
    }

    pub fn methods(&self) -> &FunctionTable {
        &self.methods
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.rules.get(name)
    }

    /// Declarations in name order
    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.rules.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// `(rule, method)` for every rule bound to a method the table lacks,
    /// in rule name order.
    pub fn unresolved(&self) -> Vec<(&str, &str)> {
        self.rules
            .values()
            .filter_map(|declaration| match declaration.rule.binding() {
                Binding::Method(method) if !self.methods.contains(method) => {
                    Some((declaration.name.as_str(), method.as_str()))
                }
                _ => None,
            })
            .collect()
    }

    /// The transform for `declaration`, resolving a method binding on first
    /// call and reusing it afterwards.
    pub fn resolve<'a>(&'a self, declaration: &'a Declaration) -> Result<&'a Transform> {
        match declaration.rule.binding() {
            Binding::Explicit(transform) => Ok(transform),
            Binding::Method(method) => declaration.resolved.get_or_try_init(|| {
                let transform = self.methods.get(method).cloned().ok_or_else(|| {
                    Error::UnresolvedFunction {
                        rule: declaration.name.clone(),
                        method: method.clone(),
                    }
                })?;
                tracing::debug!(rule = %declaration.name, %method, "resolved rule method");
                Ok(transform)
            }),
            // register() always rebinds conventions
            Binding::Convention => Err(Error::UnresolvedFunction {
                rule: declaration.name.clone(),
                method: super::declaration::convention_name(&declaration.name),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Extracted;
    use crate::types::Value;

    fn echo() -> Transform {
        Transform::map_one(|s| Ok(s.to_string()))
    }

    #[test]
    fn test_duplicate_rule_is_rejected() {
        let mut registry = RuleRegistry::new();
        registry.register("a", Rule::new("a")).unwrap();
        let err = registry.register("a", Rule::new("b")).unwrap_err();
        assert!(matches!(err, Error::DuplicateRule { name } if name == "a"));
    }

    #[test]
    fn test_convention_method_registered_after_rule() {
        let mut registry = RuleRegistry::new();
        registry.register("word", Rule::new(r"\w+")).unwrap();
        registry.add_method("f_word", echo());

        let declaration = registry.get("word").unwrap();
        let transform = registry.resolve(declaration).unwrap();
        assert_eq!(
            transform.apply(&["hi"]).unwrap(),
            Extracted::Keep(Value::from("hi"))
        );
    }

    #[test]
    fn test_missing_convention_method_names_expected_method() {
        let mut registry = RuleRegistry::new();
        registry.register("price", Rule::new(r"\d+")).unwrap();

        let declaration = registry.get("price").unwrap();
        let err = registry.resolve(declaration).unwrap_err();
        match err {
            Error::UnresolvedFunction { rule, method } => {
                assert_eq!(rule, "price");
                assert_eq!(method, "f_price");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_explicit_transform_wins_over_method_table() {
        let mut registry = RuleRegistry::new();
        registry
            .register("n", Rule::new(r"\d+").transform(Transform::map(|_| Ok(1i64))))
            .unwrap();
        registry.add_method("f_n", Transform::map(|_| Ok(2i64)));

        let transform = registry.resolve(registry.get("n").unwrap()).unwrap();
        assert_eq!(transform.apply(&["7"]).unwrap(), Extracted::Keep(Value::Int(1)));
    }

    #[test]
    fn test_unresolved_lists_missing_methods_only() {
        let mut registry = RuleRegistry::new();
        registry.register("price", Rule::new(r"\d+")).unwrap();
        registry.register("word", Rule::new(r"\w+").method("f_echo")).unwrap();
        registry
            .register("n", Rule::new(r"\d+").transform(echo()))
            .unwrap();
        registry.add_method("f_echo", echo());

        assert_eq!(registry.unresolved(), vec![("price", "f_price")]);

        registry.add_method("f_price", echo());
        assert!(registry.unresolved().is_empty());
    }

    #[test]
    fn test_iteration_is_name_ordered() {
        let mut registry = RuleRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(name, Rule::new("x")).unwrap();
        }
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_function_table_names_sorted() {
        let table = FunctionTable::new().with("b", echo()).with("a", echo());
        assert_eq!(table.names(), vec!["a", "b"]);
        assert!(table.contains("a"));
        assert_eq!(table.len(), 2);
    }
}
