use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::parser::Parser;
use crate::rules::{Aggregation, FunctionTable, Rule};

/// Parser-wide switches, shared by the builder and rule files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserOptions {
    /// Single rules keep every match on a line (promoted to a list) instead
    /// of the last non-null one. Off by default.
    #[serde(default)]
    pub promote_repeats: bool,
}

/// A rule as written in a YAML rule file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Key of this rule's value in the output record
    pub name: String,
    /// Regular expression applied to each line
    pub pattern: String,
    /// Name of the transform in the function table; defaults to `f_<name>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default)]
    pub aggregation: Aggregation,
}

impl RuleConfig {
    fn to_rule(&self) -> Rule {
        let rule = Rule::new(self.pattern.as_str()).aggregate(self.aggregation);
        match &self.function {
            Some(function) => rule.method(function.as_str()),
            None => rule,
        }
    }
}

/// A set of rules loaded from YAML.
///
/// ```yaml
/// options:
///   promote_repeats: false
/// rules:
///   - name: price
///     pattern: '\$(\d+)'
///     function: int
///   - name: tags
///     pattern: '#(\w+)'
///     function: echo
///     aggregation: list
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    #[serde(default)]
    pub options: ParserOptions,
    pub rules: Vec<RuleConfig>,
}

impl ParserConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: ParserConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&content).map_err(|e| Error::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Rejects rule sets the parser could never run: no rules, blank names or
    /// patterns, repeated names.
    pub fn validate(&self) -> Result<()> {
        if self.rules.is_empty() {
            return Err(Error::invalid_config("no rules defined"));
        }

        let mut seen = HashSet::new();
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.name.trim().is_empty() {
                return Err(Error::invalid_config(format!("rule #{} has an empty name", index + 1)));
            }
            if rule.pattern.is_empty() {
                return Err(Error::invalid_config(format!(
                    "rule '{}' has an empty pattern",
                    rule.name
                )));
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(Error::invalid_config(format!(
                    "rule '{}' is defined more than once",
                    rule.name
                )));
            }
        }
        Ok(())
    }

    /// Builds a parser whose methods come from `functions`.
    pub fn build(&self, functions: FunctionTable) -> Result<Parser> {
        self.validate()?;

        let mut builder = Parser::builder()
            .options(self.options.clone())
            .methods(functions);
        for rule in &self.rules {
            builder = builder.rule(rule.name.as_str(), rule.to_rule());
        }
        builder.build()
    }

    /// Builds a parser against the built-in function table.
    pub fn build_with_builtins(&self) -> Result<Parser> {
        self.build(FunctionTable::builtins())
    }
}
