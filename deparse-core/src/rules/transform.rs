use std::fmt;
use std::sync::Arc;

use crate::types::Value;

/// What a transform decided to do with one match.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// Merge this value into the rule's result
    Keep(Value),
    /// Leave this match out; the rest of the line is unaffected
    Skip,
}

impl Extracted {
    pub fn keep(value: impl Into<Value>) -> Self {
        Extracted::Keep(value.into())
    }
}

/// Convenience for transforms: `return skip();`
pub fn skip() -> anyhow::Result<Extracted> {
    Ok(Extracted::Skip)
}

type TransformFn = dyn Fn(&[&str]) -> anyhow::Result<Extracted> + Send + Sync;

/// Post-processing applied to each raw capture before merging.
///
/// Receives the capture's groups as positional arguments. Any error is
/// surfaced to the caller of the parser as [`Error::Transform`].
///
/// [`Error::Transform`]: crate::Error::Transform
#[derive(Clone)]
pub struct Transform(Arc<TransformFn>);

impl Transform {
    /// Full form: the closure may skip matches or fail.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&[&str]) -> anyhow::Result<Extracted> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// For transforms that always keep their result.
    pub fn map<F, V>(f: F) -> Self
    where
        F: Fn(&[&str]) -> anyhow::Result<V> + Send + Sync + 'static,
        V: Into<Value>,
    {
        Self::from_fn(move |args| f(args).map(Extracted::keep))
    }

    /// For transforms over a single capture group.
    pub fn map_one<F, V>(f: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<V> + Send + Sync + 'static,
        V: Into<Value>,
    {
        Self::map(move |args| f(single_arg(args)?))
    }

    pub fn apply(&self, args: &[&str]) -> anyhow::Result<Extracted> {
        (self.0)(args)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// Returns the only argument, or fails when the pattern captured more.
pub fn single_arg<'a>(args: &[&'a str]) -> anyhow::Result<&'a str> {
    match args {
        [only] => Ok(*only),
        _ => anyhow::bail!("expected 1 capture group, got {}", args.len()),
    }
}
