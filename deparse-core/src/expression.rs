use once_cell::sync::OnceCell;
use regex::{CaptureMatches, Regex};
use std::fmt;

use crate::error::{Error, Result};
use crate::types::Capture;

/// Slightly enhanced regex.
///
/// Compiles on first use and memoizes the outcome. A pattern that fails to
/// compile keeps failing with the same [`Error::InvalidPattern`] without
/// being recompiled.
pub struct Expression {
    regex: String,
    compiled: OnceCell<std::result::Result<Regex, String>>,
}

impl Expression {
    pub fn new(regex: impl Into<String>) -> Self {
        Self {
            regex: regex.into(),
            compiled: OnceCell::new(),
        }
    }

    /// The pattern text as declared
    pub fn pattern(&self) -> &str {
        &self.regex
    }

    pub fn compile(&self) -> Result<&Regex> {
        let compiled = self.compiled.get_or_init(|| match Regex::new(&self.regex) {
            Ok(regex) => {
                tracing::debug!(pattern = %self.regex, "compiled pattern");
                Ok(regex)
            }
            Err(e) => {
                tracing::debug!(pattern = %self.regex, error = %e, "pattern failed to compile");
                Err(e.to_string())
            }
        });

        compiled.as_ref().map_err(|message| Error::InvalidPattern {
            pattern: self.regex.clone(),
            message: message.clone(),
        })
    }

    /// Scans `text` from the start and yields one capture per match, left to
    /// right. Each call starts a fresh scan.
    pub fn find_all<'e, 't>(&'e self, text: &'t str) -> Result<Matches<'e, 't>> {
        let regex = self.compile()?;
        Ok(Matches {
            groups: regex.captures_len() - 1,
            inner: regex.captures_iter(text),
        })
    }
}

impl Clone for Expression {
    fn clone(&self) -> Self {
        Self {
            regex: self.regex.clone(),
            compiled: self.compiled.clone(),
        }
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("regex", &self.regex)
            .field("compiled", &self.compiled.get().map(|c| c.is_ok()))
            .finish()
    }
}

/// Iterator over the captures of one [`Expression::find_all`] scan.
pub struct Matches<'e, 't> {
    groups: usize,
    inner: CaptureMatches<'e, 't>,
}

impl<'e, 't> Iterator for Matches<'e, 't> {
    type Item = Capture<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let caps = self.inner.next()?;
        let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

        Some(match self.groups {
            0 => Capture::Single(group(0)),
            1 => Capture::Single(group(1)),
            n => Capture::Groups((1..=n).map(group).collect()),
        })
    }
}
