use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Counters collected while parsing one stream
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseStats {
    /// Lines evaluated
    pub lines: usize,
    /// Lines where at least one rule kept a value
    pub matched_lines: usize,
    /// Kept matches per rule
    pub matches: BTreeMap<String, usize>,
    /// Matches a transform chose to skip, per rule
    pub skipped: BTreeMap<String, usize>,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl ParseStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_match(&mut self, rule: &str) {
        *self.matches.entry(rule.to_string()).or_insert(0) += 1;
    }

    pub(crate) fn record_skip(&mut self, rule: &str) {
        *self.skipped.entry(rule.to_string()).or_insert(0) += 1;
    }

    pub fn total_matches(&self) -> usize {
        self.matches.values().sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }
}

fn serialize_millis<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}

impl fmt::Display for ParseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} lines ({} with matches) in {}ms",
            self.lines,
            self.matched_lines,
            self.elapsed.as_millis()
        )?;
        for (rule, count) in &self.matches {
            let skipped = self.skipped.get(rule).copied().unwrap_or(0);
            writeln!(f, "  {rule}: {count} kept, {skipped} skipped")?;
        }
        // Rules whose every match was skipped
        for (rule, skipped) in &self.skipped {
            if !self.matches.contains_key(rule) {
                writeln!(f, "  {rule}: 0 kept, {skipped} skipped")?;
            }
        }
        Ok(())
    }
}
