use std::collections::btree_map::Entry;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use crate::config::ParserOptions;
use crate::error::{Error, Result};
use crate::rules::{promote, Aggregation, Extracted, FunctionTable, Rule, RuleRegistry, Transform};
use crate::stats::ParseStats;
use crate::types::{CumulativeRecord, LineRecord};

/// Turns lines of text into records.
///
/// Every rule is applied to every line. Each line yields a [`LineRecord`]
/// holding one entry per rule; a stream of lines folds into a single
/// [`CumulativeRecord`] without losing any line's values.
///
/// ```ignore
/// let parser = Parser::builder()
///     .rule("price", Rule::new(r"\$(\d+)").transform(builtins::int()))
///     .rule("service", Rule::new(r"(aws-[\w-]+)"))
///     .method("f_service", builtins::echo())
///     .build()?;
/// let record = parser.line("aws-s3-bucket 6GB $10")?;
/// ```
#[derive(Debug)]
pub struct Parser {
    registry: RuleRegistry,
    options: ParserOptions,
}

impl Parser {
    pub fn new(registry: RuleRegistry, options: ParserOptions) -> Self {
        Self { registry, options }
    }

    pub fn builder() -> ParserBuilder {
        ParserBuilder::default()
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Compiles every pattern now instead of on first use.
    pub fn precompile(&self) -> Result<()> {
        for declaration in self.registry.iter() {
            declaration.rule().expression().compile()?;
        }
        Ok(())
    }

    /// [`precompile`](Self::precompile), then confirms that every method a
    /// rule is bound to exists. Fails with the first missing method.
    pub fn check(&self) -> Result<()> {
        self.precompile()?;
        match self.registry.unresolved().first() {
            Some((rule, method)) => Err(Error::UnresolvedFunction {
                rule: rule.to_string(),
                method: method.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Applies every rule to `text`.
    pub fn line(&self, text: &str) -> Result<LineRecord> {
        self.evaluate(text, None)
    }

    /// Folds every line into one record. Stops at the first error.
    pub fn parse_stream<I, S>(&self, lines: I) -> Result<CumulativeRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fold(lines.into_iter().map(Ok), None)
    }

    /// Same as [`parse_stream`](Self::parse_stream), also returning counters.
    pub fn parse_stream_with_stats<I, S>(&self, lines: I) -> Result<(CumulativeRecord, ParseStats)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stats = ParseStats::new();
        let record = self.fold(lines.into_iter().map(Ok), Some(&mut stats))?;
        Ok((record, stats))
    }

    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<CumulativeRecord> {
        self.fold(reader.lines().map(|line| line.map_err(Error::from)), None)
    }

    pub fn parse_reader_with_stats<R: BufRead>(
        &self,
        reader: R,
    ) -> Result<(CumulativeRecord, ParseStats)> {
        let mut stats = ParseStats::new();
        let lines = reader.lines().map(|line| line.map_err(Error::from));
        let record = self.fold(lines, Some(&mut stats))?;
        Ok((record, stats))
    }

    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<CumulativeRecord> {
        let file = File::open(path)?;
        self.parse_reader(BufReader::new(file))
    }

    /// Splits `text` into lines and parses them as a stream.
    pub fn parse_str(&self, text: &str) -> Result<CumulativeRecord> {
        self.parse_stream(text.lines())
    }

    /// Folds `part` into `result` using each rule's cross-line merge.
    ///
    /// An absent or empty `part` leaves `result` untouched. Names the
    /// registry does not know are combined without dropping either side.
    pub fn merge(&self, mut result: CumulativeRecord, part: Option<LineRecord>) -> CumulativeRecord {
        let Some(part) = part else {
            return result;
        };

        for (name, value) in part {
            match result.entry(name) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
                Entry::Occupied(mut slot) => {
                    let prior = std::mem::take(slot.get_mut());
                    let merged = match self.registry.get(slot.key()) {
                        Some(declaration) => {
                            declaration.rule().aggregation().merge_across(prior, value)
                        }
                        None => promote(prior, value),
                    };
                    *slot.get_mut() = merged;
                }
            }
        }
        result
    }

    fn fold<I, S>(&self, lines: I, mut stats: Option<&mut ParseStats>) -> Result<CumulativeRecord>
    where
        I: Iterator<Item = Result<S>>,
        S: AsRef<str>,
    {
        let started = Instant::now();
        let mut result = CumulativeRecord::new();
        let mut count = 0usize;

        for line in lines {
            let line = line?;
            let record = self.evaluate(line.as_ref(), stats.as_deref_mut())?;
            result = self.merge(result, Some(record));
            count += 1;
        }

        let elapsed = started.elapsed();
        tracing::debug!(
            lines = count,
            rules = self.registry.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "parsed stream"
        );
        if let Some(stats) = stats {
            stats.elapsed = elapsed;
        }
        Ok(result)
    }

    fn evaluate(&self, text: &str, mut stats: Option<&mut ParseStats>) -> Result<LineRecord> {
        let text = strip_line_ending(text);
        let mut record = LineRecord::new();
        let mut kept_any = false;

        for declaration in self.registry.iter() {
            let name = declaration.name();
            let rule = declaration.rule();
            let aggregation = rule.aggregation();
            let mut acc = aggregation.empty();

            for capture in rule.expression().find_all(text)? {
                let transform = self.registry.resolve(declaration)?;
                let extracted = transform
                    .apply(&capture.args())
                    .map_err(|source| Error::Transform {
                        rule: name.to_string(),
                        source,
                    })?;

                let value = match extracted {
                    Extracted::Keep(value) => value,
                    Extracted::Skip => {
                        tracing::trace!(rule = name, ?capture, "match skipped");
                        if let Some(stats) = stats.as_deref_mut() {
                            stats.record_skip(name);
                        }
                        continue;
                    }
                };

                kept_any = true;
                if let Some(stats) = stats.as_deref_mut() {
                    stats.record_match(name);
                }

                acc = if self.options.promote_repeats && aggregation == Aggregation::Single {
                    promote(acc, value)
                } else {
                    aggregation.merge_line(name, acc, value)?
                };
            }

            record.insert(name.to_string(), acc);
        }

        if let Some(stats) = stats {
            stats.lines += 1;
            if kept_any {
                stats.matched_lines += 1;
            }
        }
        tracing::trace!(?record, "evaluated line");
        Ok(record)
    }
}

/// Drops one trailing `\n` or `\r\n`, so `$` anchors at the end of the
/// line's content whichever way the line was read.
fn strip_line_ending(text: &str) -> &str {
    match text.strip_suffix('\n') {
        Some(line) => line.strip_suffix('\r').unwrap_or(line),
        None => text,
    }
}

/// Collects rules and methods for a [`Parser`].
///
/// The first registration error is kept and reported by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct ParserBuilder {
    registry: RuleRegistry,
    options: ParserOptions,
    error: Option<Error>,
}

impl ParserBuilder {
    pub fn rule(mut self, name: impl Into<String>, rule: Rule) -> Self {
        if let Err(e) = self.registry.register(name, rule) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Registers a method that rules can be bound to by name
    pub fn method(mut self, name: impl Into<String>, transform: Transform) -> Self {
        self.registry.add_method(name, transform);
        self
    }

    pub fn methods(mut self, methods: FunctionTable) -> Self {
        self.registry.add_methods(methods);
        self
    }

    pub fn options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Keep every Single match on a line instead of only the last one
    pub fn promote_repeats(mut self, enabled: bool) -> Self {
        self.options.promote_repeats = enabled;
        self
    }

    pub fn build(self) -> Result<Parser> {
        if let Some(e) = self.error {
            return Err(e);
        }
        Ok(Parser::new(self.registry, self.options))
    }
}
