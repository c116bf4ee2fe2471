//! Diagnostics collected while parsing directives and planning assignments.
//!
//! A [Diagnostics] value is created per invocation (one method, or one file) and handed back to
//! the caller. Nothing is written to a shared sink, so methods can be processed independently.

use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Source position of a directive line or declaration.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, new)]
pub struct Position {
    file: String,
    line: usize,
    column: usize,
}

impl Position {
    pub fn file(&self) -> &str {
        &self.file
    }

    /// 1-based line.
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column.
    pub fn column(&self) -> usize {
        self.column
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display, Serialize)]
pub enum Severity {
    #[display(fmt = "warning")]
    Warning,
    #[display(fmt = "error")]
    Error,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, new)]
pub struct Diagnostic {
    pub severity: Severity,
    pub position: Position,
    pub message: String,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.position, self.severity, self.message)
    }
}

/// Per-invocation diagnostic collector.
///
/// Entries without an explicit position are attributed to the collector's anchor, usually the
/// declaration of the method being processed.
#[derive(Debug)]
pub struct Diagnostics {
    anchor: Position,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(anchor: Position) -> Self {
        Self {
            anchor,
            entries: Vec::new(),
        }
    }

    pub fn anchor(&self) -> &Position {
        &self.anchor
    }

    pub fn warn<M: Into<String>>(&mut self, message: M) {
        let position = self.anchor.clone();
        self.warn_at(position, message);
    }

    pub fn warn_at<M: Into<String>>(&mut self, position: Position, message: M) {
        let diagnostic = Diagnostic::new(Severity::Warning, position, message.into());
        log::debug!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn error_at<M: Into<String>>(&mut self, position: Position, message: M) {
        let diagnostic = Diagnostic::new(Severity::Error, position, message.into());
        log::debug!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    /// Moves all entries of `other` into this collector.
    pub fn absorb(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|diagnostic| diagnostic.severity == Severity::Error)
    }

    /// Consumes the collector and returns the entries ordered by position.
    ///
    /// The sort is stable: entries sharing a position keep their insertion order.
    pub fn sorted(mut self) -> Vec<Diagnostic> {
        self.entries
            .sort_by(|left, right| left.position.cmp(&right.position));
        self.entries
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pos(line: usize) -> Position {
        Position::new("setup.rs".to_owned(), line, 5)
    }

    #[test]
    fn should_sort_by_position_and_keep_insertion_order() {
        let mut diagnostics = Diagnostics::new(pos(10));
        diagnostics.warn_at(pos(12), "second line");
        diagnostics.warn("anchored first");
        diagnostics.error_at(pos(3), "early");
        diagnostics.warn("anchored second");

        assert!(diagnostics.has_errors());
        let messages = diagnostics
            .sorted()
            .into_iter()
            .map(|diagnostic| diagnostic.to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            messages,
            vec![
                "setup.rs:3:5: error: early",
                "setup.rs:10:5: warning: anchored first",
                "setup.rs:10:5: warning: anchored second",
                "setup.rs:12:5: warning: second line",
            ]
        );
    }

    #[test]
    fn should_absorb_other_collector() {
        let mut file = Diagnostics::new(pos(1));
        let mut method = Diagnostics::new(pos(7));
        method.warn("no match");
        file.absorb(method);
        assert_eq!(file.len(), 1);
        assert!(!file.has_errors());
    }
}
