//! Compile error collection.
//!
//! The pipeline is fail-soft: no error aborts lowering. Every stage pushes
//! [`Diagnostic`] values into a shared [`Diagnostics`] sink and carries on,
//! so a single run surfaces as many independent errors as possible. A
//! translation unit whose sink is non-empty at the end of lowering must not
//! be handed to code generation.

use serde::{Deserialize, Serialize};

use crate::span::SourceSpan;

/// One labeled source location inside a diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticLabel {
    pub span: SourceSpan,
    pub message: String,
}

/// A single compile error: a title plus one or more labeled spans.
///
/// Multi-site errors (declaration/definition mismatches, duplicate
/// declarations, skipped initializations) attach one label per site so the
/// renderer can point at all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub title: String,
    pub labels: Vec<DiagnosticLabel>,
}

impl Diagnostic {
    pub fn new(title: impl Into<String>) -> Self {
        Diagnostic {
            title: title.into(),
            labels: Vec::new(),
        }
    }

    /// Appends a labeled span. Labels render in insertion order; the first
    /// one names the primary location.
    pub fn with_label(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        self.labels.push(DiagnosticLabel {
            span,
            message: message.into(),
        });
        self
    }
}

/// The fail-soft diagnostic sink threaded through the whole pipeline.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
    }

    /// Convenience for the common single-site case.
    pub fn add_simple(
        &mut self,
        span: SourceSpan,
        title: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.add(Diagnostic::new(title).with_label(span, message));
    }

    /// `true` once any error has been recorded. MIR produced under a
    /// non-empty sink is not forwarded to code generation.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{FileId, SourceSpan};

    fn span(line: u32) -> SourceSpan {
        SourceSpan::new(FileId(0), line, 1, line, 10)
    }

    #[test]
    fn empty_sink_has_no_errors() {
        let sink = Diagnostics::new();
        assert!(!sink.has_errors());
        assert!(sink.is_empty());
        assert_eq!(sink.len(), 0);
    }

    #[test]
    fn add_simple_records_one_label() {
        let mut sink = Diagnostics::new();
        sink.add_simple(span(3), "Unresolved symbol", "name `foo` was not found");
        assert!(sink.has_errors());
        assert_eq!(sink.len(), 1);

        let diag = sink.iter().next().unwrap();
        assert_eq!(diag.title, "Unresolved symbol");
        assert_eq!(diag.labels.len(), 1);
        assert_eq!(diag.labels[0].span, span(3));
    }

    #[test]
    fn multi_site_diagnostic_keeps_label_order() {
        let mut sink = Diagnostics::new();
        sink.add(
            Diagnostic::new("Duplicate Local Variable.")
                .with_label(span(9), "second declaration")
                .with_label(span(2), "First declared here."),
        );

        let diag = sink.iter().next().unwrap();
        assert_eq!(diag.labels[0].span, span(9));
        assert_eq!(diag.labels[1].span, span(2));
    }

    #[test]
    fn errors_accumulate_without_aborting() {
        let mut sink = Diagnostics::new();
        for i in 0..5 {
            sink.add_simple(span(i), "Type mismatch in binary operation", "detail");
        }
        assert_eq!(sink.len(), 5);
    }

    #[test]
    fn serde_roundtrip() {
        let mut sink = Diagnostics::new();
        sink.add_simple(span(1), "Invalid Character Literal", "bad escape");
        let json = serde_json::to_string(&sink).unwrap();
        let back: Diagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.iter().next().unwrap().title, "Invalid Character Literal");
    }
}
