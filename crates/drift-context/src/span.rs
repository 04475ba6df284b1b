//! Source references.
//!
//! Every syntax node, MIR operation, and diagnostic message carries a
//! [`SourceSpan`] naming the file and the start/end line and column of the
//! source text it came from. Spans are produced by the lexer and passed
//! through the pipeline verbatim; the core never re-derives them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one source file within a compilation.
///
/// The mapping from `FileId` to a path is owned by the driver; the core
/// only threads the id through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A region of source text: file plus start/end line and column.
///
/// Lines and columns are 1-based, matching what editors display. A span
/// with line 0 is a synthesized location (compiler-inserted operations
/// such as goto unwinds reuse the span of the statement that caused them,
/// so synthesized spans are rare).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub file: FileId,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceSpan {
    pub fn new(
        file: FileId,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        SourceSpan {
            file,
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// A span covering a single point.
    pub fn point(file: FileId, line: u32, column: u32) -> Self {
        SourceSpan::new(file, line, column, line, column)
    }

    /// A synthesized span with no real source location.
    pub fn synthetic() -> Self {
        SourceSpan::new(FileId(0), 0, 0, 0, 0)
    }

    /// The smallest span covering both `self` and `other`.
    ///
    /// Assumes both spans are in the same file; keeps `self.file`.
    pub fn merge(&self, other: &SourceSpan) -> SourceSpan {
        let (start_line, start_column) =
            if (other.start_line, other.start_column) < (self.start_line, self.start_column) {
                (other.start_line, other.start_column)
            } else {
                (self.start_line, self.start_column)
            };
        let (end_line, end_column) =
            if (other.end_line, other.end_column) > (self.end_line, self.end_column) {
                (other.end_line, other.end_column)
            } else {
                (self.end_line, self.end_column)
            };
        SourceSpan {
            file: self.file,
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start_line, self.start_column)
    }
}
