//! Shared compilation context for the Drift compiler.
//!
//! Provides the two things every stage of the pipeline needs: source
//! references ([`SourceSpan`]) attached to syntax nodes, MIR operations,
//! and diagnostics; and the fail-soft diagnostic sink ([`Diagnostics`])
//! that collects errors without aborting compilation.

pub mod diagnostics;
pub mod span;

pub use diagnostics::{Diagnostic, Diagnostics};
pub use span::{FileId, SourceSpan};
