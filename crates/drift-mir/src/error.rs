//! Structural errors for the MIR data model.
//!
//! These are misuse errors on the containers themselves (duplicate
//! registrations and the like), not compile errors: compile errors are
//! `Diagnostic` values collected by the front-end.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MirError {
    /// Attempting to intern a type under a canonical name that is already
    /// bound to a different type.
    #[error("duplicate type name: '{name}'")]
    DuplicateTypeName { name: String },

    /// Attempting to register a symbol under a fully-qualified name that is
    /// already taken.
    #[error("duplicate symbol: '{name}'")]
    DuplicateSymbol { name: String },

    /// Attempting to register a function under a name that is already taken.
    #[error("duplicate function: '{name}'")]
    DuplicateFunction { name: String },

    /// Attempting to define a class body on a type that is not a
    /// composite.
    #[error("not a composite type: '{name}'")]
    NotComposite { name: String },
}
