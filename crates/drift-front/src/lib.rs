//! The Drift compiler front-end core.
//!
//! Takes a parsed syntax tree plus a populated namespace catalog and
//! produces validated MIR. Three subsystems, leaf to root:
//!
//! - [`namespace`]: hierarchical scopes, `using` aliases, visibility, and
//!   canonical fully-qualified names
//! - [`scope`]: the per-function scope/safety tracker (locals, labels,
//!   gotos, loop nesting, the `unsafe` context)
//! - [`lower`]: recursive descent over function bodies emitting MIR
//!   operations and basic blocks
//!
//! Supporting modules: [`ast`] is the tree contract with the parser,
//! [`literals`] parses the literal syntax bit-exactly, and
//! [`type_resolver`] turns type specifiers into interned type ids.
//!
//! The pipeline is fail-soft throughout: errors accumulate in a
//! [`Diagnostics`](drift_context::Diagnostics) sink and lowering carries
//! on; MIR produced under a non-empty sink is not forwarded.

pub mod ast;
pub mod literals;
pub mod lower;
pub mod namespace;
pub mod scope;
pub mod type_resolver;

pub use lower::FunctionResolver;
pub use namespace::{Lookup, NamespaceContext, ScopeId, ScopeKind, Visibility};
pub use type_resolver::TypeResolver;
