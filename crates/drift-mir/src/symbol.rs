//! The symbol table: fully-qualified name -> typed symbol.
//!
//! Symbols cover globals and function declarations. Function symbols carry
//! a function-pointer type; the lowering stage resolves identifier
//! references against this table after local scope lookup fails.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use drift_context::SourceSpan;

use crate::error::MirError;
use crate::registry::TypeId;

/// A global or function declaration visible by canonical name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub ty: TypeId,
    pub defined_at: SourceSpan,
}

/// All symbols of a translation unit, in registration order.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: IndexMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn add(&mut self, name: &str, ty: TypeId, defined_at: SourceSpan) -> Result<(), MirError> {
        if self.symbols.contains_key(name) {
            return Err(MirError::DuplicateSymbol {
                name: name.to_string(),
            });
        }
        self.symbols.insert(
            name.to_string(),
            Symbol {
                name: name.to_string(),
                ty,
                defined_at,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}
