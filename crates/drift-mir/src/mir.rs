//! The per-translation-unit MIR container.
//!
//! [`Mir`] owns the type registry, the symbol table, and the lowered
//! functions. It performs no validation of its own; lowering is
//! responsible for everything it stores, and a translation unit whose
//! diagnostic sink is non-empty must not be handed downstream.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::MirError;
use crate::function::Function;
use crate::registry::TypeRegistry;
use crate::symbol::SymbolTable;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mir {
    types: TypeRegistry,
    symbols: SymbolTable,
    functions: IndexMap<String, Function>,
}

impl Mir {
    pub fn new() -> Self {
        Mir {
            types: TypeRegistry::new(),
            symbols: SymbolTable::new(),
            functions: IndexMap::new(),
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    pub fn add_function(&mut self, function: Function) -> Result<(), MirError> {
        if self.functions.contains_key(function.name()) {
            return Err(MirError::DuplicateFunction {
                name: function.name().to_string(),
            });
        }
        self.functions.insert(function.name().to_string(), function);
        Ok(())
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Dump of every function, in registration order.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for function in self.functions.values() {
            out.push_str(&format!("{}:\n", function.name()));
            out.push_str(&function.dump());
        }
        out
    }
}

impl Default for Mir {
    fn default() -> Self {
        Self::new()
    }
}
