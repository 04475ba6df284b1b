//! Namespace management.
//!
//! A translation unit's namespaces form a tree: plain namespaces contain
//! other entries, typedefs are leaves, and classes are both a type and a
//! namespace of their own members. The parser shares this structure with
//! the lexer so the grammar can tell type names, namespace names, and plain
//! identifiers apart; the lowering stage reuses it to canonicalize
//! identifier references and enforce visibility.
//!
//! Nodes live in an arena addressed by [`ScopeId`]; parent links are ids,
//! so there are no ownership cycles. The tree grows monotonically during
//! parsing and nothing is ever removed.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Handle to one node in the namespace tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

/// What a namespace entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    /// Just a container.
    Namespace,
    /// A type alias that appears inside a namespace.
    Typedef,
    /// A type that is also a namespace specific to that type.
    Class,
}

/// Protection level of a namespace entry.
///
/// Ordered from least to most restrictive; the effective visibility of a
/// node is the maximum along its chain to the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Visibility {
    /// Visible to anyone.
    Public,
    /// Visible inside the same namespace.
    Protected,
    /// Visible inside the same class.
    Private,
}

/// The result of a lookup. A name can resolve and still be unusable from
/// the current context, and diagnostics want to distinguish those cases
/// from a plain miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found(ScopeId),
    NotFoundPrivate,
    NotFoundProtected,
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScopeNode {
    name: String,
    kind: ScopeKind,
    visibility: Visibility,
    parent: Option<ScopeId>,
    children: IndexMap<String, ScopeId>,
    /// `using` aliases declared in this scope, tried in insertion order.
    aliases: IndexMap<String, ScopeId>,
}

/// The namespace tree plus the current nesting stack.
///
/// When a namespace or class is declared the context pushes into it, so
/// resolution proceeds in that context and new entries land inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceContext {
    nodes: Vec<ScopeNode>,
    root: ScopeId,
    stack: Vec<ScopeId>,
}

impl NamespaceContext {
    pub fn new() -> Self {
        let root = ScopeNode {
            name: String::new(),
            kind: ScopeKind::Namespace,
            visibility: Visibility::Public,
            parent: None,
            children: IndexMap::new(),
            aliases: IndexMap::new(),
        };
        NamespaceContext {
            nodes: vec![root],
            root: ScopeId(0),
            stack: vec![ScopeId(0)],
        }
    }

    fn node(&self, id: ScopeId) -> &ScopeNode {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: ScopeId) -> &mut ScopeNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn current(&self) -> ScopeId {
        *self.stack.last().unwrap_or(&self.root)
    }

    pub fn kind(&self, id: ScopeId) -> ScopeKind {
        self.node(id).kind
    }

    pub fn name(&self, id: ScopeId) -> &str {
        &self.node(id).name
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.node(id).parent
    }

    /// Adds a child entry to the current scope and returns its id. If the
    /// name is already taken the existing entry is returned unchanged;
    /// duplicate-declaration errors are the parser's to report.
    pub fn declare(&mut self, name: &str, kind: ScopeKind, visibility: Visibility) -> ScopeId {
        let current = self.current();
        if let Some(&existing) = self.node(current).children.get(name) {
            return existing;
        }
        let id = ScopeId(self.nodes.len() as u32);
        self.nodes.push(ScopeNode {
            name: name.to_string(),
            kind,
            visibility,
            parent: Some(current),
            children: IndexMap::new(),
            aliases: IndexMap::new(),
        });
        self.node_mut(current).children.insert(name.to_string(), id);
        id
    }

    /// Moves the resolution context into the named child. Returns `false`
    /// (and stays put) if no such child exists.
    pub fn push(&mut self, name: &str) -> bool {
        let current = self.current();
        match self.node(current).children.get(name) {
            Some(&child) => {
                self.stack.push(child);
                true
            }
            None => false,
        }
    }

    /// Ends the current namespace or class definition. The root frame is
    /// never popped.
    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Declares a `using` alias in the current scope. An alias `A -> B`
    /// lets `A::Foo` resolve under `B`; an alias with an empty name
    /// flattens `B`'s children into this scope.
    pub fn add_using(&mut self, alias: &str, target: ScopeId) {
        let current = self.current();
        self.node_mut(current)
            .aliases
            .insert(alias.to_string(), target);
    }

    /// Canonical `::`-joined path of a node; empty for the root.
    pub fn fully_qualified(&self, id: ScopeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if !node.name.is_empty() {
                parts.push(node.name.as_str());
            }
            current = node.parent;
        }
        parts.reverse();
        parts.join("::")
    }

    /// Canonical path of a node's parent chain, excluding the node itself.
    pub fn fully_qualified_parent(&self, id: ScopeId) -> String {
        match self.node(id).parent {
            Some(parent) => self.fully_qualified(parent),
            None => String::new(),
        }
    }

    /// Canonical path of the current nesting stack.
    pub fn current_path(&self) -> String {
        self.fully_qualified(self.current())
    }

    /// Most restrictive visibility along the chain to the root.
    pub fn effective_visibility(&self, id: ScopeId) -> Visibility {
        let mut strictest = self.node(id).visibility;
        let mut current = self.node(id).parent;
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if node.visibility > strictest {
                strictest = node.visibility;
            }
            current = node.parent;
        }
        strictest
    }

    /// Resolves a `::`-separated path in the current context.
    ///
    /// A leading `::` forces root-absolute resolution and ignores aliases.
    /// Otherwise the stack is walked top-down; at each frame the path is
    /// tried against that scope's children, then against each alias target
    /// in insertion order. The first path match is visibility-checked:
    /// deeper frames win, and a match that is not visible reports its
    /// protection level rather than falling through to outer frames.
    pub fn lookup(&self, name: &str) -> Lookup {
        if name.is_empty() {
            return Lookup::NotFound;
        }
        let context = self.current_path();

        let segments: Vec<&str> = name.split("::").collect();
        if segments[0].is_empty() {
            // Absolute path.
            return match self.lookup_qualified(&segments[1..], self.root) {
                Some(found) => self.check_visibility(&context, found),
                None => Lookup::NotFound,
            };
        }

        for &frame in self.stack.iter().rev() {
            if let Some(found) = self.lookup_qualified(&segments, frame) {
                return self.check_visibility(&context, found);
            }
            for (alias, &target) in &self.node(frame).aliases {
                let rewritten = if alias.is_empty() {
                    name
                } else {
                    match name.strip_prefix(alias.as_str()).and_then(|rest| rest.strip_prefix("::")) {
                        Some(rest) => rest,
                        None => name,
                    }
                };
                let alias_segments: Vec<&str> = rewritten.split("::").collect();
                if let Some(found) = self.lookup_qualified(&alias_segments, target) {
                    return self.check_visibility(&context, found);
                }
            }
        }
        Lookup::NotFound
    }

    fn lookup_qualified(&self, segments: &[&str], base: ScopeId) -> Option<ScopeId> {
        let mut current = base;
        for segment in segments {
            current = *self.node(current).children.get(*segment)?;
        }
        Some(current)
    }

    fn check_visibility(&self, context: &str, found: ScopeId) -> Lookup {
        match self.effective_visibility(found) {
            Visibility::Public => Lookup::Found(found),
            Visibility::Protected => {
                // Protected entries are visible only from inside the scope
                // that declares them: the requesting context must sit
                // within the resolved entry's parent path.
                let enclosing = match self.node(found).parent {
                    Some(parent) => self.fully_qualified(parent),
                    None => String::new(),
                };
                if path_starts_with(context, &enclosing) {
                    Lookup::Found(found)
                } else {
                    Lookup::NotFoundProtected
                }
            }
            Visibility::Private => {
                // Private entries are visible only from inside their own
                // path: the requesting context must sit within the
                // resolved entry itself.
                let enclosing = self.fully_qualified(found);
                if path_starts_with(context, &enclosing) {
                    Lookup::Found(found)
                } else {
                    Lookup::NotFoundPrivate
                }
            }
        }
    }
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Component-aware prefix test: `geom::inner` is inside `geom`, but
/// `geometry` is not.
fn path_starts_with(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with("::"),
        None => false,
    }
}
