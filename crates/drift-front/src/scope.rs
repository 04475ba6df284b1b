//! The per-function scope and safety tracker.
//!
//! Threaded through function lowering, this structure does three jobs at
//! once:
//!
//! 1. tracks local variables per lexical scope (declaration order, LIFO
//!    destruction, duplicate detection along the whole chain to the root);
//! 2. carries the `unsafe` flag per frame, so `is_unsafe` answers whether
//!    any enclosing frame opted in;
//! 3. records labels and gotos for post-body legality checking.
//!
//! Goto legality works on a flat linearization of scope events. Every
//! variable declaration, label definition, and goto is appended to one
//! list, and each event keeps a back-edge to the preceding event on the
//! same control path: pushing a scope continues from the parent's last
//! event, popping restores it, so events in a closed sibling scope are
//! invisible to what follows. For a goto, the events on its path but not
//! on its label's path are the variables to unwind; events on the label's
//! path but not the goto's are declarations the jump would skip.

use std::collections::HashMap;

use drift_context::{Diagnostic, Diagnostics, SourceSpan};
use drift_mir::{BlockId, TypeId};

/// A local variable owned by one lexical scope frame.
#[derive(Debug, Clone)]
pub struct LocalVariable {
    pub ty: TypeId,
    pub declared_at: SourceSpan,
}

/// A label seen by the tracker. Forward declarations (from a goto that
/// precedes the label) start unresolved and pick up their span when the
/// label statement arrives.
#[derive(Debug, Clone)]
pub struct FunctionLabel {
    block: BlockId,
    resolved: bool,
    span: Option<SourceSpan>,
}

impl FunctionLabel {
    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn span(&self) -> Option<SourceSpan> {
        self.span
    }
}

/// A position inside a function body where operations can be inserted
/// later: block id plus instruction index within the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertPoint {
    pub block: BlockId,
    pub index: usize,
}

/// One goto with the unwind list the fixup pass must insert before its
/// jump instruction, innermost declaration first.
#[derive(Debug, Clone)]
pub struct GotoFixup {
    pub point: InsertPoint,
    pub span: SourceSpan,
    pub unwind: Vec<String>,
}

#[derive(Debug, Clone)]
enum ScopeEvent {
    VarDecl { name: String, span: SourceSpan },
    LabelDef,
    GotoDef { label: String, point: InsertPoint, span: SourceSpan },
}

#[derive(Debug, Clone, Copy)]
struct LoopTargets {
    break_block: BlockId,
    continue_block: BlockId,
}

#[derive(Debug)]
struct Frame {
    parent: Option<usize>,
    is_unsafe: bool,
    loop_targets: Option<LoopTargets>,
    variables: indexmap::IndexMap<String, LocalVariable>,
}

impl Frame {
    fn is_loop(&self) -> bool {
        self.loop_targets.is_some()
    }
}

#[derive(Debug)]
pub struct ScopeTracker {
    frames: Vec<Frame>,
    current: usize,
    labels: HashMap<String, FunctionLabel>,
    flat: Vec<ScopeEvent>,
    back_edges: HashMap<usize, usize>,
    /// Last event index on the current control path, one entry per open
    /// frame.
    prior: Vec<Option<usize>>,
    label_positions: HashMap<String, usize>,
    goto_positions: Vec<usize>,
}

impl ScopeTracker {
    /// A tracker with the function's root frame. The root is unsafe iff
    /// the function itself is declared unsafe.
    pub fn new(root_is_unsafe: bool) -> Self {
        ScopeTracker {
            frames: vec![Frame {
                parent: None,
                is_unsafe: root_is_unsafe,
                loop_targets: None,
                variables: indexmap::IndexMap::new(),
            }],
            current: 0,
            labels: HashMap::new(),
            flat: Vec::new(),
            back_edges: HashMap::new(),
            prior: vec![None],
            label_positions: HashMap::new(),
            goto_positions: Vec::new(),
        }
    }

    // -- frames ------------------------------------------------------------

    pub fn push(&mut self, is_unsafe: bool) {
        self.push_frame(is_unsafe, None);
    }

    /// Loop scopes carry their break/continue targets and are never
    /// themselves unsafe; wrap the loop in an unsafe block if that is
    /// needed.
    pub fn push_loop(&mut self, break_block: BlockId, continue_block: BlockId) {
        self.push_frame(
            false,
            Some(LoopTargets {
                break_block,
                continue_block,
            }),
        );
    }

    fn push_frame(&mut self, is_unsafe: bool, loop_targets: Option<LoopTargets>) {
        self.frames.push(Frame {
            parent: Some(self.current),
            is_unsafe,
            loop_targets,
            variables: indexmap::IndexMap::new(),
        });
        self.current = self.frames.len() - 1;
        let continued = *self.prior.last().unwrap_or(&None);
        self.prior.push(continued);
    }

    pub fn pop(&mut self) {
        if let Some(parent) = self.frames[self.current].parent {
            self.current = parent;
            self.prior.pop();
        }
    }

    // -- variables ---------------------------------------------------------

    /// Walks from the current frame to the root looking for `name`.
    pub fn variable(&self, name: &str) -> Option<&LocalVariable> {
        let mut frame = Some(self.current);
        while let Some(index) = frame {
            if let Some(variable) = self.frames[index].variables.get(name) {
                return Some(variable);
            }
            frame = self.frames[index].parent;
        }
        None
    }

    /// Declares a local in the current frame. Shadowing any name already
    /// in scope is an error; the declaration is dropped and `false`
    /// returned so the caller can skip dependent work.
    pub fn declare_variable(
        &mut self,
        name: &str,
        ty: TypeId,
        span: SourceSpan,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        if let Some(existing) = self.variable(name) {
            diagnostics.add(
                Diagnostic::new("Duplicate Local Variable.")
                    .with_label(
                        span,
                        format!(
                            "Variable with name {} is already in scope and cannot be duplicated.",
                            name
                        ),
                    )
                    .with_label(existing.declared_at, "First declared here."),
            );
            return false;
        }
        self.frames[self.current].variables.insert(
            name.to_string(),
            LocalVariable {
                ty,
                declared_at: span,
            },
        );
        self.record(ScopeEvent::VarDecl {
            name: name.to_string(),
            span,
        });
        true
    }

    // -- unsafe and loops --------------------------------------------------

    /// `true` iff any frame on the current stack is unsafe.
    pub fn is_unsafe(&self) -> bool {
        let mut frame = Some(self.current);
        while let Some(index) = frame {
            if self.frames[index].is_unsafe {
                return true;
            }
            frame = self.frames[index].parent;
        }
        false
    }

    pub fn is_in_loop(&self) -> bool {
        self.nearest_loop().is_some()
    }

    pub fn loop_break_block(&self) -> Option<BlockId> {
        self.nearest_loop().map(|targets| targets.break_block)
    }

    pub fn loop_continue_block(&self) -> Option<BlockId> {
        self.nearest_loop().map(|targets| targets.continue_block)
    }

    fn nearest_loop(&self) -> Option<LoopTargets> {
        let mut frame = Some(self.current);
        while let Some(index) = frame {
            if let Some(targets) = self.frames[index].loop_targets {
                return Some(targets);
            }
            frame = self.frames[index].parent;
        }
        None
    }

    // -- unwind queries ----------------------------------------------------

    /// Every variable in scope, innermost frame first, reverse declaration
    /// order within a frame. Used by `return`.
    pub fn unwind_for_root(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut frame = Some(self.current);
        while let Some(index) = frame {
            names.extend(self.frames[index].variables.keys().rev().cloned());
            frame = self.frames[index].parent;
        }
        names
    }

    /// The current frame's variables in reverse declaration order. Used at
    /// normal scope exit.
    pub fn unwind_for_scope(&self) -> Vec<String> {
        self.frames[self.current]
            .variables
            .keys()
            .rev()
            .cloned()
            .collect()
    }

    /// Variables of every frame from the current one up to and including
    /// the nearest loop frame. Used by `break`.
    pub fn unwind_for_break(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut frame = Some(self.current);
        while let Some(index) = frame {
            names.extend(self.frames[index].variables.keys().rev().cloned());
            if self.frames[index].is_loop() {
                break;
            }
            frame = self.frames[index].parent;
        }
        names
    }

    // -- labels and gotos --------------------------------------------------

    pub fn label(&self, name: &str) -> Option<&FunctionLabel> {
        self.labels.get(name)
    }

    /// Forward-declares a label from a goto that precedes it. No event is
    /// recorded; the definition site does that.
    pub fn declare_label(&mut self, name: &str, block: BlockId) {
        self.labels.insert(
            name.to_string(),
            FunctionLabel {
                block,
                resolved: false,
                span: None,
            },
        );
    }

    /// Defines a label that was not forward-declared.
    pub fn define_label(&mut self, name: &str, block: BlockId, span: SourceSpan) {
        self.labels.insert(
            name.to_string(),
            FunctionLabel {
                block,
                resolved: true,
                span: Some(span),
            },
        );
        self.label_positions.insert(name.to_string(), self.flat.len());
        self.record(ScopeEvent::LabelDef);
    }

    /// Resolves a previously forward-declared label at its definition
    /// site.
    pub fn resolve_label(&mut self, name: &str, span: SourceSpan) {
        if let Some(label) = self.labels.get_mut(name) {
            label.resolved = true;
            label.span = Some(span);
        }
        self.label_positions.insert(name.to_string(), self.flat.len());
        self.record(ScopeEvent::LabelDef);
    }

    /// Records a goto and the exact point where unwind operations must be
    /// inserted ahead of its jump.
    pub fn add_goto(&mut self, label: &str, point: InsertPoint, span: SourceSpan) {
        self.goto_positions.push(self.flat.len());
        self.record(ScopeEvent::GotoDef {
            label: label.to_string(),
            point,
            span,
        });
    }

    fn record(&mut self, event: ScopeEvent) {
        let index = self.flat.len();
        if let Some(Some(previous)) = self.prior.last() {
            self.back_edges.insert(index, *previous);
        }
        if let Some(slot) = self.prior.last_mut() {
            *slot = Some(index);
        }
        self.flat.push(event);
    }

    // -- goto legality -----------------------------------------------------

    /// Validates every recorded goto once the body is fully lowered.
    ///
    /// Returns the per-goto unwind insertions, or `None` when any goto was
    /// illegal (undefined label, or a jump that would skip a variable
    /// initialization).
    pub fn check(&self, diagnostics: &mut Diagnostics) -> Option<Vec<GotoFixup>> {
        let mut fixups = Vec::new();
        let mut ok = true;

        for &goto_index in &self.goto_positions {
            let (label_name, point, goto_span) = match &self.flat[goto_index] {
                ScopeEvent::GotoDef { label, point, span } => (label, *point, *span),
                _ => continue,
            };

            let label = match self.labels.get(label_name) {
                Some(label) if label.is_resolved() => label,
                _ => {
                    diagnostics.add_simple(
                        goto_span,
                        "Goto for an un-defined label.",
                        format!("Goto label {} had an undefined destination.", label_name),
                    );
                    ok = false;
                    continue;
                }
            };
            let label_index = match self.label_positions.get(label_name) {
                Some(&index) => index,
                None => {
                    diagnostics.add_simple(
                        goto_span,
                        "Compiler Bug! Label defined without a location",
                        format!("Label {} is resolved but has no recorded position.", label_name),
                    );
                    ok = false;
                    continue;
                }
            };

            let prior_to_goto = self.walk_priors(goto_index);
            let prior_to_label = self.walk_priors(label_index);

            let mut skipped: Vec<SourceSpan> = Vec::new();
            for &index in &prior_to_label {
                if prior_to_goto.contains(&index) {
                    continue;
                }
                if let ScopeEvent::VarDecl { span, .. } = &self.flat[index] {
                    skipped.push(*span);
                }
            }

            let mut unwind: Vec<String> = Vec::new();
            for &index in &prior_to_goto {
                if prior_to_label.contains(&index) {
                    continue;
                }
                if let ScopeEvent::VarDecl { name, .. } = &self.flat[index] {
                    unwind.push(name.clone());
                }
            }
            // Destructors run in reverse declaration order.
            unwind.reverse();

            if let Some(&first_skipped) = skipped.first() {
                let mut diagnostic = Diagnostic::new("Goto would skip initialization.").with_label(
                    goto_span,
                    format!(
                        "Goto label {} would skip initialization of variables in destination scope.",
                        label_name
                    ),
                );
                if let Some(label_span) = label.span() {
                    diagnostic = diagnostic.with_label(label_span, "Label declared here.");
                }
                diagnostic =
                    diagnostic.with_label(first_skipped, "Skipped initialization occurs here.");
                diagnostics.add(diagnostic);
                ok = false;
            }

            fixups.push(GotoFixup {
                point,
                span: goto_span,
                unwind,
            });
        }

        ok.then_some(fixups)
    }

    /// The event and all its ancestors along back-edges, in ascending
    /// index order.
    fn walk_priors(&self, start: usize) -> Vec<usize> {
        let mut priors = Vec::new();
        let mut current = start;
        loop {
            priors.push(current);
            match self.back_edges.get(&current) {
                Some(&previous) => current = previous,
                None => break,
            }
        }
        priors.sort_unstable();
        priors
    }
}
