//! Basic blocks.
//!
//! A basic block is a maximal straight-line sequence of operations ending
//! in at most one terminator. Lowering appends in emission order; the goto
//! fixup pass additionally inserts `undeclare` operations at recorded
//! positions after the whole body is emitted, so downstream consumers must
//! not assume append-only construction.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::op::{OpKind, Operation};

/// Handle to a basic block within one function. Block 0 is the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BB{}", self.0)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    operations: Vec<Operation>,
    /// Blocks from which this one is reachable. Filled in by
    /// [`Function::compute_reachability`](crate::function::Function::compute_reachability);
    /// empty until then.
    reachable_from: BTreeSet<BlockId>,
}

impl BasicBlock {
    pub fn new() -> Self {
        BasicBlock::default()
    }

    pub fn add(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Inserts at an arbitrary position. Used by goto fixup, which only
    /// learns the unwind list after the body is fully emitted.
    pub fn insert(&mut self, index: usize, operation: Operation) {
        self.operations.insert(index, operation);
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// A block contains a terminator iff its last operation is one.
    pub fn contains_terminator(&self) -> bool {
        self.operations
            .last()
            .map(Operation::is_terminator)
            .unwrap_or(false)
    }

    pub fn terminator(&self) -> Option<&Operation> {
        self.operations.last().filter(|op| op.is_terminator())
    }

    /// The control-flow successors named by this block's terminator.
    pub fn successors(&self) -> Vec<BlockId> {
        match self.terminator().map(|op| &op.kind) {
            Some(OpKind::Jump { target }) => vec![*target],
            Some(OpKind::JumpConditional { if_block, else_block }) => {
                vec![*if_block, *else_block]
            }
            _ => Vec::new(),
        }
    }

    pub fn reachable_from(&self) -> &BTreeSet<BlockId> {
        &self.reachable_from
    }

    pub fn mark_reachable_from(&mut self, block: BlockId) {
        self.reachable_from.insert(block);
    }

    pub fn clear_reachability(&mut self) {
        self.reachable_from.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::TmpId;
    use drift_context::SourceSpan;

    fn op(kind: OpKind) -> Operation {
        Operation::new(kind, SourceSpan::synthetic(), None)
    }

    #[test]
    fn empty_block_has_no_terminator() {
        let block = BasicBlock::new();
        assert!(!block.contains_terminator());
        assert!(block.terminator().is_none());
        assert!(block.successors().is_empty());
    }

    #[test]
    fn terminator_must_be_last() {
        let mut block = BasicBlock::new();
        block.add(op(OpKind::Jump { target: BlockId(1) }));
        assert!(block.contains_terminator());

        // An operation after the jump means the block no longer ends in a
        // terminator; lowering never does this, but the query is positional.
        block.add(op(OpKind::LocalUndeclare { name: "x".into() }));
        assert!(!block.contains_terminator());
    }

    #[test]
    fn successors_of_conditional() {
        let mut block = BasicBlock::new();
        let mut cond = op(OpKind::JumpConditional {
            if_block: BlockId(1),
            else_block: BlockId(2),
        });
        cond.operands.push(TmpId(0));
        block.add(cond);
        assert_eq!(block.successors(), vec![BlockId(1), BlockId(2)]);
    }

    #[test]
    fn returns_have_no_successors() {
        let mut block = BasicBlock::new();
        block.add(op(OpKind::ReturnVoid));
        assert!(block.contains_terminator());
        assert!(block.successors().is_empty());
    }

    #[test]
    fn positional_insert() {
        let mut block = BasicBlock::new();
        block.add(op(OpKind::Jump { target: BlockId(3) }));
        block.insert(0, op(OpKind::LocalUndeclare { name: "a".into() }));
        block.insert(1, op(OpKind::LocalUndeclare { name: "b".into() }));

        let names: Vec<&str> = block.operations().iter().map(|o| o.kind.name()).collect();
        assert_eq!(names, vec!["undeclare", "undeclare", "jump"]);
        assert!(block.contains_terminator());
    }

    #[test]
    fn reachability_marks() {
        let mut block = BasicBlock::new();
        assert!(block.reachable_from().is_empty());
        block.mark_reachable_from(BlockId(0));
        block.mark_reachable_from(BlockId(2));
        block.mark_reachable_from(BlockId(0));
        assert_eq!(block.reachable_from().len(), 2);
    }
}
