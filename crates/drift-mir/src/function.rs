//! MIR functions.
//!
//! A [`Function`] owns its basic blocks and the types of its temporaries.
//! It is constructed empty by the lowering stage, populated block by
//! block, finalized with a reachability pass, and then handed to
//! [`Mir`](crate::mir::Mir).

use indexmap::IndexMap;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};

use drift_context::SourceSpan;

use crate::block::{BasicBlock, BlockId};
use crate::op::TmpId;
use crate::registry::TypeId;

/// One declared argument: name, type, and the spans of both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionArgument {
    pub name: String,
    pub ty: TypeId,
    pub name_span: SourceSpan,
    pub type_span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    name: String,
    return_type: TypeId,
    arguments: Vec<FunctionArgument>,
    is_unsafe: bool,
    span: SourceSpan,
    blocks: IndexMap<BlockId, BasicBlock>,
    tmp_types: Vec<TypeId>,
}

impl Function {
    /// The entry block. Allocated first by convention, so it is always id 0.
    pub const ENTRY: BlockId = BlockId(0);

    pub fn new(
        name: String,
        return_type: TypeId,
        arguments: Vec<FunctionArgument>,
        is_unsafe: bool,
        span: SourceSpan,
    ) -> Self {
        Function {
            name,
            return_type,
            arguments,
            is_unsafe,
            span,
            blocks: IndexMap::new(),
            tmp_types: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> TypeId {
        self.return_type
    }

    pub fn arguments(&self) -> &[FunctionArgument] {
        &self.arguments
    }

    pub fn is_unsafe(&self) -> bool {
        self.is_unsafe
    }

    pub fn span(&self) -> SourceSpan {
        self.span
    }

    // -- temporaries -------------------------------------------------------

    /// Mints a fresh temporary bound to `ty`. The binding never changes.
    pub fn tmpvar_define(&mut self, ty: TypeId) -> TmpId {
        let id = TmpId(self.tmp_types.len() as u32);
        self.tmp_types.push(ty);
        id
    }

    pub fn tmpvar_type(&self, id: TmpId) -> TypeId {
        self.tmp_types[id.0 as usize]
    }

    /// A fresh temporary with the same type as `id`.
    pub fn tmpvar_duplicate(&mut self, id: TmpId) -> TmpId {
        self.tmpvar_define(self.tmpvar_type(id))
    }

    pub fn tmpvar_count(&self) -> usize {
        self.tmp_types.len()
    }

    // -- blocks ------------------------------------------------------------

    pub fn add_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.insert(id, BasicBlock::new());
        id
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[&id]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[&id]
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.blocks.iter().map(|(id, block)| (*id, block))
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Whether `id` survives the reachability pass: the entry block is
    /// always reachable, everything else needs at least one recorded
    /// ancestor.
    pub fn is_reachable(&self, id: BlockId) -> bool {
        id == Self::ENTRY || !self.block(id).reachable_from().is_empty()
    }

    /// Computes `reachable_from` for every block by forward traversal over
    /// the jump edges. A block's set holds every block from which control
    /// can reach it.
    pub fn compute_reachability(&mut self) {
        let mut graph: DiGraphMap<BlockId, ()> = DiGraphMap::new();
        for (id, block) in &self.blocks {
            graph.add_node(*id);
            for successor in block.successors() {
                graph.add_edge(*id, successor, ());
            }
        }

        for block in self.blocks.values_mut() {
            block.clear_reachability();
        }
        let sources: Vec<BlockId> = graph.nodes().collect();
        for source in sources {
            let mut dfs = Dfs::new(&graph, source);
            while let Some(reached) = dfs.next(&graph) {
                if reached != source {
                    if let Some(block) = self.blocks.get_mut(&reached) {
                        block.mark_reachable_from(source);
                    }
                }
            }
        }
    }

    // -- debugging ---------------------------------------------------------

    /// Renders the function as text: a `BB<id>:` header per block, one
    /// operation description per line. Debug output only.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (id, block) in &self.blocks {
            out.push_str(&format!("{}:\n", id));
            for op in block.operations() {
                out.push_str(&format!("    {}\n", op.description()));
            }
        }
        out
    }
}
