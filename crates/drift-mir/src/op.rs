//! The MIR operation vocabulary.
//!
//! Every operation shares a uniform header -- source span, optional result
//! temporary, operand temporaries -- plus an [`OpKind`] tag carrying
//! whatever the kind needs (a literal value, a name, a target type, a jump
//! target). Operands are always temporaries defined earlier in the same
//! function; block connectivity lives in the [`Jump`](OpKind::Jump) and
//! [`JumpConditional`](OpKind::JumpConditional) payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use drift_context::SourceSpan;

use crate::block::BlockId;
use crate::registry::TypeId;

/// Handle to a function temporary. Minted by
/// [`Function::tmpvar_define`](crate::function::Function::tmpvar_define);
/// bound to exactly one type for its whole life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TmpId(pub u32);

impl fmt::Display for TmpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_{}", self.0)
    }
}

/// A typed integer literal value, carried bit-exactly from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
}

impl IntValue {
    /// The literal's type tag.
    pub fn type_id(&self) -> TypeId {
        match self {
            IntValue::U8(_) => TypeId::U8,
            IntValue::U16(_) => TypeId::U16,
            IntValue::U32(_) => TypeId::U32,
            IntValue::U64(_) => TypeId::U64,
            IntValue::I8(_) => TypeId::I8,
            IntValue::I16(_) => TypeId::I16,
            IntValue::I32(_) => TypeId::I32,
            IntValue::I64(_) => TypeId::I64,
        }
    }

    /// The numeric value widened into a common representation, for
    /// inspection and dumping.
    pub fn as_i128(&self) -> i128 {
        match *self {
            IntValue::U8(v) => v as i128,
            IntValue::U16(v) => v as i128,
            IntValue::U32(v) => v as i128,
            IntValue::U64(v) => v as i128,
            IntValue::I8(v) => v as i128,
            IntValue::I16(v) => v as i128,
            IntValue::I32(v) => v as i128,
            IntValue::I64(v) => v as i128,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            IntValue::U8(_) => "u8",
            IntValue::U16(_) => "u16",
            IntValue::U32(_) => "u32",
            IntValue::U64(_) => "u64",
            IntValue::I8(_) => "i8",
            IntValue::I16(_) => "i16",
            IntValue::I32(_) => "i32",
            IntValue::I64(_) => "i64",
        }
    }
}

impl fmt::Display for IntValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.as_i128(), self.suffix())
    }
}

/// A floating-point literal value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FloatValue {
    F32(f32),
    F64(f64),
}

impl FloatValue {
    pub fn type_id(&self) -> TypeId {
        match self {
            FloatValue::F32(_) => TypeId::F32,
            FloatValue::F64(_) => TypeId::F64,
        }
    }
}

impl fmt::Display for FloatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FloatValue::F32(v) => write!(f, "{}f32", v),
            FloatValue::F64(v) => write!(f, "{}f64", v),
        }
    }
}

/// The operation kind tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpKind {
    // Literals.
    LiteralInt(IntValue),
    LiteralFloat(FloatValue),
    LiteralChar(u8),
    LiteralString(String),
    LiteralBool(bool),
    LiteralNull,

    // Variables and symbols.
    LocalDeclare { name: String, ty: TypeId },
    LocalUndeclare { name: String },
    LocalVariable { name: String, ty: TypeId },
    Symbol { name: String },

    // Access.
    ArrayIndex,
    Dot { member: String },
    GetMethod { name: String },

    // Widening casts inserted by usual-arithmetic conversion.
    WidenSigned { to: TypeId },
    WidenUnsigned { to: TypeId },
    WidenFloat { to: TypeId },

    // Unary.
    Negate,
    BitwiseNot,
    LogicalNot,
    AddressOf,
    Dereference,
    SizeofType { ty: TypeId },
    MethodGetFunction,
    MethodGetObject,

    // Binary arithmetic.
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // Binary logical.
    LogicalAnd,
    LogicalOr,

    // Binary bitwise and shifts.
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,

    // Comparisons.
    CompareLess,
    CompareGreater,
    CompareLessEqual,
    CompareGreaterEqual,
    CompareEqual,
    CompareNotEqual,

    // Assignment.
    Assign,

    // Calls. Operand 0 is the callee temporary; the rest are arguments in
    // order (for methods and constructors, operand 1 is the object pointer).
    FunctionCall,
    Constructor,

    // Control flow.
    Jump { target: BlockId },
    JumpConditional { if_block: BlockId, else_block: BlockId },
    Return,
    ReturnVoid,
}

impl OpKind {
    /// The dump name of this operation kind.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::LiteralInt(_) => "literal-int",
            OpKind::LiteralFloat(_) => "literal-float",
            OpKind::LiteralChar(_) => "literal-char",
            OpKind::LiteralString(_) => "literal-string",
            OpKind::LiteralBool(_) => "literal-bool",
            OpKind::LiteralNull => "literal-null",
            OpKind::LocalDeclare { .. } => "declare",
            OpKind::LocalUndeclare { .. } => "undeclare",
            OpKind::LocalVariable { .. } => "load",
            OpKind::Symbol { .. } => "symbol",
            OpKind::ArrayIndex => "array-index",
            OpKind::Dot { .. } => "dot",
            OpKind::GetMethod { .. } => "get-method",
            OpKind::WidenSigned { .. } => "widen-signed",
            OpKind::WidenUnsigned { .. } => "widen-unsigned",
            OpKind::WidenFloat { .. } => "widen-float",
            OpKind::Negate => "negate",
            OpKind::BitwiseNot => "bitwise-not",
            OpKind::LogicalNot => "logical-not",
            OpKind::AddressOf => "addressof",
            OpKind::Dereference => "dereference",
            OpKind::SizeofType { .. } => "sizeof",
            OpKind::MethodGetFunction => "method-get-function",
            OpKind::MethodGetObject => "method-get-object",
            OpKind::Add => "add",
            OpKind::Subtract => "subtract",
            OpKind::Multiply => "multiply",
            OpKind::Divide => "divide",
            OpKind::Modulo => "modulo",
            OpKind::LogicalAnd => "logical-and",
            OpKind::LogicalOr => "logical-or",
            OpKind::BitwiseAnd => "bitwise-and",
            OpKind::BitwiseOr => "bitwise-or",
            OpKind::BitwiseXor => "bitwise-xor",
            OpKind::ShiftLeft => "bitwise-shift-left",
            OpKind::ShiftRight => "bitwise-shift-right",
            OpKind::CompareLess => "compare-lt",
            OpKind::CompareGreater => "compare-gt",
            OpKind::CompareLessEqual => "compare-le",
            OpKind::CompareGreaterEqual => "compare-ge",
            OpKind::CompareEqual => "compare-eq",
            OpKind::CompareNotEqual => "compare-ne",
            OpKind::Assign => "store",
            OpKind::FunctionCall => "function-call",
            OpKind::Constructor => "constructor",
            OpKind::Jump { .. } => "jump",
            OpKind::JumpConditional { .. } => "jump-conditional",
            OpKind::Return => "return",
            OpKind::ReturnVoid => "return-void",
        }
    }

    /// Terminators end a basic block and transfer control elsewhere.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            OpKind::Jump { .. } | OpKind::JumpConditional { .. } | OpKind::Return | OpKind::ReturnVoid
        )
    }
}

/// One MIR operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OpKind,
    pub span: SourceSpan,
    /// The temporary this operation produces. `None` for operations that
    /// produce nothing (declares, jumps, returns).
    pub result: Option<TmpId>,
    pub operands: SmallVec<[TmpId; 2]>,
}

impl Operation {
    pub fn new(kind: OpKind, span: SourceSpan, result: Option<TmpId>) -> Self {
        Operation {
            kind,
            span,
            result,
            operands: SmallVec::new(),
        }
    }

    pub fn unary(kind: OpKind, span: SourceSpan, result: TmpId, operand: TmpId) -> Self {
        let mut op = Operation::new(kind, span, Some(result));
        op.operands.push(operand);
        op
    }

    pub fn binary(kind: OpKind, span: SourceSpan, result: TmpId, a: TmpId, b: TmpId) -> Self {
        let mut op = Operation::new(kind, span, Some(result));
        op.operands.push(a);
        op.operands.push(b);
        op
    }

    pub fn is_terminator(&self) -> bool {
        self.kind.is_terminator()
    }

    /// One dump line: `_<result> = <op-name> ( <operands and payload> )`.
    /// Operations without a result omit the left-hand side. The format is
    /// for debugging only; no compatibility is promised across versions.
    pub fn description(&self) -> String {
        let mut line = String::new();
        if let Some(result) = self.result {
            line.push_str(&format!("{} = ", result));
        }
        line.push_str(self.kind.name());
        line.push_str(" (");
        for operand in &self.operands {
            line.push_str(&format!(" {}", operand));
        }
        match &self.kind {
            OpKind::LiteralInt(value) => line.push_str(&format!(" {}", value)),
            OpKind::LiteralFloat(value) => line.push_str(&format!(" {}", value)),
            OpKind::LiteralChar(byte) => line.push_str(&format!(" {:#04x}", byte)),
            OpKind::LiteralString(text) => line.push_str(&format!(" {:?}", text)),
            OpKind::LiteralBool(value) => line.push_str(&format!(" {}", value)),
            OpKind::LocalDeclare { name, .. }
            | OpKind::LocalUndeclare { name }
            | OpKind::LocalVariable { name, .. }
            | OpKind::Symbol { name }
            | OpKind::GetMethod { name } => line.push_str(&format!(" {}", name)),
            OpKind::Dot { member } => line.push_str(&format!(" {}", member)),
            OpKind::WidenSigned { to }
            | OpKind::WidenUnsigned { to }
            | OpKind::WidenFloat { to }
            | OpKind::SizeofType { ty: to } => line.push_str(&format!(" {}", to)),
            OpKind::Jump { target } => line.push_str(&format!(" {}", target)),
            OpKind::JumpConditional { if_block, else_block } => {
                line.push_str(&format!(" {} {}", if_block, else_block));
            }
            _ => {}
        }
        line.push_str(" )");
        line
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}
