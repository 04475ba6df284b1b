//! The Drift type vocabulary.
//!
//! A [`Type`] is an immutable descriptor owned by the
//! [`TypeRegistry`](crate::registry::TypeRegistry); everything else refers
//! to types through [`TypeId`](crate::registry::TypeId) handles, so
//! type-to-type relations (pointee, element, argument types, member types)
//! never form ownership cycles.
//!
//! Each type has a canonical fully-qualified name, which is also its
//! interning key: two types are the same type iff their canonical names are
//! equal, and the registry guarantees equal names share one `TypeId`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use drift_context::SourceSpan;

use crate::registry::TypeId;

/// Width and signedness of a primitive integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntWidth {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    pub fn is_signed(self) -> bool {
        matches!(self, IntWidth::I8 | IntWidth::I16 | IntWidth::I32 | IntWidth::I64)
    }

    /// Size in bytes.
    pub fn size(self) -> u64 {
        match self {
            IntWidth::U8 | IntWidth::I8 => 1,
            IntWidth::U16 | IntWidth::I16 => 2,
            IntWidth::U32 | IntWidth::I32 => 4,
            IntWidth::U64 | IntWidth::I64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntWidth::U8 => "u8",
            IntWidth::U16 => "u16",
            IntWidth::U32 => "u32",
            IntWidth::U64 => "u64",
            IntWidth::I8 => "i8",
            IntWidth::I16 => "i16",
            IntWidth::I32 => "i32",
            IntWidth::I64 => "i64",
        }
    }
}

/// Width of a primitive floating-point type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatWidth {
    F32,
    F64,
}

impl FloatWidth {
    pub fn size(self) -> u64 {
        match self {
            FloatWidth::F32 => 4,
            FloatWidth::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FloatWidth::F32 => "f32",
            FloatWidth::F64 => "f64",
        }
    }
}

/// A member variable of a composite type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeMember {
    pub ty: TypeId,
    pub declared_at: SourceSpan,
}

/// A method entry on a composite type.
///
/// The callable shape lives in the referenced function-pointer type, whose
/// argument list already includes the implicit leading `<this>` pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeMethod {
    pub function_pointer: TypeId,
    pub declared_at: SourceSpan,
}

/// One declared argument of a function-pointer type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureArgument {
    pub name: String,
    pub ty: TypeId,
    pub declared_at: SourceSpan,
}

/// The kind tag of a [`Type`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeKind {
    Void,
    Bool,
    Int(IntWidth),
    Float(FloatWidth),

    /// Raw pointer. Dereference and arrow access are gated on `unsafe`.
    Pointer { target: TypeId },

    /// Reference. Dereference is allowed in safe code.
    Reference { target: TypeId },

    /// Fixed-size array.
    Array { element: TypeId, length: u64 },

    /// Class or struct: named members plus named methods, both in
    /// declaration order.
    Composite {
        members: IndexMap<String, CompositeMember>,
        methods: IndexMap<String, CompositeMethod>,
    },

    /// Function pointer: the type of a function symbol and the callee shape
    /// of a call.
    FunctionPointer {
        arguments: Vec<SignatureArgument>,
        return_type: TypeId,
        is_unsafe: bool,
    },

    /// The value of `object.method` before it is called: the class paired
    /// with the method's function-pointer type.
    MethodCall { class: TypeId, function_pointer: TypeId },
}

/// An interned type: canonical name, kind, and the location of its
/// declaration (synthetic for types the lowering stage creates on demand,
/// such as pointer-to wrappings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Type {
    pub name: String,
    pub kind: TypeKind,
    pub declared_at: SourceSpan,
}

impl Type {
    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.kind, TypeKind::Bool)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind, TypeKind::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self.kind, TypeKind::Float(_))
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_signed(&self) -> bool {
        matches!(self.kind, TypeKind::Int(w) if w.is_signed())
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self.kind, TypeKind::Int(w) if !w.is_signed())
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer { .. })
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, TypeKind::Reference { .. })
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, TypeKind::Composite { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array { .. })
    }

    pub fn is_function_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::FunctionPointer { .. })
    }

    pub fn is_method_call(&self) -> bool {
        matches!(self.kind, TypeKind::MethodCall { .. })
    }

    /// Byte width of primitives. Pointers and references count as one
    /// machine word. `None` for everything whose size needs the registry
    /// (arrays, composites) or has none (void).
    pub fn primitive_size(&self) -> Option<u64> {
        match self.kind {
            TypeKind::Bool => Some(1),
            TypeKind::Int(w) => Some(w.size()),
            TypeKind::Float(w) => Some(w.size()),
            TypeKind::Pointer { .. }
            | TypeKind::Reference { .. }
            | TypeKind::FunctionPointer { .. } => Some(8),
            _ => None,
        }
    }

    /// The target of a pointer or reference, or the element type of an
    /// array.
    pub fn pointer_target(&self) -> Option<TypeId> {
        match self.kind {
            TypeKind::Pointer { target } | TypeKind::Reference { target } => Some(target),
            TypeKind::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    pub fn member(&self, name: &str) -> Option<&CompositeMember> {
        match &self.kind {
            TypeKind::Composite { members, .. } => members.get(name),
            _ => None,
        }
    }

    pub fn method(&self, name: &str) -> Option<&CompositeMethod> {
        match &self.kind {
            TypeKind::Composite { methods, .. } => methods.get(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_context::SourceSpan;

    fn ty(kind: TypeKind) -> Type {
        Type {
            name: "test".into(),
            kind,
            declared_at: SourceSpan::synthetic(),
        }
    }

    #[test]
    fn integer_predicates() {
        let t = ty(TypeKind::Int(IntWidth::U32));
        assert!(t.is_integer());
        assert!(t.is_numeric());
        assert!(t.is_unsigned());
        assert!(!t.is_signed());
        assert!(!t.is_float());
        assert_eq!(t.primitive_size(), Some(4));
    }

    #[test]
    fn signed_widths() {
        assert!(IntWidth::I8.is_signed());
        assert!(IntWidth::I64.is_signed());
        assert!(!IntWidth::U8.is_signed());
        assert!(!IntWidth::U64.is_signed());
    }

    #[test]
    fn int_width_sizes() {
        assert_eq!(IntWidth::U8.size(), 1);
        assert_eq!(IntWidth::I16.size(), 2);
        assert_eq!(IntWidth::U32.size(), 4);
        assert_eq!(IntWidth::I64.size(), 8);
    }

    #[test]
    fn float_predicates() {
        let t = ty(TypeKind::Float(FloatWidth::F64));
        assert!(t.is_float());
        assert!(t.is_numeric());
        assert!(!t.is_integer());
        assert!(!t.is_signed());
        assert!(!t.is_unsigned());
        assert_eq!(t.primitive_size(), Some(8));
    }

    #[test]
    fn pointer_targets() {
        let p = ty(TypeKind::Pointer { target: TypeId(4) });
        assert!(p.is_pointer());
        assert_eq!(p.pointer_target(), Some(TypeId(4)));
        assert_eq!(p.primitive_size(), Some(8));

        let r = ty(TypeKind::Reference { target: TypeId(4) });
        assert!(r.is_reference());
        assert_eq!(r.pointer_target(), Some(TypeId(4)));

        let a = ty(TypeKind::Array {
            element: TypeId(4),
            length: 8,
        });
        assert!(a.is_array());
        assert_eq!(a.pointer_target(), Some(TypeId(4)));
        assert_eq!(a.primitive_size(), None);
    }

    #[test]
    fn void_has_no_size() {
        let t = ty(TypeKind::Void);
        assert!(t.is_void());
        assert!(!t.is_numeric());
        assert_eq!(t.primitive_size(), None);
    }

    #[test]
    fn composite_member_lookup() {
        let mut members = IndexMap::new();
        members.insert(
            "x".to_string(),
            CompositeMember {
                ty: TypeId(4),
                declared_at: SourceSpan::synthetic(),
            },
        );
        let t = ty(TypeKind::Composite {
            members,
            methods: IndexMap::new(),
        });
        assert!(t.is_composite());
        assert!(t.member("x").is_some());
        assert!(t.member("y").is_none());
        assert!(t.method("x").is_none());
    }
}
