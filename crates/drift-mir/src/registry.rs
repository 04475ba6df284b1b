//! Type interning.
//!
//! The [`TypeRegistry`] is the single owner of every [`Type`] in a
//! translation unit. Types are addressed by [`TypeId`], an index into the
//! registry, and interned by canonical name: requesting `u32*` twice yields
//! the same id. The registry pre-registers the primitive types on
//! construction so lowering can refer to them by constant.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use drift_context::SourceSpan;

use crate::error::MirError;
use crate::types::{FloatWidth, IntWidth, SignatureArgument, Type, TypeKind};

/// Handle to an interned type. The inner value indexes the registry's type
/// vector; ids are only minted by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Pre-registered ids for the built-in types.
impl TypeId {
    pub const VOID: TypeId = TypeId(0);
    pub const BOOL: TypeId = TypeId(1);
    pub const U8: TypeId = TypeId(2);
    pub const U16: TypeId = TypeId(3);
    pub const U32: TypeId = TypeId(4);
    pub const U64: TypeId = TypeId(5);
    pub const I8: TypeId = TypeId(6);
    pub const I16: TypeId = TypeId(7);
    pub const I32: TypeId = TypeId(8);
    pub const I64: TypeId = TypeId(9);
    pub const F32: TypeId = TypeId(10);
    pub const F64: TypeId = TypeId(11);
}

/// Registry of all types in a translation unit.
///
/// Construction pre-registers, in order: `void`, `bool`, `u8`, `u16`,
/// `u32`, `u64`, `i8`, `i16`, `i32`, `i64`, `f32`, `f64`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRegistry {
    types: Vec<Type>,
    names: IndexMap<String, TypeId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = TypeRegistry {
            types: Vec::new(),
            names: IndexMap::new(),
        };
        let builtin = SourceSpan::synthetic();
        for (name, kind) in [
            ("void", TypeKind::Void),
            ("bool", TypeKind::Bool),
            ("u8", TypeKind::Int(IntWidth::U8)),
            ("u16", TypeKind::Int(IntWidth::U16)),
            ("u32", TypeKind::Int(IntWidth::U32)),
            ("u64", TypeKind::Int(IntWidth::U64)),
            ("i8", TypeKind::Int(IntWidth::I8)),
            ("i16", TypeKind::Int(IntWidth::I16)),
            ("i32", TypeKind::Int(IntWidth::I32)),
            ("i64", TypeKind::Int(IntWidth::I64)),
            ("f32", TypeKind::Float(FloatWidth::F32)),
            ("f64", TypeKind::Float(FloatWidth::F64)),
        ] {
            registry.intern(Type {
                name: name.to_string(),
                kind,
                declared_at: builtin,
            });
        }
        registry
    }

    /// Interns a type under its canonical name, returning the existing id
    /// if the name is already bound.
    fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.names.get(&ty.name) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.names.insert(ty.name.clone(), id);
        self.types.push(ty);
        id
    }

    /// Registers a freshly declared named type (a class, typedef target, or
    /// function-pointer declaration). Unlike the on-demand constructors
    /// below, re-registering an existing name is an error here: two
    /// declarations produced the same canonical name.
    pub fn register(&mut self, ty: Type) -> Result<TypeId, MirError> {
        if self.names.contains_key(&ty.name) {
            return Err(MirError::DuplicateTypeName { name: ty.name });
        }
        Ok(self.intern(ty))
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn try_get(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.0 as usize)
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.get(id).name
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// `T` -> `T*`.
    pub fn pointer_to(&mut self, target: TypeId, declared_at: SourceSpan) -> TypeId {
        let name = format!("{}*", self.name(target));
        self.intern(Type {
            name,
            kind: TypeKind::Pointer { target },
            declared_at,
        })
    }

    /// `T` -> `T&`.
    pub fn reference_to(&mut self, target: TypeId, declared_at: SourceSpan) -> TypeId {
        let name = format!("{}&", self.name(target));
        self.intern(Type {
            name,
            kind: TypeKind::Reference { target },
            declared_at,
        })
    }

    /// `T` -> `T[N]`.
    pub fn array_of(&mut self, element: TypeId, length: u64, declared_at: SourceSpan) -> TypeId {
        let name = format!("{}[{}]", self.name(element), length);
        self.intern(Type {
            name,
            kind: TypeKind::Array { element, length },
            declared_at,
        })
    }

    /// A function-pointer type. The canonical name is derived from the
    /// signature, so structurally identical signatures share one id.
    pub fn function_pointer(
        &mut self,
        arguments: Vec<SignatureArgument>,
        return_type: TypeId,
        is_unsafe: bool,
        declared_at: SourceSpan,
    ) -> TypeId {
        let mut name = String::new();
        if is_unsafe {
            name.push_str("unsafe ");
        }
        name.push_str(self.name(return_type));
        name.push('(');
        for (i, arg) in arguments.iter().enumerate() {
            if i > 0 {
                name.push(',');
            }
            name.push_str(self.name(arg.ty));
        }
        name.push(')');
        self.intern(Type {
            name,
            kind: TypeKind::FunctionPointer {
                arguments,
                return_type,
                is_unsafe,
            },
            declared_at,
        })
    }

    /// Fills in the body of a forward-declared composite. Class names are
    /// registered before their bodies -- method signatures refer to
    /// pointer-to-class, so the body necessarily arrives second.
    pub fn define_composite(
        &mut self,
        id: TypeId,
        members: indexmap::IndexMap<String, crate::types::CompositeMember>,
        methods: indexmap::IndexMap<String, crate::types::CompositeMethod>,
    ) -> Result<(), MirError> {
        let ty = &mut self.types[id.0 as usize];
        match ty.kind {
            TypeKind::Composite { .. } => {
                ty.kind = TypeKind::Composite { members, methods };
                Ok(())
            }
            _ => Err(MirError::NotComposite {
                name: ty.name.clone(),
            }),
        }
    }

    /// The value type of `object.method`: the class paired with the
    /// method's function-pointer type.
    pub fn method_call(
        &mut self,
        class: TypeId,
        function_pointer: TypeId,
        declared_at: SourceSpan,
    ) -> TypeId {
        let name = format!(
            "<method {} on {}>",
            self.name(function_pointer),
            self.name(class)
        );
        self.intern(Type {
            name,
            kind: TypeKind::MethodCall {
                class,
                function_pointer,
            },
            declared_at,
        })
    }

    /// Size in bytes, where defined. Composites are the sum of their member
    /// sizes (layout padding is the back-end's concern); method-call values
    /// are a function pointer plus an object pointer.
    pub fn size_of(&self, id: TypeId) -> Option<u64> {
        let ty = self.get(id);
        if let Some(size) = ty.primitive_size() {
            return Some(size);
        }
        match &ty.kind {
            TypeKind::Array { element, length } => {
                self.size_of(*element).map(|size| size * length)
            }
            TypeKind::Composite { members, .. } => {
                let mut total = 0;
                for member in members.values() {
                    total += self.size_of(member.ty)?;
                }
                Some(total)
            }
            TypeKind::MethodCall { .. } => Some(16),
            _ => None,
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
