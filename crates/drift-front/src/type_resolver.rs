//! Type-specifier resolution.
//!
//! Turns a [`TypeSpecifier`] as written in source into an interned
//! [`TypeId`]. Named types resolve through the namespace context (so
//! visibility applies and `using` aliases work) and then through the type
//! registry by canonical name; pointer, reference, and array wrappings are
//! synthesized on demand. Building composite and alias types out of
//! declarations is the declaration collaborator's job, which runs before
//! function lowering; by the time this resolver is asked for a class, the
//! registry already holds it.

use drift_context::{Diagnostics, SourceSpan};
use drift_mir::{TypeId, TypeRegistry};

use crate::ast::{TypeSpecifier, TypeSpecifierKind};
use crate::namespace::{Lookup, NamespaceContext};

pub struct TypeResolver<'ns> {
    namespaces: &'ns NamespaceContext,
}

impl<'ns> TypeResolver<'ns> {
    pub fn new(namespaces: &'ns NamespaceContext) -> Self {
        TypeResolver { namespaces }
    }

    /// Resolves a specifier to an interned type, or records a diagnostic
    /// and returns `None`.
    pub fn extract_from_type_specifier(
        &self,
        types: &mut TypeRegistry,
        diagnostics: &mut Diagnostics,
        specifier: &TypeSpecifier,
    ) -> Option<TypeId> {
        match &specifier.kind {
            TypeSpecifierKind::Named(name) => {
                self.resolve_named(types, diagnostics, name, specifier.span)
            }
            TypeSpecifierKind::Pointer(inner) => {
                let target = self.extract_from_type_specifier(types, diagnostics, inner)?;
                Some(types.pointer_to(target, specifier.span))
            }
            TypeSpecifierKind::Reference(inner) => {
                let target = self.extract_from_type_specifier(types, diagnostics, inner)?;
                Some(types.reference_to(target, specifier.span))
            }
            TypeSpecifierKind::Array { element, length } => {
                let element = self.extract_from_type_specifier(types, diagnostics, element)?;
                Some(types.array_of(element, *length, specifier.span))
            }
        }
    }

    fn resolve_named(
        &self,
        types: &mut TypeRegistry,
        diagnostics: &mut Diagnostics,
        name: &str,
        span: SourceSpan,
    ) -> Option<TypeId> {
        // Primitives and names that are already canonical hit the registry
        // directly.
        if let Some(id) = types.lookup(name) {
            return Some(id);
        }

        match self.namespaces.lookup(name) {
            Lookup::Found(scope) => {
                let canonical = self.namespaces.fully_qualified(scope);
                match types.lookup(&canonical) {
                    Some(id) => Some(id),
                    None => {
                        diagnostics.add_simple(
                            span,
                            "Type not defined",
                            format!(
                                "Name {} resolves to {} but no such type has been defined.",
                                name, canonical
                            ),
                        );
                        None
                    }
                }
            }
            Lookup::NotFoundPrivate => {
                diagnostics.add_simple(
                    span,
                    "Type not visible",
                    format!("Type {} is private where it was found.", name),
                );
                None
            }
            Lookup::NotFoundProtected => {
                diagnostics.add_simple(
                    span,
                    "Type not visible",
                    format!("Type {} is protected where it was found.", name),
                );
                None
            }
            Lookup::NotFound => {
                diagnostics.add_simple(
                    span,
                    "Type not found",
                    format!("Type {} was not found in this scope.", name),
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_context::{FileId, SourceSpan};
    use drift_mir::types::{Type, TypeKind};
    use indexmap::IndexMap;

    use crate::namespace::{ScopeKind, Visibility};

    fn span() -> SourceSpan {
        SourceSpan::point(FileId(0), 1, 1)
    }

    fn resolve(
        namespaces: &NamespaceContext,
        types: &mut TypeRegistry,
        specifier: &TypeSpecifier,
    ) -> (Option<TypeId>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let resolver = TypeResolver::new(namespaces);
        let id = resolver.extract_from_type_specifier(types, &mut diagnostics, specifier);
        (id, diagnostics)
    }

    #[test]
    fn primitives_resolve_directly() {
        let namespaces = NamespaceContext::new();
        let mut types = TypeRegistry::new();
        let (id, diagnostics) = resolve(
            &namespaces,
            &mut types,
            &TypeSpecifier::named("u32", span()),
        );
        assert_eq!(id, Some(TypeId::U32));
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn pointer_and_reference_wrappings() {
        let namespaces = NamespaceContext::new();
        let mut types = TypeRegistry::new();

        let pointer = TypeSpecifier::pointer(TypeSpecifier::named("u32", span()), span());
        let (id, _) = resolve(&namespaces, &mut types, &pointer);
        assert_eq!(types.name(id.unwrap()), "u32*");

        let reference = TypeSpecifier::reference(TypeSpecifier::named("bool", span()), span());
        let (id, _) = resolve(&namespaces, &mut types, &reference);
        assert_eq!(types.name(id.unwrap()), "bool&");
    }

    #[test]
    fn array_wrapping() {
        let namespaces = NamespaceContext::new();
        let mut types = TypeRegistry::new();
        let array = TypeSpecifier {
            kind: TypeSpecifierKind::Array {
                element: Box::new(TypeSpecifier::named("u8", span())),
                length: 32,
            },
            span: span(),
        };
        let (id, _) = resolve(&namespaces, &mut types, &array);
        assert_eq!(types.name(id.unwrap()), "u8[32]");
    }

    #[test]
    fn class_resolves_through_namespace() {
        let mut namespaces = NamespaceContext::new();
        namespaces.declare("geom", ScopeKind::Namespace, Visibility::Public);
        namespaces.push("geom");
        namespaces.declare("Point", ScopeKind::Class, Visibility::Public);

        let mut types = TypeRegistry::new();
        let class_id = types
            .register(Type {
                name: "geom::Point".into(),
                kind: TypeKind::Composite {
                    members: IndexMap::new(),
                    methods: IndexMap::new(),
                },
                declared_at: span(),
            })
            .unwrap();

        // From inside geom the bare name resolves.
        let (id, diagnostics) = resolve(
            &namespaces,
            &mut types,
            &TypeSpecifier::named("Point", span()),
        );
        assert_eq!(id, Some(class_id));
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn unknown_name_is_reported() {
        let namespaces = NamespaceContext::new();
        let mut types = TypeRegistry::new();
        let (id, diagnostics) = resolve(
            &namespaces,
            &mut types,
            &TypeSpecifier::named("Missing", span()),
        );
        assert!(id.is_none());
        assert_eq!(diagnostics.iter().next().unwrap().title, "Type not found");
    }

    #[test]
    fn private_type_is_reported_as_not_visible() {
        let mut namespaces = NamespaceContext::new();
        namespaces.declare("geom", ScopeKind::Namespace, Visibility::Public);
        namespaces.push("geom");
        namespaces.declare("Point", ScopeKind::Class, Visibility::Public);
        namespaces.push("Point");
        namespaces.declare("Inner", ScopeKind::Typedef, Visibility::Private);
        namespaces.pop();
        namespaces.pop();

        let mut types = TypeRegistry::new();
        let (id, diagnostics) = resolve(
            &namespaces,
            &mut types,
            &TypeSpecifier::named("geom::Point::Inner", span()),
        );
        assert!(id.is_none());
        assert_eq!(diagnostics.iter().next().unwrap().title, "Type not visible");
    }
}
