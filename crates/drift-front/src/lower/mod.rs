//! Function lowering: syntax tree in, MIR functions out.
//!
//! [`FunctionResolver`] walks the file statements of a translation unit
//! and hands each function definition to a [`FunctionDefinitionResolver`],
//! which owns the per-function state: the scope tracker, the function
//! under construction, and the current emission block. Everything else at
//! file level (globals, class bodies, enums, typedefs, `using`) was
//! already handled by the declaration collaborator before this stage runs.
//!
//! Lowering is fail-soft at function granularity: a failed function is
//! dropped and the next one still lowers, so one bad body does not hide
//! errors elsewhere in the unit.

mod expr;
mod stmt;

use tracing::{debug, trace};

use drift_context::{Diagnostic, Diagnostics, SourceSpan};
use drift_mir::types::TypeKind;
use drift_mir::{
    BlockId, Function, FunctionArgument, Mir, OpKind, Operation, TmpId, TypeId,
};

use crate::ast::{FileStatement, FunctionDefinition, TranslationUnit, TypeSpecifier};
use crate::namespace::NamespaceContext;
use crate::scope::ScopeTracker;
use crate::type_resolver::TypeResolver;

/// The implicit first argument of every method. The angle brackets keep it
/// out of the user namespace; the language has no `this` keyword.
pub const THIS_NAME: &str = "<this>";

/// Top-level dispatch over a translation unit's file statements.
pub struct FunctionResolver<'a> {
    diagnostics: &'a mut Diagnostics,
    mir: &'a mut Mir,
    namespaces: &'a NamespaceContext,
}

impl<'a> FunctionResolver<'a> {
    pub fn new(
        diagnostics: &'a mut Diagnostics,
        mir: &'a mut Mir,
        namespaces: &'a NamespaceContext,
    ) -> Self {
        FunctionResolver {
            diagnostics,
            mir,
            namespaces,
        }
    }

    /// Lowers every function definition in the unit. Errors accumulate in
    /// the diagnostic sink; check it before handing the MIR downstream.
    pub fn resolve(&mut self, unit: &TranslationUnit) {
        self.resolve_statements(&unit.statements);
    }

    fn resolve_statements(&mut self, statements: &[FileStatement]) {
        for statement in statements {
            match statement {
                FileStatement::FunctionDefinition(definition) => {
                    let lowered = FunctionDefinitionResolver::lower(
                        self.diagnostics,
                        self.mir,
                        self.namespaces,
                        definition,
                    );
                    if let Some(function) = lowered {
                        if self.mir.add_function(function).is_err() {
                            self.diagnostics.add_simple(
                                definition.span,
                                "Duplicate function definition",
                                format!(
                                    "Function {} is defined more than once.",
                                    definition.name.fully_qualified
                                ),
                            );
                        }
                    }
                }
                FileStatement::Namespace { statements, .. } => {
                    self.resolve_statements(statements);
                }
                // Declarations, class bodies, enums, typedefs, globals, and
                // using directives carry no function bodies; the type and
                // symbol collaborators consumed them before this stage.
                FileStatement::FunctionDeclaration { .. }
                | FileStatement::GlobalDefinition { .. }
                | FileStatement::ClassDeclaration { .. }
                | FileStatement::ClassDefinition { .. }
                | FileStatement::EnumDefinition { .. }
                | FileStatement::TypeDefinition { .. }
                | FileStatement::Using { .. } => {}
            }
        }
    }
}

/// Lowers one function definition into one MIR [`Function`].
pub(crate) struct FunctionDefinitionResolver<'a, 'def> {
    diagnostics: &'a mut Diagnostics,
    mir: &'a mut Mir,
    namespaces: &'a NamespaceContext,
    definition: &'def FunctionDefinition,
    tracker: ScopeTracker,
    function: Function,
    current_block: BlockId,
    /// Set when this definition is a method of a class.
    class_type: Option<TypeId>,
    class_pointer_type: Option<TypeId>,
}

impl<'a, 'def> FunctionDefinitionResolver<'a, 'def> {
    /// Runs the whole per-function pipeline: classify, build the
    /// signature, check it against the declaration, lower the body, fix up
    /// gotos, and complete missing returns. Returns `None` (with
    /// diagnostics recorded) when the function is too broken to keep.
    pub fn lower(
        diagnostics: &'a mut Diagnostics,
        mir: &'a mut Mir,
        namespaces: &'a NamespaceContext,
        definition: &'def FunctionDefinition,
    ) -> Option<Function> {
        let fully_qualified = definition.name.fully_qualified.clone();
        debug!(function = %fully_qualified, "lowering function definition");

        // A definition whose parent scope names a class type is a method.
        let mut class_type = None;
        let mut method_pointer = None;
        let parent = definition.name.parent();
        if !parent.is_empty() {
            if let Some(maybe_class) = mir.types().lookup(parent) {
                if mir.types().get(maybe_class).is_composite() {
                    match mir.types().get(maybe_class).method(definition.name.leaf()) {
                        Some(method) => {
                            class_type = Some(maybe_class);
                            method_pointer = Some(method.function_pointer);
                        }
                        None => {
                            diagnostics.add_simple(
                                definition.span,
                                "Member function not declared.",
                                format!(
                                    "Member method {} was not declared in class {}",
                                    definition.name.leaf(),
                                    parent
                                ),
                            );
                            return None;
                        }
                    }
                }
            }
        }

        let type_resolver = TypeResolver::new(namespaces);
        let return_type = match type_resolver.extract_from_type_specifier(
            mir.types_mut(),
            diagnostics,
            &definition.return_type,
        ) {
            Some(ty) => ty,
            None => {
                diagnostics.add_simple(
                    definition.span,
                    "Return-value type not defined",
                    "Return type was not declared",
                );
                return None;
            }
        };

        let mut tracker = ScopeTracker::new(definition.is_unsafe);
        let mut arguments = Vec::new();
        let mut class_pointer_type = None;

        // Methods get the implicit leading `<this>` pointer. It is not a
        // tracked local, so user code cannot take its address or leak it
        // from a constructor.
        if let Some(class) = class_type {
            let pointer = mir.types_mut().pointer_to(class, definition.span);
            class_pointer_type = Some(pointer);
            arguments.push(FunctionArgument {
                name: THIS_NAME.to_string(),
                ty: pointer,
                name_span: definition.span,
                type_span: definition.span,
            });
        }

        let mut member_conflict = false;
        for parameter in &definition.parameters {
            let name = parameter.name.name.clone();

            // Method arguments must not shadow member variables.
            if let Some(class) = class_type {
                let member_span = mir
                    .types()
                    .get(class)
                    .member(&name)
                    .map(|member| member.declared_at);
                if let Some(member_span) = member_span {
                    diagnostics.add(
                        Diagnostic::new("Variable Name Conflict")
                            .with_label(
                                parameter.name.span,
                                format!(
                                    "Method defined argument {} which would conflict with class member name.",
                                    name
                                ),
                            )
                            .with_label(member_span, "Member variable declared here."),
                    );
                    member_conflict = true;
                }
            }

            let ty = type_resolver.extract_from_type_specifier(
                mir.types_mut(),
                diagnostics,
                &parameter.ty,
            )?;
            arguments.push(FunctionArgument {
                name: name.clone(),
                ty,
                name_span: parameter.name.span,
                type_span: parameter.ty.span,
            });
            if !tracker.declare_variable(&name, ty, parameter.name.span, diagnostics) {
                return None;
            }
        }
        if member_conflict {
            return None;
        }

        // The definition must agree with its declaration: the method entry
        // for methods, the forward-declaration symbol (if any) for free
        // functions.
        if let Some(method_pointer) = method_pointer {
            if !check_declared_signature(
                diagnostics,
                mir,
                definition,
                &arguments,
                return_type,
                method_pointer,
                true,
            ) {
                return None;
            }
        } else if let Some(symbol) = mir.symbols().get(&fully_qualified) {
            let symbol_type = symbol.ty;
            if !mir.types().get(symbol_type).is_function_pointer() {
                diagnostics.add_simple(
                    definition.span,
                    "Symbol is not a function",
                    format!(
                        "Symbol {} is not declared as a function.",
                        fully_qualified
                    ),
                );
                return None;
            }
            if !check_declared_signature(
                diagnostics,
                mir,
                definition,
                &arguments,
                return_type,
                symbol_type,
                false,
            ) {
                return None;
            }
        }

        let mut function = Function::new(
            fully_qualified.clone(),
            return_type,
            arguments,
            definition.is_unsafe,
            definition.span,
        );
        let entry = function.add_block();

        let mut resolver = FunctionDefinitionResolver {
            diagnostics,
            mir,
            namespaces,
            definition,
            tracker,
            function,
            current_block: entry,
            class_type,
            class_pointer_type,
        };
        resolver.lower_statement_list(false, &definition.body)?;
        resolver.finish()
    }

    /// Post-body work: goto fixups, reachability, and completion of
    /// reachable blocks that lack a terminator.
    fn finish(mut self) -> Option<Function> {
        let fixups = self.tracker.check(self.diagnostics)?;
        if !fixups.is_empty() {
            trace!(
                function = %self.function.name(),
                count = fixups.len(),
                "inserting goto unwind operations"
            );
        }
        for fixup in &fixups {
            let mut index = fixup.point.index;
            for name in &fixup.unwind {
                // Destructors will run here, just before the variable
                // leaves scope.
                self.function.block_mut(fixup.point.block).insert(
                    index,
                    Operation::new(OpKind::LocalUndeclare { name: name.clone() }, fixup.span, None),
                );
                index += 1;
            }
        }

        self.function.compute_reachability();

        let return_type = self.function.return_type();
        let return_is_void = self.mir.types().get(return_type).is_void();
        let incomplete: Vec<BlockId> = self
            .function
            .blocks()
            .filter(|(id, block)| !block.contains_terminator() && self.function.is_reachable(*id))
            .map(|(id, _)| id)
            .collect();

        for block in incomplete {
            if return_is_void {
                // Implicit return: unwind the root scope, then ReturnVoid.
                let unwind = self.tracker.unwind_for_scope();
                let span = self.definition.body.span;
                for name in unwind {
                    self.function
                        .block_mut(block)
                        .add(Operation::new(OpKind::LocalUndeclare { name }, span, None));
                }
                self.function.block_mut(block).add(Operation::new(
                    OpKind::ReturnVoid,
                    self.definition.return_type.span,
                    None,
                ));
            } else {
                self.diagnostics.add(
                    Diagnostic::new("Control reaches end of non-void function")
                        .with_label(
                            self.definition.body.span,
                            format!(
                                "Function {} returns {} but is missing a return statement at the end of the function.",
                                self.function.name(),
                                self.mir.types().name(return_type)
                            ),
                        )
                        .with_label(
                            self.definition.return_type.span,
                            "Return type defined here",
                        ),
                );
            }
        }

        Some(self.function)
    }

    // -- shared helpers used by expression and statement lowering ----------

    pub(crate) fn push_op(&mut self, op: Operation) {
        self.function.block_mut(self.current_block).add(op);
    }

    pub(crate) fn tmp_type(&self, tmp: TmpId) -> TypeId {
        self.function.tmpvar_type(tmp)
    }

    pub(crate) fn type_name(&self, ty: TypeId) -> String {
        self.mir.types().name(ty).to_string()
    }

    pub(crate) fn resolve_type(&mut self, specifier: &TypeSpecifier) -> Option<TypeId> {
        TypeResolver::new(self.namespaces).extract_from_type_specifier(
            self.mir.types_mut(),
            self.diagnostics,
            specifier,
        )
    }

    /// Validates argument count, per-argument types, and unsafety of a
    /// call against the callee's function-pointer type. Records every
    /// mismatch it finds before reporting failure.
    pub(crate) fn check_call_signature(
        &mut self,
        is_method: bool,
        passed: &[TmpId],
        passed_spans: &[SourceSpan],
        function_pointer: TypeId,
        span: SourceSpan,
    ) -> bool {
        let (declared, callee_unsafe, declared_at) = {
            let ty = self.mir.types().get(function_pointer);
            match &ty.kind {
                TypeKind::FunctionPointer {
                    arguments,
                    is_unsafe,
                    ..
                } => (arguments.clone(), *is_unsafe, ty.declared_at),
                _ => {
                    self.diagnostics.add_simple(
                        span,
                        "Compiler bug! Please report this message",
                        "Call signature check reached a non-function type.",
                    );
                    return false;
                }
            }
        };

        let mut ok = true;
        let hidden = if is_method { 1 } else { 0 };

        if passed.len() != declared.len() {
            let (title, passing, declared_as) = if is_method {
                (
                    "Wrong number of arguments passed to method call.",
                    format!("Passing {} to method", passed.len() - hidden),
                    format!(
                        "Method was declared to have {} arguments.",
                        declared.len() - hidden
                    ),
                )
            } else {
                (
                    "Wrong number of arguments passed to function call.",
                    format!("Passing {} to function.", passed.len()),
                    format!(
                        "Function was declared to have {} arguments.",
                        declared.len()
                    ),
                )
            };
            self.diagnostics.add(
                Diagnostic::new(title)
                    .with_label(span, passing)
                    .with_label(declared_at, declared_as),
            );
            ok = false;
        }

        if !self.tracker.is_unsafe() && callee_unsafe {
            let (title, message) = if is_method {
                (
                    "Calling an unsafe method from a safe context.",
                    "Method is declared as unsafe, but this is not inside a scope marked unsafe.",
                )
            } else {
                (
                    "Calling an unsafe function from a safe context.",
                    "Function is declared as unsafe, but this is not inside a scope marked unsafe.",
                )
            };
            self.diagnostics.add_simple(span, title, message);
            ok = false;
        }

        for (index, (argument, declared_argument)) in
            passed.iter().zip(declared.iter()).enumerate()
        {
            let passed_type = self.tmp_type(*argument);
            if self.type_name(passed_type) != self.type_name(declared_argument.ty) {
                self.diagnostics.add(
                    Diagnostic::new("Incorrect argument type passed to call")
                        .with_label(
                            passed_spans[index],
                            format!(
                                "Passing type {} as argument {}",
                                self.type_name(passed_type),
                                index + 1
                            ),
                        )
                        .with_label(
                            declared_argument.declared_at,
                            format!(
                                "Argument type was declared as {}",
                                self.type_name(declared_argument.ty)
                            ),
                        ),
                );
                ok = false;
            }
        }

        ok
    }
}

/// Definition-versus-declaration agreement: arity, return type, each
/// argument type (all by canonical name), and the unsafe flag.
fn check_declared_signature(
    diagnostics: &mut Diagnostics,
    mir: &Mir,
    definition: &FunctionDefinition,
    arguments: &[FunctionArgument],
    return_type: TypeId,
    declared_pointer: TypeId,
    is_method: bool,
) -> bool {
    let (declared_arguments, declared_return, declared_unsafe, declared_at) = {
        let ty = mir.types().get(declared_pointer);
        match &ty.kind {
            TypeKind::FunctionPointer {
                arguments,
                return_type,
                is_unsafe,
            } => (arguments.clone(), *return_type, *is_unsafe, ty.declared_at),
            _ => {
                diagnostics.add_simple(
                    definition.span,
                    "Compiler bug! Please report this message",
                    "Declared signature is not a function-pointer type.",
                );
                return false;
            }
        }
    };
    let hidden = if is_method { 1 } else { 0 };

    if arguments.len() != declared_arguments.len() {
        let title = if is_method {
            "Method argument mismatch"
        } else {
            "Function argument mismatch"
        };
        let noun = if is_method { "Method" } else { "Function" };
        diagnostics.add(
            Diagnostic::new(title)
                .with_label(
                    definition.span,
                    format!("{} has {} arguments defined", noun, arguments.len() - hidden),
                )
                .with_label(
                    declared_at,
                    format!(
                        "First declared here with {}",
                        declared_arguments.len() - hidden
                    ),
                ),
        );
        return false;
    }

    let mut ok = true;

    if declared_unsafe != definition.is_unsafe {
        let title = if is_method {
            "Method safety modifier does not match declaration."
        } else {
            "Function safety modifier does not match declaration."
        };
        let noun = if is_method { "Method" } else { "Function" };
        diagnostics.add(
            Diagnostic::new(title)
                .with_label(
                    definition.return_type.span,
                    format!(
                        "{} defined as {}.",
                        noun,
                        if definition.is_unsafe { "unsafe" } else { "not unsafe" }
                    ),
                )
                .with_label(
                    declared_at,
                    format!(
                        "Does not match previous declaration as {}",
                        if declared_unsafe { "unsafe" } else { "not unsafe" }
                    ),
                ),
        );
        ok = false;
    }

    if mir.types().name(declared_return) != mir.types().name(return_type) {
        diagnostics.add(
            Diagnostic::new("Return-value does not match declaration")
                .with_label(
                    definition.return_type.span,
                    format!(
                        "Return-value defined as {}.",
                        mir.types().name(return_type)
                    ),
                )
                .with_label(
                    declared_at,
                    format!(
                        "Does not match declaration {}",
                        mir.types().name(declared_return)
                    ),
                ),
        );
        ok = false;
    }

    for (argument, declared_argument) in arguments.iter().zip(declared_arguments.iter()) {
        if mir.types().name(argument.ty) != mir.types().name(declared_argument.ty) {
            let title = if is_method {
                "Method argument mismatch"
            } else {
                "Function argument mismatch"
            };
            diagnostics.add(
                Diagnostic::new(title)
                    .with_label(
                        argument.type_span,
                        format!(
                            "Argument defined as {} does not match declaration.",
                            mir.types().name(argument.ty)
                        ),
                    )
                    .with_label(
                        declared_argument.declared_at,
                        format!(
                            "First declared here as {}",
                            mir.types().name(declared_argument.ty)
                        ),
                    ),
            );
            ok = false;
        }
    }

    ok
}
