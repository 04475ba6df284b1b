//! Statement lowering and block stitching.
//!
//! Statements drive block allocation: control-flow constructs carve the
//! function into basic blocks and leave `current_block` pointing wherever
//! emission should continue. Scope pushes and pops go through the tracker
//! so variable lifetimes, loop targets, and the `unsafe` flag stay in sync
//! with the emitted `declare`/`undeclare` operations.

use drift_context::{Diagnostic, SourceSpan};
use drift_mir::{OpKind, Operation, TmpId, TypeId};

use crate::ast::{
    ElseArm, Expr, For, Identifier, IfElse, StatementList, StmtKind, Switch,
    VariableDeclaration, VariableInit,
};
use crate::scope::InsertPoint;
use crate::lower::FunctionDefinitionResolver;

impl FunctionDefinitionResolver<'_, '_> {
    /// Lowers a statement list. With `automatic_unwind` the current
    /// scope's variables are undeclared at the end unless a return already
    /// unwound them; the function's outermost list passes `false` because
    /// the missing-return completion pass owns that unwind.
    pub(crate) fn lower_statement_list(
        &mut self,
        automatic_unwind: bool,
        list: &StatementList,
    ) -> Option<()> {
        let mut did_return = false;
        for statement in &list.statements {
            match &statement.kind {
                StmtKind::VariableDeclaration(declaration) => {
                    self.lower_variable_declaration(declaration, statement.span)?;
                }
                StmtKind::Block { is_unsafe, body } => {
                    self.tracker.push(*is_unsafe);
                    self.lower_statement_list(true, body)?;
                    self.tracker.pop();
                }
                StmtKind::Expression(expr) => {
                    self.lower_expr(expr)?;
                }
                StmtKind::IfElse(ifelse) => self.lower_ifelse(ifelse)?,
                StmtKind::While { condition, body } => {
                    self.lower_while(condition, body, statement.span)?;
                }
                StmtKind::For(for_loop) => self.lower_for(for_loop, statement.span)?,
                StmtKind::Switch(switch) => self.lower_switch(switch, statement.span)?,
                StmtKind::Label { name, name_span } => {
                    self.lower_label(name, *name_span, statement.span)?;
                }
                StmtKind::Goto { label, label_span } => {
                    self.lower_goto(label, *label_span, statement.span)?;
                }
                StmtKind::Break => self.lower_break(statement.span)?,
                StmtKind::Continue => self.lower_continue(statement.span)?,
                StmtKind::Return(value) => {
                    self.lower_return(value.as_ref(), statement.span)?;
                    did_return = true;
                }
            }
        }

        // A return already unwound everything up to the root; otherwise
        // the scope's own variables go out of scope here.
        if !did_return && automatic_unwind {
            let unwind = self.tracker.unwind_for_scope();
            self.leave_scope(list.span, unwind);
        }
        Some(())
    }

    /// Emits `undeclare` for each name, in the order given (callers pass
    /// reverse declaration order).
    fn leave_scope(&mut self, span: SourceSpan, unwind: Vec<String>) {
        for name in unwind {
            self.push_op(Operation::new(OpKind::LocalUndeclare { name }, span, None));
        }
    }

    /// Declares a local in the tracker and emits the `declare` marker.
    /// A duplicate records its diagnostic and lowering continues against
    /// the previous declaration.
    fn local_declare(&mut self, ty: TypeId, name: &Identifier) {
        self.tracker
            .declare_variable(&name.name, ty, name.span, self.diagnostics);
        self.push_op(Operation::new(
            OpKind::LocalDeclare {
                name: name.name.clone(),
                ty,
            },
            name.span,
            None,
        ));
    }

    fn lower_variable_declaration(
        &mut self,
        declaration: &VariableDeclaration,
        span: SourceSpan,
    ) -> Option<()> {
        let ty = self.resolve_type(&declaration.ty)?;
        self.local_declare(ty, &declaration.name);

        match &declaration.init {
            VariableInit::None => Some(()),
            VariableInit::Expression(init) => {
                let variable_tmp = self.function.tmpvar_define(ty);
                self.push_op(Operation::new(
                    OpKind::LocalVariable {
                        name: declaration.name.name.clone(),
                        ty,
                    },
                    span,
                    Some(variable_tmp),
                ));
                let value_tmp = self.lower_expr(init)?;
                self.lower_assignment(init.span, variable_tmp, value_tmp)?;
                Some(())
            }
            VariableInit::Constructor {
                arguments,
                span: arguments_span,
            } => self.lower_constructor(declaration, ty, arguments, *arguments_span, span),
        }
    }

    /// `C x(args);` -- takes the variable's address as the `<this>`
    /// argument and calls the class constructor through its symbol.
    fn lower_constructor(
        &mut self,
        declaration: &VariableDeclaration,
        ty: TypeId,
        arguments: &[Expr],
        arguments_span: SourceSpan,
        span: SourceSpan,
    ) -> Option<()> {
        if !self.mir.types().get(ty).is_composite() {
            self.diagnostics.add_simple(
                arguments_span,
                "Constructors are not supported for non-class types",
                format!(
                    "Constructors must be called on class types and not primitive types like {}",
                    self.type_name(ty)
                ),
            );
            return None;
        }

        let variable_tmp = self.function.tmpvar_define(ty);
        self.push_op(Operation::new(
            OpKind::LocalVariable {
                name: declaration.name.name.clone(),
                ty,
            },
            span,
            Some(variable_tmp),
        ));

        let pointer_type = self.mir.types_mut().pointer_to(ty, span);
        let pointer_tmp = self.function.tmpvar_define(pointer_type);
        self.push_op(Operation::unary(OpKind::AddressOf, span, pointer_tmp, variable_tmp));

        let mut passed: Vec<TmpId> = vec![pointer_tmp];
        let mut passed_spans: Vec<SourceSpan> = vec![span];
        for argument in arguments {
            passed.push(self.lower_expr(argument)?);
            passed_spans.push(argument.span);
        }

        // For class C at path P::C, the constructor symbol is P::C::C.
        let class_name = self.type_name(ty);
        let leaf = class_name.rsplit("::").next().unwrap_or(&class_name);
        let constructor_name = format!("{}::{}", class_name, leaf);

        let constructor_type = match self.mir.symbols().get(&constructor_name) {
            Some(symbol) => symbol.ty,
            None => {
                self.diagnostics.add(
                    Diagnostic::new("No constructor found.").with_label(
                        span,
                        format!(
                            "Constructor {} was not defined for class {}",
                            constructor_name, class_name
                        ),
                    ),
                );
                return None;
            }
        };
        if !self.mir.types().get(constructor_type).is_function_pointer() {
            self.diagnostics.add(
                Diagnostic::new("Symbol is not a constructor").with_label(
                    span,
                    format!(
                        "Symbol {} is not declared as a constructor.",
                        constructor_name
                    ),
                ),
            );
            return None;
        }
        if !self.check_call_signature(true, &passed, &passed_spans, constructor_type, arguments_span)
        {
            return None;
        }

        let constructor_tmp = self.function.tmpvar_define(constructor_type);
        self.push_op(Operation::new(
            OpKind::Symbol {
                name: constructor_name,
            },
            arguments_span,
            Some(constructor_tmp),
        ));

        let return_type = self.function_pointer_return(constructor_type)?;
        let result = self.function.tmpvar_define(return_type);
        let mut op = Operation::new(OpKind::Constructor, arguments_span, Some(result));
        op.operands.push(constructor_tmp);
        op.operands.extend(passed);
        self.push_op(op);
        Some(())
    }

    pub(crate) fn function_pointer_return(&self, function_pointer: TypeId) -> Option<TypeId> {
        match self.mir.types().get(function_pointer).kind {
            drift_mir::types::TypeKind::FunctionPointer { return_type, .. } => Some(return_type),
            _ => None,
        }
    }

    // -- control flow ------------------------------------------------------

    fn lower_ifelse(&mut self, ifelse: &IfElse) -> Option<()> {
        let condition_tmp = self.lower_expr(&ifelse.condition)?;
        if !self.mir.types().get(self.tmp_type(condition_tmp)).is_bool() {
            self.diagnostics.add_simple(
                ifelse.condition.span,
                "Invalid condition in if statement.",
                format!(
                    "Type of condition expression should be 'bool' and was {}",
                    self.type_name(self.tmp_type(condition_tmp))
                ),
            );
            return None;
        }

        let then_block = self.function.add_block();
        let else_block = if matches!(ifelse.else_arm, ElseArm::None) {
            None
        } else {
            Some(self.function.add_block())
        };
        let done_block = self.function.add_block();

        let mut jump = Operation::new(
            OpKind::JumpConditional {
                if_block: then_block,
                else_block: else_block.unwrap_or(done_block),
            },
            ifelse.span,
            None,
        );
        jump.operands.push(condition_tmp);
        self.push_op(jump);

        // Then branch. Branch bodies cannot themselves be unsafe; wrap the
        // statement in an unsafe block for that.
        self.current_block = then_block;
        self.tracker.push(false);
        self.lower_statement_list(true, &ifelse.then_body)?;
        self.tracker.pop();
        if !self.function.block(self.current_block).contains_terminator() {
            self.push_op(Operation::new(
                OpKind::Jump { target: done_block },
                ifelse.span,
                None,
            ));
        }

        match &ifelse.else_arm {
            ElseArm::None => {}
            ElseArm::Else(body) => {
                self.current_block = else_block?;
                self.tracker.push(false);
                self.lower_statement_list(true, body)?;
                self.tracker.pop();
                if !self.function.block(self.current_block).contains_terminator() {
                    self.push_op(Operation::new(
                        OpKind::Jump { target: done_block },
                        ifelse.span,
                        None,
                    ));
                }
            }
            ElseArm::ElseIf(next) => {
                // The chain recurses: the else target is another
                // if-lowering, whose own done block then drains here.
                self.current_block = else_block?;
                self.lower_ifelse(next)?;
                if !self.function.block(self.current_block).contains_terminator() {
                    self.push_op(Operation::new(
                        OpKind::Jump { target: done_block },
                        ifelse.span,
                        None,
                    ));
                }
            }
        }

        self.current_block = done_block;
        Some(())
    }

    fn lower_while(
        &mut self,
        condition: &Expr,
        body: &StatementList,
        span: SourceSpan,
    ) -> Option<()> {
        let eval_block = self.function.add_block();
        let body_block = self.function.add_block();
        let done_block = self.function.add_block();

        self.push_op(Operation::new(
            OpKind::Jump { target: eval_block },
            span,
            None,
        ));

        self.current_block = eval_block;
        let condition_tmp = self.lower_expr(condition)?;
        let mut jump = Operation::new(
            OpKind::JumpConditional {
                if_block: body_block,
                else_block: done_block,
            },
            span,
            None,
        );
        jump.operands.push(condition_tmp);
        self.push_op(jump);

        self.current_block = body_block;
        self.tracker.push_loop(done_block, eval_block);
        self.lower_statement_list(true, body)?;
        self.tracker.pop();
        if !self.function.block(self.current_block).contains_terminator() {
            self.push_op(Operation::new(
                OpKind::Jump { target: eval_block },
                span,
                None,
            ));
        }

        self.current_block = done_block;
        Some(())
    }

    fn lower_for(&mut self, for_loop: &For, span: SourceSpan) -> Option<()> {
        // The loop variable's scope covers the whole statement, including
        // the done block's undeclares.
        self.tracker.push(false);

        let test_block = self.function.add_block();
        let body_block = self.function.add_block();
        let done_block = self.function.add_block();

        if let Some((ty_specifier, name)) = &for_loop.declaration {
            let ty = self.resolve_type(ty_specifier)?;
            self.local_declare(ty, name);
        }
        self.lower_expr(&for_loop.init)?;
        self.push_op(Operation::new(
            OpKind::Jump { target: test_block },
            span,
            None,
        ));

        self.current_block = test_block;
        let condition_tmp = self.lower_expr(&for_loop.condition)?;
        let mut jump = Operation::new(
            OpKind::JumpConditional {
                if_block: body_block,
                else_block: done_block,
            },
            span,
            None,
        );
        jump.operands.push(condition_tmp);
        self.push_op(jump);

        self.current_block = body_block;
        self.tracker.push_loop(done_block, test_block);
        self.lower_statement_list(true, &for_loop.body)?;
        self.tracker.pop();

        // The increment runs at the end of the body path, then control
        // returns to the test.
        self.lower_expr(&for_loop.increment)?;
        if !self.function.block(self.current_block).contains_terminator() {
            self.push_op(Operation::new(
                OpKind::Jump { target: test_block },
                span,
                None,
            ));
        }

        self.current_block = done_block;
        let unwind = self.tracker.unwind_for_scope();
        self.leave_scope(span, unwind);
        self.tracker.pop();
        Some(())
    }

    fn lower_switch(&mut self, switch: &Switch, span: SourceSpan) -> Option<()> {
        let value_tmp = self.lower_expr(&switch.value)?;
        let value_type = self.tmp_type(value_tmp);
        let done_block = self.function.add_block();

        let mut ok = true;
        let mut has_default = false;
        let case_count = switch.cases.len();

        for (index, case) in switch.cases.iter().enumerate() {
            let next_block = match &case.value {
                None => {
                    // The default case matches everything left over, so
                    // nothing may follow it.
                    if index != case_count - 1 {
                        self.diagnostics.add_simple(
                            case.span,
                            "Default clause must be the last clause in a switch statement.",
                            "Default clause must be the last clause in a switch statement.",
                        );
                        return None;
                    }
                    has_default = true;
                    done_block
                }
                Some(case_value) => {
                    let test_tmp = self.lower_expr(case_value)?;
                    let test_type = self.tmp_type(test_tmp);
                    if self.type_name(test_type) != self.type_name(value_type) {
                        self.diagnostics.add(
                            Diagnostic::new("Case must match switch type")
                                .with_label(
                                    case.span,
                                    format!(
                                        "Case type {} must match switch type {}",
                                        self.type_name(test_type),
                                        self.type_name(value_type)
                                    ),
                                )
                                .with_label(switch.value.span, "Switch declared here."),
                        );
                        ok = false;
                    }

                    let condition_tmp = self.function.tmpvar_define(TypeId::BOOL);
                    self.push_op(Operation::binary(
                        OpKind::CompareEqual,
                        case.span,
                        condition_tmp,
                        test_tmp,
                        value_tmp,
                    ));

                    let case_block = self.function.add_block();
                    let else_block = self.function.add_block();
                    let mut jump = Operation::new(
                        OpKind::JumpConditional {
                            if_block: case_block,
                            else_block,
                        },
                        case.span,
                        None,
                    );
                    jump.operands.push(condition_tmp);
                    self.push_op(jump);

                    self.current_block = case_block;
                    else_block
                }
            };

            // No implicit fall-through between cases: each body drains to
            // the done block unless it already terminated.
            self.tracker.push(false);
            self.lower_statement_list(true, &case.body)?;
            self.tracker.pop();
            if !self.function.block(self.current_block).contains_terminator() {
                self.push_op(Operation::new(
                    OpKind::Jump { target: done_block },
                    case.span,
                    None,
                ));
            }
            self.current_block = next_block;
        }

        if !has_default {
            // No case matched and there is no default: fall straight out.
            self.push_op(Operation::new(
                OpKind::Jump { target: done_block },
                span,
                None,
            ));
            self.current_block = done_block;
        }

        ok.then_some(())
    }

    fn lower_break(&mut self, span: SourceSpan) -> Option<()> {
        let break_block = match self.tracker.loop_break_block() {
            Some(block) => block,
            None => {
                self.diagnostics.add_simple(
                    span,
                    "'break' statement not in loop or switch statement",
                    "'break' keyword must appear inside a loop (for/while)",
                );
                return Some(());
            }
        };

        let unwind = self.tracker.unwind_for_break();
        self.leave_scope(span, unwind);
        self.push_op(Operation::new(
            OpKind::Jump {
                target: break_block,
            },
            span,
            None,
        ));
        // Anything emitted after the break lands in a fresh, unreachable
        // block so emission stays well-defined.
        self.current_block = self.function.add_block();
        Some(())
    }

    fn lower_continue(&mut self, span: SourceSpan) -> Option<()> {
        let continue_block = match self.tracker.loop_continue_block() {
            Some(block) => block,
            None => {
                self.diagnostics.add_simple(
                    span,
                    "'continue' statement not in loop or switch statement",
                    "'continue' keyword must appear inside a loop (for/while)",
                );
                return Some(());
            }
        };

        self.push_op(Operation::new(
            OpKind::Jump {
                target: continue_block,
            },
            span,
            None,
        ));
        self.current_block = self.function.add_block();
        Some(())
    }

    fn lower_label(&mut self, name: &str, name_span: SourceSpan, span: SourceSpan) -> Option<()> {
        // A label starts a new basic block whether or not control falls
        // into it.
        let label_block = match self.tracker.label(name) {
            None => {
                let block = self.function.add_block();
                self.tracker.define_label(name, block, name_span);
                block
            }
            Some(label) if !label.is_resolved() => {
                // A goto got here first; adopt its block.
                let block = label.block();
                self.tracker.resolve_label(name, name_span);
                block
            }
            Some(label) => {
                let mut diagnostic = Diagnostic::new("Labels in functions must be unique")
                    .with_label(name_span, format!("Duplicate label {}", name));
                if let Some(first) = label.span() {
                    diagnostic = diagnostic.with_label(first, "First declared here.");
                }
                self.diagnostics.add(diagnostic);
                return Some(());
            }
        };

        if !self.function.block(self.current_block).contains_terminator() {
            self.push_op(Operation::new(
                OpKind::Jump {
                    target: label_block,
                },
                span,
                None,
            ));
        }
        self.current_block = label_block;
        Some(())
    }

    fn lower_goto(&mut self, label: &str, label_span: SourceSpan, span: SourceSpan) -> Option<()> {
        let label_block = match self.tracker.label(label) {
            Some(existing) => existing.block(),
            None => {
                let block = self.function.add_block();
                self.tracker.declare_label(label, block);
                block
            }
        };

        // A goto after a terminator opens a fresh block first so the
        // recorded insert point stays ahead of a real jump.
        if self.function.block(self.current_block).contains_terminator() {
            self.current_block = self.function.add_block();
        }

        // The unwind list is only known after the whole body lowers; the
        // fixup pass inserts undeclares at this exact point.
        let point = InsertPoint {
            block: self.current_block,
            index: self.function.block(self.current_block).len(),
        };
        self.tracker.add_goto(label, point, label_span);

        self.push_op(Operation::new(
            OpKind::Jump {
                target: label_block,
            },
            span,
            None,
        ));
        self.current_block = self.function.add_block();
        Some(())
    }

    fn lower_return(&mut self, value: Option<&Expr>, span: SourceSpan) -> Option<()> {
        let unwind = self.tracker.unwind_for_root();
        match value {
            None => {
                self.leave_scope(span, unwind);
                self.push_op(Operation::new(OpKind::ReturnVoid, span, None));
            }
            Some(expr) => {
                let value_tmp = self.lower_expr(expr)?;
                self.leave_scope(span, unwind);
                let mut op = Operation::new(OpKind::Return, span, None);
                op.operands.push(value_tmp);
                self.push_op(op);
            }
        }
        Some(())
    }
}
