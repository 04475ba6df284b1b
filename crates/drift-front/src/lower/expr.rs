//! Expression lowering.
//!
//! Every lowering routine returns the temporary holding the expression's
//! value, or `None` after recording a diagnostic. Operations are appended
//! to the resolver's current block; expressions never allocate blocks
//! themselves (logical `&&`/`||` lower to plain binary operations, with
//! short-circuit evaluation left to the back-end).

use drift_context::SourceSpan;
use drift_mir::types::{IntWidth, TypeKind};
use drift_mir::{IntValue, OpKind, Operation, TmpId, TypeId};

use crate::ast::{BinaryOp, Expr, ExprKind, Identifier, IdentifierKind, UnaryOp};
use crate::literals;
use crate::lower::{FunctionDefinitionResolver, THIS_NAME};

/// What a call's callee turned out to be.
enum CalleeShape {
    Function { return_type: TypeId },
    Method { class: TypeId, function_pointer: TypeId },
    Other,
}

impl FunctionDefinitionResolver<'_, '_> {
    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> Option<TmpId> {
        match &expr.kind {
            ExprKind::Identifier(identifier) => self.lower_identifier(identifier, expr.span),
            ExprKind::Nested(inner) => self.lower_expr(inner),
            ExprKind::LiteralChar(text) => self.lower_literal_char(text, expr.span),
            ExprKind::LiteralString(segments) => self.lower_literal_string(segments, expr.span),
            ExprKind::LiteralInt(text) => self.lower_literal_int(text, expr.span),
            ExprKind::LiteralFloat { text, suffix } => {
                let value = literals::parse_float(text, *suffix, expr.span, self.diagnostics)?;
                let tmp = self.function.tmpvar_define(value.type_id());
                self.push_op(Operation::new(OpKind::LiteralFloat(value), expr.span, Some(tmp)));
                Some(tmp)
            }
            ExprKind::LiteralBool(value) => {
                let tmp = self.function.tmpvar_define(TypeId::BOOL);
                self.push_op(Operation::new(OpKind::LiteralBool(*value), expr.span, Some(tmp)));
                Some(tmp)
            }
            ExprKind::LiteralNull => {
                let ty = self.mir.types_mut().pointer_to(TypeId::VOID, expr.span);
                let tmp = self.function.tmpvar_define(ty);
                self.push_op(Operation::new(OpKind::LiteralNull, expr.span, Some(tmp)));
                Some(tmp)
            }
            ExprKind::ArrayIndex { array, index } => self.lower_array_index(array, index, expr.span),
            ExprKind::FunctionCall { callee, arguments } => {
                self.lower_function_call(callee, arguments, expr.span)
            }
            ExprKind::Dot { object, member } => self.lower_dot(object, member, expr.span),
            ExprKind::Arrow { object, member } => self.lower_arrow(object, member, expr.span),
            ExprKind::PostIncrement(operand) => {
                let operand_tmp = self.lower_expr(operand)?;
                self.lower_incdec(expr.span, operand_tmp, true, true)
            }
            ExprKind::PostDecrement(operand) => {
                let operand_tmp = self.lower_expr(operand)?;
                self.lower_incdec(expr.span, operand_tmp, false, true)
            }
            ExprKind::Unary { op, operand } => self.lower_unary(*op, operand, expr.span),
            ExprKind::SizeofType(specifier) => {
                let ty = self.resolve_type(specifier)?;
                let tmp = self.function.tmpvar_define(TypeId::U64);
                self.push_op(Operation::new(OpKind::SizeofType { ty }, expr.span, Some(tmp)));
                Some(tmp)
            }
            ExprKind::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs, expr.span),
            ExprKind::Ternary { .. } => {
                self.diagnostics.add_simple(
                    expr.span,
                    "Not yet supported",
                    "Ternary (?:) expressions are not supported in this version.",
                );
                None
            }
            ExprKind::Cast { .. } => {
                self.diagnostics.add_simple(
                    expr.span,
                    "Not yet supported",
                    "cast() expressions are not supported in this version.",
                );
                None
            }
        }
    }

    // -- identifiers -------------------------------------------------------

    fn lower_identifier(&mut self, identifier: &Identifier, span: SourceSpan) -> Option<TmpId> {
        match identifier.kind {
            IdentifierKind::GlobalScope => {}
            IdentifierKind::LocalScope => {
                self.diagnostics.add_simple(
                    span,
                    "Local variable could not be resolved: should not be reachable.",
                    format!(
                        "Local variable {} was not found in this scope.",
                        identifier.name
                    ),
                );
                return None;
            }
            IdentifierKind::Uncategorized => {
                self.diagnostics.add_simple(
                    span,
                    "Compiler bug! Please report this message",
                    "Uncategorized identifier reached function lowering.",
                );
                return None;
            }
        }

        // Locals shadow everything else.
        if let Some(local) = self.tracker.variable(&identifier.name) {
            let ty = local.ty;
            let tmp = self.function.tmpvar_define(ty);
            self.push_op(Operation::new(
                OpKind::LocalVariable {
                    name: identifier.name.clone(),
                    ty,
                },
                identifier.span,
                Some(tmp),
            ));
            return Some(tmp);
        }

        // In a method body a bare member name resolves through the
        // implicit `<this>` pointer.
        if let (Some(class), Some(class_pointer)) = (self.class_type, self.class_pointer_type) {
            let member_type = self
                .mir
                .types()
                .get(class)
                .member(&identifier.name)
                .map(|member| member.ty);
            if let Some(member_type) = member_type {
                let this_tmp = self.function.tmpvar_define(class_pointer);
                self.push_op(Operation::new(
                    OpKind::LocalVariable {
                        name: THIS_NAME.to_string(),
                        ty: class_pointer,
                    },
                    identifier.span,
                    Some(this_tmp),
                ));

                let object_tmp = self.function.tmpvar_define(class);
                self.push_op(Operation::unary(OpKind::Dereference, span, object_tmp, this_tmp));

                let result = self.function.tmpvar_define(member_type);
                self.push_op(Operation::unary(
                    OpKind::Dot {
                        member: identifier.name.clone(),
                    },
                    span,
                    result,
                    object_tmp,
                ));
                return Some(result);
            }
        }

        // Finally the symbol table: functions and globals.
        let name = identifier.symbol_name();
        match self.mir.symbols().get(name).map(|symbol| symbol.ty) {
            Some(ty) => {
                let tmp = self.function.tmpvar_define(ty);
                self.push_op(Operation::new(
                    OpKind::Symbol {
                        name: name.to_string(),
                    },
                    identifier.span,
                    Some(tmp),
                ));
                Some(tmp)
            }
            None => {
                self.diagnostics.add_simple(
                    span,
                    "Unresolved symbol",
                    format!("Symbol {} was not found in this scope.", name),
                );
                None
            }
        }
    }

    // -- literals ----------------------------------------------------------

    fn lower_literal_char(&mut self, text: &str, span: SourceSpan) -> Option<TmpId> {
        // Lowering continues with a placeholder byte after an error so
        // later diagnostics still surface; the sink already marks the unit
        // failed.
        let byte = match literals::unescape(text) {
            Err(error) => {
                self.diagnostics.add_simple(
                    span,
                    "Invalid Character Literal",
                    format!(
                        "Unknown escape sequence found at character offset {} in character literal",
                        error.offset
                    ),
                );
                b'!'
            }
            Ok(unescaped) => {
                let mut chars = unescaped.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if (c as u32) <= 0xff => c as u8,
                    _ => {
                        self.diagnostics.add_simple(
                            span,
                            "Invalid Character Literal",
                            "Character literal must consist of a single byte.",
                        );
                        b'%'
                    }
                }
            }
        };

        let tmp = self.function.tmpvar_define(TypeId::U8);
        self.push_op(Operation::new(OpKind::LiteralChar(byte), span, Some(tmp)));
        Some(tmp)
    }

    fn lower_literal_string(&mut self, segments: &[String], span: SourceSpan) -> Option<TmpId> {
        // Adjacent string literal tokens concatenate after unescaping.
        let mut text = String::new();
        for segment in segments {
            match literals::unescape(segment) {
                Ok(unescaped) => text.push_str(&unescaped),
                Err(error) => {
                    self.diagnostics.add_simple(
                        span,
                        "Invalid String Literal",
                        format!(
                            "Unknown escape sequence found at character offset {} in string",
                            error.offset
                        ),
                    );
                }
            }
        }

        let ty = self.mir.types_mut().pointer_to(TypeId::U8, span);
        let tmp = self.function.tmpvar_define(ty);
        self.push_op(Operation::new(OpKind::LiteralString(text), span, Some(tmp)));
        Some(tmp)
    }

    fn lower_literal_int(&mut self, text: &str, span: SourceSpan) -> Option<TmpId> {
        let value = literals::parse_int(text, span, self.diagnostics)?;
        let tmp = self.function.tmpvar_define(value.type_id());
        self.push_op(Operation::new(OpKind::LiteralInt(value), span, Some(tmp)));
        Some(tmp)
    }

    /// A constant 1 of the given integer type, for increment/decrement.
    fn constant_one(&mut self, ty: TypeId, span: SourceSpan) -> Option<TmpId> {
        let value = match self.mir.types().get(ty).kind {
            TypeKind::Int(width) => match width {
                IntWidth::U8 => IntValue::U8(1),
                IntWidth::U16 => IntValue::U16(1),
                IntWidth::U32 => IntValue::U32(1),
                IntWidth::U64 => IntValue::U64(1),
                IntWidth::I8 => IntValue::I8(1),
                IntWidth::I16 => IntValue::I16(1),
                IntWidth::I32 => IntValue::I32(1),
                IntWidth::I64 => IntValue::I64(1),
            },
            _ => {
                self.diagnostics.add_simple(
                    span,
                    "Compiler Bug! Invalid integer literal",
                    format!(
                        "Unsupported primitive literal type creating literal one value {}",
                        self.type_name(ty)
                    ),
                );
                return None;
            }
        };
        let tmp = self.function.tmpvar_define(ty);
        self.push_op(Operation::new(OpKind::LiteralInt(value), span, Some(tmp)));
        Some(tmp)
    }

    // -- access ------------------------------------------------------------

    fn lower_array_index(&mut self, array: &Expr, index: &Expr, span: SourceSpan) -> Option<TmpId> {
        let array_tmp = self.lower_expr(array)?;
        let index_tmp = self.lower_expr(index)?;

        let array_type = self.tmp_type(array_tmp);
        if !self.mir.types().get(array_type).is_array() {
            self.diagnostics.add_simple(
                array.span,
                "Array type must be an array type",
                "Type of array is not an array type.",
            );
            return None;
        }
        if self.tmp_type(index_tmp) != TypeId::U32 {
            self.diagnostics.add_simple(
                index.span,
                "Array index must be an unsigned 32-bit (u32) type",
                "Type of index is not a u32 index",
            );
            return None;
        }

        let element = self.mir.types().get(array_type).pointer_target()?;
        let result = self.function.tmpvar_define(element);
        self.push_op(Operation::binary(
            OpKind::ArrayIndex,
            span,
            result,
            array_tmp,
            index_tmp,
        ));
        Some(result)
    }

    fn lower_dot(&mut self, object: &Expr, member: &Identifier, span: SourceSpan) -> Option<TmpId> {
        let object_tmp = self.lower_expr(object)?;
        let object_type = self.tmp_type(object_tmp);
        if !self.mir.types().get(object_type).is_composite() {
            self.diagnostics.add_simple(
                object.span,
                "Member access must be applied to a class.",
                format!(
                    "Type of object being accessed is not a class, but is a {} instead.",
                    self.type_name(object_type)
                ),
            );
            return None;
        }

        if let Some(member_type) = self
            .mir
            .types()
            .get(object_type)
            .member(&member.name)
            .map(|m| m.ty)
        {
            let result = self.function.tmpvar_define(member_type);
            self.push_op(Operation::unary(
                OpKind::Dot {
                    member: member.name.clone(),
                },
                span,
                result,
                object_tmp,
            ));
            return Some(result);
        }

        if self.mir.types().get(object_type).method(&member.name).is_some() {
            let method_name = format!("{}::{}", self.type_name(object_type), member.name);
            let symbol_type = match self.mir.symbols().get(&method_name) {
                Some(symbol) => symbol.ty,
                None => {
                    self.diagnostics.add_simple(
                        object.span,
                        "Class method not found.",
                        format!(
                            "Method {} was not found on class {}",
                            method_name,
                            self.type_name(object_type)
                        ),
                    );
                    return None;
                }
            };
            let method_call_type = self
                .mir
                .types_mut()
                .method_call(object_type, symbol_type, span);
            let result = self.function.tmpvar_define(method_call_type);
            self.push_op(Operation::unary(
                OpKind::GetMethod { name: method_name },
                span,
                result,
                object_tmp,
            ));
            return Some(result);
        }

        self.diagnostics.add_simple(
            object.span,
            "Member or method not found.",
            format!(
                "Class does not have member or method '{}'.",
                member.name
            ),
        );
        None
    }

    fn lower_arrow(&mut self, object: &Expr, member: &Identifier, span: SourceSpan) -> Option<TmpId> {
        let pointer_tmp = self.lower_expr(object)?;
        let pointer_type = self.tmp_type(pointer_tmp);
        if !self.mir.types().get(pointer_type).is_pointer() {
            self.diagnostics.add_simple(
                object.span,
                "Arrow (->) operator must be used on a pointer to a class.",
                format!(
                    "Type of object being accessed is not a pointer to a class, but is a {} instead.",
                    self.type_name(pointer_type)
                ),
            );
            return None;
        }
        let class_type = self.mir.types().get(pointer_type).pointer_target()?;
        if !self.mir.types().get(class_type).is_composite() {
            self.diagnostics.add_simple(
                object.span,
                "Arrow (->) access must be applied to a pointer to a class.",
                format!(
                    "Type of object being accessed is not a pointer to a class , but is a pointer to {} instead.",
                    self.type_name(class_type)
                ),
            );
            return None;
        }
        if !self.tracker.is_unsafe() {
            self.diagnostics.add_simple(
                object.span,
                "De-referencing pointers (->) must be done inside an 'unsafe' block.",
                "De-referencing a pointer outside an 'unsafe' block breaks the safety guarantees of the language.",
            );
            return None;
        }

        let object_tmp = self.function.tmpvar_define(class_type);
        self.push_op(Operation::unary(OpKind::Dereference, span, object_tmp, pointer_tmp));

        let member_type = match self
            .mir
            .types()
            .get(class_type)
            .member(&member.name)
            .map(|m| m.ty)
        {
            Some(ty) => ty,
            None => {
                self.diagnostics.add_simple(
                    object.span,
                    "Attempt to access an undeclared member",
                    format!(
                        "Member {} was not declared in {}",
                        member.name,
                        self.type_name(class_type)
                    ),
                );
                return None;
            }
        };

        let result = self.function.tmpvar_define(member_type);
        self.push_op(Operation::unary(
            OpKind::Dot {
                member: member.name.clone(),
            },
            span,
            result,
            object_tmp,
        ));
        Some(result)
    }

    // -- calls -------------------------------------------------------------

    fn lower_function_call(
        &mut self,
        callee: &Expr,
        arguments: &[Expr],
        span: SourceSpan,
    ) -> Option<TmpId> {
        let callee_tmp = self.lower_expr(callee)?;

        let mut passed = Vec::new();
        let mut passed_spans = Vec::new();
        for argument in arguments {
            passed.push(self.lower_expr(argument)?);
            passed_spans.push(argument.span);
        }

        let callee_type = self.tmp_type(callee_tmp);
        let shape = match self.mir.types().get(callee_type).kind {
            TypeKind::FunctionPointer { return_type, .. } => CalleeShape::Function { return_type },
            TypeKind::MethodCall {
                class,
                function_pointer,
            } => CalleeShape::Method {
                class,
                function_pointer,
            },
            _ => CalleeShape::Other,
        };
        match shape {
            CalleeShape::Function { return_type } => {
                let result = self.function.tmpvar_define(return_type);
                if !self.check_call_signature(false, &passed, &passed_spans, callee_type, span) {
                    return None;
                }
                let mut op = Operation::new(OpKind::FunctionCall, span, Some(result));
                op.operands.push(callee_tmp);
                op.operands.extend(passed);
                self.push_op(op);
                Some(result)
            }
            CalleeShape::Method {
                class,
                function_pointer,
            } => {
                // Split the method value into its callable and its object,
                // then call with the object pointer as the hidden first
                // argument.
                let function_tmp = self.function.tmpvar_define(function_pointer);
                self.push_op(Operation::unary(
                    OpKind::MethodGetFunction,
                    span,
                    function_tmp,
                    callee_tmp,
                ));

                let object_pointer_type = self.mir.types_mut().pointer_to(class, span);
                let object_tmp = self.function.tmpvar_define(object_pointer_type);
                self.push_op(Operation::unary(
                    OpKind::MethodGetObject,
                    span,
                    object_tmp,
                    callee_tmp,
                ));
                passed.insert(0, object_tmp);
                passed_spans.insert(0, span);

                if !self.check_call_signature(true, &passed, &passed_spans, function_pointer, span)
                {
                    return None;
                }

                let return_type = self.function_pointer_return(function_pointer)?;
                let result = self.function.tmpvar_define(return_type);
                let mut op = Operation::new(OpKind::FunctionCall, span, Some(result));
                op.operands.push(function_tmp);
                op.operands.extend(passed);
                self.push_op(op);
                Some(result)
            }
            CalleeShape::Other => {
                self.diagnostics.add_simple(
                    callee.span,
                    "Called object is not a function.",
                    format!(
                        "Type of object being called is not a function, but is a {} instead.",
                        self.type_name(callee_type)
                    ),
                );
                None
            }
        }
    }

    // -- unary -------------------------------------------------------------

    /// `++`/`--` in both positions: load, constant 1, add or subtract,
    /// store back. Postfix hands back the pre-value, prefix the new value.
    fn lower_incdec(
        &mut self,
        span: SourceSpan,
        operand: TmpId,
        is_increment: bool,
        is_postfix: bool,
    ) -> Option<TmpId> {
        let operand_type = self.tmp_type(operand);
        let one = self.constant_one(operand_type, span)?;

        let computed = self.function.tmpvar_duplicate(operand);
        let kind = if is_increment { OpKind::Add } else { OpKind::Subtract };
        self.push_op(Operation::binary(kind, span, computed, operand, one));

        let ignored = self.function.tmpvar_duplicate(operand);
        self.push_op(Operation::binary(OpKind::Assign, span, ignored, operand, computed));

        Some(if is_postfix { operand } else { computed })
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expr, span: SourceSpan) -> Option<TmpId> {
        let operand_tmp = self.lower_expr(operand)?;
        let operand_type = self.tmp_type(operand_tmp);

        match op {
            UnaryOp::PreIncrement => self.lower_incdec(span, operand_tmp, true, false),
            UnaryOp::PreDecrement => self.lower_incdec(span, operand_tmp, false, false),
            UnaryOp::AddressOf => {
                let pointer_type = self.mir.types_mut().pointer_to(operand_type, span);
                let result = self.function.tmpvar_define(pointer_type);
                self.push_op(Operation::unary(OpKind::AddressOf, span, result, operand_tmp));
                Some(result)
            }
            UnaryOp::Dereference => {
                let mut ok = true;
                let ty = self.mir.types().get(operand_type);
                let is_reference = ty.is_reference();
                if !ty.is_pointer() && !is_reference {
                    self.diagnostics.add_simple(
                        operand.span,
                        "Cannot dereference non-pointer",
                        format!(
                            "Attempting to de-reference non-pointer type {}",
                            self.type_name(operand_type)
                        ),
                    );
                    ok = false;
                }
                // References deref in safe code; raw pointers need unsafe.
                if !self.tracker.is_unsafe() && !is_reference {
                    self.diagnostics.add_simple(
                        operand.span,
                        "De-referencing pointers (*) must be done inside an 'unsafe' block.",
                        "De-referencing a pointer outside an 'unsafe' block breaks the safety guarantees of the language.",
                    );
                    ok = false;
                }
                if !ok {
                    return None;
                }
                let target = self.mir.types().get(operand_type).pointer_target()?;
                let result = self.function.tmpvar_define(target);
                self.push_op(Operation::unary(OpKind::Dereference, span, result, operand_tmp));
                Some(result)
            }
            // Unary plus does nothing; wire the operand straight through.
            UnaryOp::Plus => Some(operand_tmp),
            UnaryOp::Minus => {
                let result = self.function.tmpvar_duplicate(operand_tmp);
                self.push_op(Operation::unary(OpKind::Negate, span, result, operand_tmp));
                Some(result)
            }
            UnaryOp::BitwiseNot => {
                let result = self.function.tmpvar_duplicate(operand_tmp);
                self.push_op(Operation::unary(OpKind::BitwiseNot, span, result, operand_tmp));
                Some(result)
            }
            UnaryOp::LogicalNot => {
                if !self.mir.types().get(operand_type).is_bool() {
                    self.diagnostics.add_simple(
                        operand.span,
                        "Logical not (!) must operate on 'bool' expressions.",
                        format!(
                            "Type of condition expression should be 'bool' and was {}",
                            self.type_name(operand_type)
                        ),
                    );
                }
                let result = self.function.tmpvar_duplicate(operand_tmp);
                self.push_op(Operation::unary(OpKind::LogicalNot, span, result, operand_tmp));
                Some(result)
            }
        }
    }

    // -- binary ------------------------------------------------------------

    fn lower_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        span: SourceSpan,
    ) -> Option<TmpId> {
        let a = self.lower_expr(lhs)?;
        let b = self.lower_expr(rhs)?;

        match op {
            BinaryOp::Add => self.lower_arithmetic(span, OpKind::Add, a, b),
            BinaryOp::Subtract => self.lower_arithmetic(span, OpKind::Subtract, a, b),
            BinaryOp::Multiply => self.lower_arithmetic(span, OpKind::Multiply, a, b),
            BinaryOp::Divide => self.lower_arithmetic(span, OpKind::Divide, a, b),
            BinaryOp::Modulo => self.lower_arithmetic(span, OpKind::Modulo, a, b),

            BinaryOp::LogicalAnd => self.lower_logical(span, OpKind::LogicalAnd, a, b),
            BinaryOp::LogicalOr => self.lower_logical(span, OpKind::LogicalOr, a, b),

            BinaryOp::BitwiseAnd => self.lower_bitwise(span, OpKind::BitwiseAnd, a, b),
            BinaryOp::BitwiseOr => self.lower_bitwise(span, OpKind::BitwiseOr, a, b),
            BinaryOp::BitwiseXor => self.lower_bitwise(span, OpKind::BitwiseXor, a, b),

            BinaryOp::ShiftLeft => self.lower_shift(span, OpKind::ShiftLeft, a, b),
            BinaryOp::ShiftRight => self.lower_shift(span, OpKind::ShiftRight, a, b),

            BinaryOp::Less => self.lower_compare(span, OpKind::CompareLess, a, b),
            BinaryOp::Greater => self.lower_compare(span, OpKind::CompareGreater, a, b),
            BinaryOp::LessEqual => self.lower_compare(span, OpKind::CompareLessEqual, a, b),
            BinaryOp::GreaterEqual => self.lower_compare(span, OpKind::CompareGreaterEqual, a, b),
            BinaryOp::Equal => self.lower_compare(span, OpKind::CompareEqual, a, b),
            BinaryOp::NotEqual => self.lower_compare(span, OpKind::CompareNotEqual, a, b),

            BinaryOp::Assign => self.lower_assignment(span, a, b),

            // Compound assignment is sugar for the binary operation
            // followed by a store.
            BinaryOp::AddAssign => self.lower_compound(span, OpKind::Add, a, b),
            BinaryOp::SubtractAssign => self.lower_compound(span, OpKind::Subtract, a, b),
            BinaryOp::MultiplyAssign => self.lower_compound(span, OpKind::Multiply, a, b),
            BinaryOp::DivideAssign => self.lower_compound(span, OpKind::Divide, a, b),
            BinaryOp::ModuloAssign => self.lower_compound(span, OpKind::Modulo, a, b),
            BinaryOp::ShiftLeftAssign => self.lower_compound(span, OpKind::ShiftLeft, a, b),
            BinaryOp::ShiftRightAssign => self.lower_compound(span, OpKind::ShiftRight, a, b),
            BinaryOp::AndAssign => self.lower_compound(span, OpKind::BitwiseAnd, a, b),
            BinaryOp::OrAssign => self.lower_compound(span, OpKind::BitwiseOr, a, b),
            BinaryOp::XorAssign => self.lower_compound(span, OpKind::BitwiseXor, a, b),
        }
    }

    fn lower_compound(
        &mut self,
        span: SourceSpan,
        kind: OpKind,
        a: TmpId,
        b: TmpId,
    ) -> Option<TmpId> {
        let computed = match kind {
            OpKind::Add | OpKind::Subtract | OpKind::Multiply | OpKind::Divide | OpKind::Modulo => {
                self.lower_arithmetic(span, kind, a, b)?
            }
            OpKind::ShiftLeft | OpKind::ShiftRight => self.lower_shift(span, kind, a, b)?,
            _ => self.lower_bitwise(span, kind, a, b)?,
        };
        self.lower_assignment(span, a, computed)
    }

    fn lower_arithmetic(
        &mut self,
        span: SourceSpan,
        kind: OpKind,
        a: TmpId,
        b: TmpId,
    ) -> Option<TmpId> {
        let a_type = self.tmp_type(a);
        let b_type = self.tmp_type(b);
        let (a_numeric, a_integer, a_float) = {
            let ty = self.mir.types().get(a_type);
            (ty.is_numeric(), ty.is_integer(), ty.is_float())
        };
        let (b_numeric, b_integer, b_float) = {
            let ty = self.mir.types().get(b_type);
            (ty.is_numeric(), ty.is_integer(), ty.is_float())
        };

        if !a_numeric || !b_numeric {
            self.diagnostics.add_simple(
                span,
                "Type mismatch in binary operation",
                format!(
                    "The type of operands should be numeric, but were: a= {} b={}",
                    self.type_name(a_type),
                    self.type_name(b_type)
                ),
            );
            return None;
        }
        // Modulo has no floating-point form.
        if matches!(kind, OpKind::Modulo) && (a_float || b_float) {
            self.diagnostics.add_simple(
                span,
                "Type mismatch in binary operation",
                format!(
                    "The type of operands should be integer, but were a= {} b={}",
                    self.type_name(a_type),
                    self.type_name(b_type)
                ),
            );
            return None;
        }
        if !((a_integer && b_integer) || (a_float && b_float)) {
            self.diagnostics.add_simple(
                span,
                "Type mismatch in binary operation",
                format!(
                    "The type of operands both integer or floating-point types.  Automatic cast from int to float is not supported. a= {} b={}",
                    self.type_name(a_type),
                    self.type_name(b_type)
                ),
            );
            return None;
        }

        let (a, b, widened) = self.widen_operands(span, a, b)?;
        let result = self.function.tmpvar_define(widened);
        self.push_op(Operation::binary(kind, span, result, a, b));
        Some(result)
    }

    fn lower_logical(
        &mut self,
        span: SourceSpan,
        kind: OpKind,
        a: TmpId,
        b: TmpId,
    ) -> Option<TmpId> {
        let a_type = self.tmp_type(a);
        let b_type = self.tmp_type(b);
        if !self.mir.types().get(a_type).is_bool() || !self.mir.types().get(b_type).is_bool() {
            self.diagnostics.add_simple(
                span,
                "Type mismatch in logical operation",
                format!(
                    "The type of operands should be bool , but were: a= {} b={}",
                    self.type_name(a_type),
                    self.type_name(b_type)
                ),
            );
            return None;
        }
        let result = self.function.tmpvar_define(TypeId::BOOL);
        self.push_op(Operation::binary(kind, span, result, a, b));
        Some(result)
    }

    fn lower_bitwise(
        &mut self,
        span: SourceSpan,
        kind: OpKind,
        a: TmpId,
        b: TmpId,
    ) -> Option<TmpId> {
        let a_type = self.tmp_type(a);
        let b_type = self.tmp_type(b);
        if !self.mir.types().get(a_type).is_unsigned() || !self.mir.types().get(b_type).is_unsigned()
        {
            self.diagnostics.add_simple(
                span,
                "Type mismatch in binary operation",
                format!(
                    "The type of operands should be unsigned integers, but were: a= {} b={}",
                    self.type_name(a_type),
                    self.type_name(b_type)
                ),
            );
            return None;
        }

        let (a, b, widened) = self.widen_operands(span, a, b)?;
        let result = self.function.tmpvar_define(widened);
        self.push_op(Operation::binary(kind, span, result, a, b));
        Some(result)
    }

    fn lower_shift(
        &mut self,
        span: SourceSpan,
        kind: OpKind,
        a: TmpId,
        b: TmpId,
    ) -> Option<TmpId> {
        let a_type = self.tmp_type(a);
        let b_type = self.tmp_type(b);
        if !self.mir.types().get(a_type).is_unsigned() || !self.mir.types().get(b_type).is_unsigned()
        {
            self.diagnostics.add_simple(
                span,
                "Type mismatch in binary operation",
                format!(
                    "The type of operands should be unsigned integers, but were: a= {} b={}",
                    self.type_name(a_type),
                    self.type_name(b_type)
                ),
            );
            return None;
        }

        // Shifts never widen: the result keeps the left operand's type and
        // the shift amount is masked by the back-end.
        let result = self.function.tmpvar_define(a_type);
        self.push_op(Operation::binary(kind, span, result, a, b));
        Some(result)
    }

    fn lower_compare(
        &mut self,
        span: SourceSpan,
        kind: OpKind,
        a: TmpId,
        b: TmpId,
    ) -> Option<TmpId> {
        let a_type = self.tmp_type(a);
        let b_type = self.tmp_type(b);
        if self.type_name(a_type) != self.type_name(b_type) {
            self.diagnostics.add_simple(
                span,
                "Type mismatch in compare operation",
                format!(
                    "The operands of a comparison should be the same type, but were: a= {} b={}",
                    self.type_name(a_type),
                    self.type_name(b_type)
                ),
            );
            return None;
        }
        let (is_void, is_composite, is_pointer_like) = {
            let ty = self.mir.types().get(a_type);
            (
                ty.is_void(),
                ty.is_composite(),
                ty.is_pointer() || ty.is_reference(),
            )
        };
        if is_void {
            self.diagnostics.add_simple(
                span,
                "Type mismatch in compare operation",
                format!(
                    "The operands of a comparison must not be void, but were: a= {} b={}",
                    self.type_name(a_type),
                    self.type_name(b_type)
                ),
            );
            return None;
        }
        if is_composite {
            self.diagnostics.add_simple(
                span,
                "Type mismatch in compare operation",
                format!(
                    "The operands of a comparison must not be composite structures or classes, but were: a= {} b={}",
                    self.type_name(a_type),
                    self.type_name(b_type)
                ),
            );
            return None;
        }
        if is_pointer_like
            && !matches!(kind, OpKind::CompareEqual | OpKind::CompareNotEqual)
        {
            self.diagnostics.add_simple(
                span,
                "Type mismatch in compare operation",
                format!(
                    "The operands of a comparison of pointers and references may not be used except for equality comparisons, but were: a= {} b={}",
                    self.type_name(a_type),
                    self.type_name(b_type)
                ),
            );
            return None;
        }

        let result = self.function.tmpvar_define(TypeId::BOOL);
        self.push_op(Operation::binary(kind, span, result, a, b));
        Some(result)
    }

    pub(crate) fn lower_assignment(
        &mut self,
        span: SourceSpan,
        a: TmpId,
        b: TmpId,
    ) -> Option<TmpId> {
        let a_type = self.tmp_type(a);
        let b_type = self.tmp_type(b);

        if self.type_name(a_type) != self.type_name(b_type) {
            let a_is_reference = self.mir.types().get(a_type).is_reference();
            let a_is_pointer = self.mir.types().get(a_type).is_pointer();
            let b_is_reference = self.mir.types().get(b_type).is_reference();
            let b_is_pointer = self.mir.types().get(b_type).is_pointer();

            if a_is_reference && b_is_pointer {
                // A raw pointer may only flow into a reference under
                // unsafe; the reverse direction is always allowed.
                if !self.tracker.is_unsafe() {
                    self.diagnostics.add_simple(
                        span,
                        "Assigning a reference to a raw pointer must be done inside an 'unsafe' block",
                        "Assigning a pointer to a reference must be done inside an unsafe block",
                    );
                    return None;
                }
            } else if a_is_pointer && b_is_reference {
                // Always allowed.
            } else {
                self.diagnostics.add_simple(
                    span,
                    "Type mismatch in assignment operation",
                    format!(
                        "The operands of an assignment should be the same type, but were: a= {} b={}",
                        self.type_name(a_type),
                        self.type_name(b_type)
                    ),
                );
                return None;
            }
        }
        if self.mir.types().get(a_type).is_void() {
            self.diagnostics.add_simple(
                span,
                "Type mismatch in assignment operation",
                format!(
                    "The operands of an assignment must not be void, but were: a= {} b={}",
                    self.type_name(a_type),
                    self.type_name(b_type)
                ),
            );
            return None;
        }
        if self.mir.types().get(a_type).is_composite() {
            self.diagnostics.add_simple(
                span,
                "Type mismatch in assignment operation",
                format!(
                    "The operands of an assignment must not be composite structures or classes, but were: a= {} b={}",
                    self.type_name(a_type),
                    self.type_name(b_type)
                ),
            );
            return None;
        }

        let result = self.function.tmpvar_define(a_type);
        self.push_op(Operation::binary(OpKind::Assign, span, result, a, b));
        Some(result)
    }

    // -- widening ----------------------------------------------------------

    /// Usual-arithmetic widening: within one signedness class (or between
    /// floats) the smaller operand widens to the larger operand's type.
    /// Mixing signed and unsigned is an error; no conversion ever crosses
    /// the int/float boundary.
    fn widen_operands(
        &mut self,
        span: SourceSpan,
        a: TmpId,
        b: TmpId,
    ) -> Option<(TmpId, TmpId, TypeId)> {
        let a_type = self.tmp_type(a);
        let b_type = self.tmp_type(b);
        let (a_integer, a_signed, a_size) = {
            let ty = self.mir.types().get(a_type);
            (ty.is_integer(), ty.is_signed(), ty.primitive_size().unwrap_or(0))
        };
        let (b_signed, b_size) = {
            let ty = self.mir.types().get(b_type);
            (ty.is_signed(), ty.primitive_size().unwrap_or(0))
        };

        if a_integer && a_signed != b_signed {
            self.diagnostics.add_simple(
                span,
                "Type mismatch in binary operation",
                format!(
                    "The type of operands both signed or unsigned.  Automatic cast from signed to unsigned is not supported. a= {} b={}",
                    self.type_name(a_type),
                    self.type_name(b_type)
                ),
            );
            return None;
        }

        if a_size > b_size {
            let widened = self.widen(span, b, a_type)?;
            Some((a, widened, a_type))
        } else if a_size < b_size {
            let widened = self.widen(span, a, b_type)?;
            Some((widened, b, b_type))
        } else {
            Some((a, b, a_type))
        }
    }

    fn widen(&mut self, span: SourceSpan, tmp: TmpId, to: TypeId) -> Option<TmpId> {
        let kind = {
            let ty = self.mir.types().get(to);
            if ty.is_integer() && ty.is_signed() {
                OpKind::WidenSigned { to }
            } else if ty.is_integer() {
                OpKind::WidenUnsigned { to }
            } else if ty.is_float() {
                OpKind::WidenFloat { to }
            } else {
                self.diagnostics.add_simple(
                    span,
                    "Compiler Bug! Widening number of unknown type",
                    format!("Cannot widen to non-numeric type {}", self.type_name(to)),
                );
                return None;
            }
        };
        let result = self.function.tmpvar_define(to);
        self.push_op(Operation::unary(kind, span, result, tmp));
        Some(result)
    }
}
