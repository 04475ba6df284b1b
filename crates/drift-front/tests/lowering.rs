//! End-to-end lowering tests: hand-built syntax trees through the full
//! pipeline, asserted against the emitted operation stream and the MIR
//! dump.

use drift_context::{Diagnostics, FileId, SourceSpan};
use drift_front::ast::{
    ElseArm, Expr, ExprKind, FileStatement, For, FunctionDefinition, Identifier, IdentifierKind,
    IfElse, Parameter, QualifiedName, StatementList, Stmt, StmtKind, Switch, SwitchCase,
    TranslationUnit, TypeSpecifier, UnaryOp, VariableDeclaration, VariableInit,
};
use drift_front::ast::BinaryOp;
use drift_front::namespace::NamespaceContext;
use drift_front::FunctionResolver;
use drift_mir::{BlockId, Function, Mir, OpKind, Operation, TypeId};

// -- helpers ---------------------------------------------------------------

fn sp(line: u32) -> SourceSpan {
    SourceSpan::new(FileId(0), line, 1, line, 40)
}

fn ident(name: &str, line: u32) -> Identifier {
    Identifier {
        name: name.to_string(),
        fully_qualified: None,
        kind: IdentifierKind::GlobalScope,
        span: sp(line),
    }
}

fn var(name: &str, line: u32) -> Expr {
    Expr::new(ExprKind::Identifier(ident(name, line)), sp(line))
}

fn int(text: &str, line: u32) -> Expr {
    Expr::new(ExprKind::LiteralInt(text.to_string()), sp(line))
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, line: u32) -> Expr {
    Expr::new(
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        sp(line),
    )
}

fn declare(ty: &str, name: &str, init: Option<Expr>, line: u32) -> Stmt {
    Stmt::new(
        StmtKind::VariableDeclaration(VariableDeclaration {
            ty: TypeSpecifier::named(ty, sp(line)),
            name: ident(name, line),
            init: match init {
                Some(expr) => VariableInit::Expression(expr),
                None => VariableInit::None,
            },
        }),
        sp(line),
    )
}

fn statement_list(statements: Vec<Stmt>, line: u32) -> StatementList {
    StatementList {
        statements,
        span: sp(line),
    }
}

fn function(name: &str, return_type: &str, parameters: Vec<(&str, &str)>, body: Vec<Stmt>) -> FunctionDefinition {
    FunctionDefinition {
        name: QualifiedName::new(name, sp(1)),
        is_unsafe: false,
        return_type: TypeSpecifier::named(return_type, sp(1)),
        parameters: parameters
            .into_iter()
            .map(|(ty, param)| Parameter {
                ty: TypeSpecifier::named(ty, sp(1)),
                name: ident(param, 1),
            })
            .collect(),
        body: statement_list(body, 2),
        span: sp(1),
    }
}

fn lower_unit(functions: Vec<FunctionDefinition>) -> (Mir, Diagnostics) {
    lower_into(Mir::new(), functions)
}

fn lower_into(mut mir: Mir, functions: Vec<FunctionDefinition>) -> (Mir, Diagnostics) {
    let unit = TranslationUnit {
        statements: functions
            .into_iter()
            .map(FileStatement::FunctionDefinition)
            .collect(),
    };
    let namespaces = NamespaceContext::new();
    let mut diagnostics = Diagnostics::new();
    FunctionResolver::new(&mut diagnostics, &mut mir, &namespaces).resolve(&unit);
    (mir, diagnostics)
}

fn op_names(function: &Function, block: BlockId) -> Vec<&'static str> {
    function
        .block(block)
        .operations()
        .iter()
        .map(|op| op.kind.name())
        .collect()
}

fn titles(diagnostics: &Diagnostics) -> Vec<&str> {
    diagnostics.iter().map(|d| d.title.as_str()).collect()
}

/// Structural invariants every lowered function must satisfy: operand ids
/// bound, jump targets valid, at most one terminator and only in final
/// position, reachable blocks terminated.
fn assert_invariants(function: &Function) {
    for (_, block) in function.blocks() {
        for (index, op) in block.operations().iter().enumerate() {
            if let Some(result) = op.result {
                assert!((result.0 as usize) < function.tmpvar_count());
            }
            for operand in &op.operands {
                assert!((operand.0 as usize) < function.tmpvar_count());
            }
            if op.is_terminator() {
                assert_eq!(index, block.len() - 1, "terminator must be last");
            }
            match op.kind {
                OpKind::Jump { target } => {
                    assert!((target.0 as usize) < function.block_count());
                }
                OpKind::JumpConditional { if_block, else_block } => {
                    assert!((if_block.0 as usize) < function.block_count());
                    assert!((else_block.0 as usize) < function.block_count());
                }
                _ => {}
            }
        }
    }
    for (id, block) in function.blocks() {
        if function.is_reachable(id) {
            assert!(
                block.contains_terminator(),
                "reachable {} lacks a terminator",
                id
            );
        }
    }
}

// -- scenarios -------------------------------------------------------------

#[test]
fn straight_line_arithmetic_with_implicit_return() {
    // u32 a = 3u32; u32 b = a + 5u32;  in a void function
    let def = function(
        "f",
        "void",
        vec![],
        vec![
            declare("u32", "a", Some(int("3u32", 2)), 2),
            declare(
                "u32",
                "b",
                Some(binary(BinaryOp::Add, var("a", 3), int("5u32", 3), 3)),
                3,
            ),
        ],
    );
    let (mir, diagnostics) = lower_unit(vec![def]);
    assert!(!diagnostics.has_errors(), "{:?}", titles(&diagnostics));

    let f = mir.function("f").unwrap();
    assert_eq!(
        f.dump(),
        concat!(
            "BB0:\n",
            "    declare ( a )\n",
            "    _0 = load ( a )\n",
            "    _1 = literal-int ( 3u32 )\n",
            "    _2 = store ( _0 _1 )\n",
            "    declare ( b )\n",
            "    _3 = load ( b )\n",
            "    _4 = load ( a )\n",
            "    _5 = literal-int ( 5u32 )\n",
            "    _6 = add ( _4 _5 )\n",
            "    _7 = store ( _3 _6 )\n",
            "    undeclare ( b )\n",
            "    undeclare ( a )\n",
            "    return-void ( )\n",
        ),
    );
    assert_invariants(f);
}

#[test]
fn if_else_with_returns_in_both_branches() {
    // u32 f(u32 x) { if (x > 0u32) { return 1u32; } else { return 0u32; } }
    let condition = binary(BinaryOp::Greater, var("x", 2), int("0u32", 2), 2);
    let then_body = statement_list(
        vec![Stmt::new(StmtKind::Return(Some(int("1u32", 3))), sp(3))],
        3,
    );
    let else_body = statement_list(
        vec![Stmt::new(StmtKind::Return(Some(int("0u32", 4))), sp(4))],
        4,
    );
    let def = function(
        "f",
        "u32",
        vec![("u32", "x")],
        vec![Stmt::new(
            StmtKind::IfElse(IfElse {
                condition,
                then_body,
                else_arm: ElseArm::Else(else_body),
                span: sp(2),
            }),
            sp(2),
        )],
    );
    let (mir, diagnostics) = lower_unit(vec![def]);
    assert!(!diagnostics.has_errors(), "{:?}", titles(&diagnostics));

    let f = mir.function("f").unwrap();
    assert_eq!(
        op_names(f, BlockId(0)),
        vec!["load", "literal-int", "compare-gt", "jump-conditional"],
    );
    // Both branches return; the argument x unwinds before each return.
    assert_eq!(
        op_names(f, BlockId(1)),
        vec!["literal-int", "undeclare", "return"],
    );
    assert_eq!(
        op_names(f, BlockId(2)),
        vec!["literal-int", "undeclare", "return"],
    );
    // The conditional targets the then/else blocks.
    match f.block(BlockId(0)).terminator().map(|op| &op.kind) {
        Some(OpKind::JumpConditional { if_block, else_block }) => {
            assert_eq!(*if_block, BlockId(1));
            assert_eq!(*else_block, BlockId(2));
        }
        other => panic!("expected conditional terminator, got {:?}", other),
    }
    // The done block exists but nothing reaches it.
    assert!(!f.is_reachable(BlockId(3)));
    assert_invariants(f);
}

#[test]
fn while_loop_block_structure() {
    // u32 i = 0u32; while (i < 10u32) { i = i + 1u32; }
    let body = statement_list(
        vec![Stmt::new(
            StmtKind::Expression(binary(
                BinaryOp::Assign,
                var("i", 4),
                binary(BinaryOp::Add, var("i", 4), int("1u32", 4), 4),
                4,
            )),
            sp(4),
        )],
        4,
    );
    let def = function(
        "f",
        "void",
        vec![],
        vec![
            declare("u32", "i", Some(int("0u32", 2)), 2),
            Stmt::new(
                StmtKind::While {
                    condition: binary(BinaryOp::Less, var("i", 3), int("10u32", 3), 3),
                    body,
                },
                sp(3),
            ),
        ],
    );
    let (mir, diagnostics) = lower_unit(vec![def]);
    assert!(!diagnostics.has_errors(), "{:?}", titles(&diagnostics));

    let f = mir.function("f").unwrap();
    // Entry declares i and jumps to the eval block.
    assert!(matches!(
        f.block(BlockId(0)).terminator().map(|op| &op.kind),
        Some(OpKind::Jump { target }) if *target == BlockId(1)
    ));
    // Eval compares and branches to body or done.
    assert_eq!(
        op_names(f, BlockId(1)),
        vec!["load", "literal-int", "compare-lt", "jump-conditional"],
    );
    insta::assert_snapshot!(
        f.block(BlockId(1)).terminator().unwrap().description(),
        @"jump-conditional ( _5 BB2 BB3 )"
    );
    // Body assigns and jumps back to eval.
    assert!(matches!(
        f.block(BlockId(2)).terminator().map(|op| &op.kind),
        Some(OpKind::Jump { target }) if *target == BlockId(1)
    ));
    // Done unwinds i and returns.
    assert_eq!(op_names(f, BlockId(3)), vec!["undeclare", "return-void"]);
    // The back edge makes eval reachable from the body.
    assert!(f.block(BlockId(1)).reachable_from().contains(&BlockId(2)));
    assert_invariants(f);
}

#[test]
fn pointer_write_inside_unsafe_block() {
    // u32 x = 0u32; unsafe { u32* p = &x; *p = 7u32; }
    let address_of = Expr::new(
        ExprKind::Unary {
            op: UnaryOp::AddressOf,
            operand: Box::new(var("x", 3)),
        },
        sp(3),
    );
    let deref = Expr::new(
        ExprKind::Unary {
            op: UnaryOp::Dereference,
            operand: Box::new(var("p", 4)),
        },
        sp(4),
    );
    let pointer_declare = Stmt::new(
        StmtKind::VariableDeclaration(VariableDeclaration {
            ty: TypeSpecifier::pointer(TypeSpecifier::named("u32", sp(3)), sp(3)),
            name: ident("p", 3),
            init: VariableInit::Expression(address_of),
        }),
        sp(3),
    );
    let store = Stmt::new(
        StmtKind::Expression(binary(BinaryOp::Assign, deref, int("7u32", 4), 4)),
        sp(4),
    );
    let def = function(
        "f",
        "void",
        vec![],
        vec![
            declare("u32", "x", Some(int("0u32", 2)), 2),
            Stmt::new(
                StmtKind::Block {
                    is_unsafe: true,
                    body: statement_list(vec![pointer_declare, store], 3),
                },
                sp(3),
            ),
        ],
    );
    let (mir, diagnostics) = lower_unit(vec![def]);
    assert!(!diagnostics.has_errors(), "{:?}", titles(&diagnostics));

    let f = mir.function("f").unwrap();
    let names = op_names(f, BlockId(0));
    assert!(names.contains(&"addressof"));
    assert!(names.contains(&"dereference"));
    assert_invariants(f);
}

#[test]
fn pointer_dereference_outside_unsafe_is_rejected() {
    let deref = Expr::new(
        ExprKind::Unary {
            op: UnaryOp::Dereference,
            operand: Box::new(var("p", 3)),
        },
        sp(3),
    );
    let pointer_declare = Stmt::new(
        StmtKind::VariableDeclaration(VariableDeclaration {
            ty: TypeSpecifier::pointer(TypeSpecifier::named("u32", sp(2)), sp(2)),
            name: ident("p", 2),
            init: VariableInit::None,
        }),
        sp(2),
    );
    let def = function(
        "f",
        "void",
        vec![],
        vec![
            pointer_declare,
            Stmt::new(
                StmtKind::Expression(binary(
                    BinaryOp::Assign,
                    deref,
                    int("7u32", 3),
                    3,
                )),
                sp(3),
            ),
        ],
    );
    let (mir, diagnostics) = lower_unit(vec![def]);
    assert!(titles(&diagnostics)
        .contains(&"De-referencing pointers (*) must be done inside an 'unsafe' block."));
    assert!(mir.function("f").is_none());
}

#[test]
fn goto_skipping_initialization_is_rejected() {
    // goto later; u32 c = 0u32; later: ;
    let def = function(
        "f",
        "void",
        vec![],
        vec![
            Stmt::new(
                StmtKind::Goto {
                    label: "later".to_string(),
                    label_span: sp(2),
                },
                sp(2),
            ),
            declare("u32", "c", Some(int("0u32", 3)), 3),
            Stmt::new(
                StmtKind::Label {
                    name: "later".to_string(),
                    name_span: sp(4),
                },
                sp(4),
            ),
        ],
    );
    let (mir, diagnostics) = lower_unit(vec![def]);
    assert!(titles(&diagnostics).contains(&"Goto would skip initialization."));
    assert!(mir.function("f").is_none());

    let diagnostic = diagnostics
        .iter()
        .find(|d| d.title == "Goto would skip initialization.")
        .unwrap();
    // Points at the goto, the label, and the skipped declaration.
    assert_eq!(diagnostic.labels.len(), 3);
    assert_eq!(diagnostic.labels[1].span, sp(4));
    assert_eq!(diagnostic.labels[2].span, sp(3));
}

#[test]
fn goto_out_of_scope_inserts_unwind_before_jump() {
    // out: { u32 a; goto out; }
    let inner = statement_list(
        vec![
            declare("u32", "a", None, 3),
            Stmt::new(
                StmtKind::Goto {
                    label: "out".to_string(),
                    label_span: sp(4),
                },
                sp(4),
            ),
        ],
        3,
    );
    let def = function(
        "f",
        "void",
        vec![],
        vec![
            Stmt::new(
                StmtKind::Label {
                    name: "out".to_string(),
                    name_span: sp(2),
                },
                sp(2),
            ),
            Stmt::new(
                StmtKind::Block {
                    is_unsafe: false,
                    body: inner,
                },
                sp(3),
            ),
        ],
    );
    let (mir, diagnostics) = lower_unit(vec![def]);
    assert!(!diagnostics.has_errors(), "{:?}", titles(&diagnostics));

    let f = mir.function("f").unwrap();
    // Find the block holding the goto's jump: it must undeclare `a`
    // immediately before jumping.
    let mut found = false;
    for (_, block) in f.blocks() {
        let ops = block.operations();
        for (index, op) in ops.iter().enumerate() {
            if matches!(&op.kind, OpKind::LocalUndeclare { name } if name == "a") {
                if let Some(Operation {
                    kind: OpKind::Jump { .. },
                    ..
                }) = ops.get(index + 1)
                {
                    found = true;
                }
            }
        }
    }
    assert!(found, "expected undeclare(a) immediately before the goto jump");
}

#[test]
fn return_type_mismatch_against_forward_declaration() {
    // u32 add(u32 a, u32 b);  followed by  i32 add(u32 a, u32 b) { ... }
    let mut mir = Mir::new();
    let argument_types = vec![("a", TypeId::U32), ("b", TypeId::U32)];
    let arguments = argument_types
        .iter()
        .map(|(name, ty)| drift_mir::types::SignatureArgument {
            name: name.to_string(),
            ty: *ty,
            declared_at: sp(1),
        })
        .collect();
    let declaration = mir
        .types_mut()
        .function_pointer(arguments, TypeId::U32, false, sp(1));
    mir.symbols_mut().add("add", declaration, sp(1)).unwrap();

    let def = function(
        "add",
        "i32",
        vec![("u32", "a"), ("u32", "b")],
        vec![Stmt::new(
            StmtKind::Return(Some(binary(
                BinaryOp::Add,
                var("a", 3),
                var("b", 3),
                3,
            ))),
            sp(3),
        )],
    );
    let (mir, diagnostics) = lower_into(mir, vec![def]);
    let diagnostic = diagnostics
        .iter()
        .find(|d| d.title == "Return-value does not match declaration")
        .unwrap();
    // Both sites are cited: the definition's return type and the
    // declaration.
    assert_eq!(diagnostic.labels.len(), 2);
    assert!(mir.function("add").is_none());
}

// -- statements ------------------------------------------------------------

#[test]
fn for_loop_declares_tests_increments_and_unwinds() {
    // for (u32 i = 0u32; i < 4u32; i = i + 1u32) { }
    let for_loop = For {
        declaration: Some((TypeSpecifier::named("u32", sp(2)), ident("i", 2))),
        init: binary(BinaryOp::Assign, var("i", 2), int("0u32", 2), 2),
        condition: binary(BinaryOp::Less, var("i", 2), int("4u32", 2), 2),
        increment: binary(
            BinaryOp::Assign,
            var("i", 2),
            binary(BinaryOp::Add, var("i", 2), int("1u32", 2), 2),
            2,
        ),
        body: statement_list(vec![], 2),
    };
    let def = function(
        "f",
        "void",
        vec![],
        vec![Stmt::new(StmtKind::For(Box::new(for_loop)), sp(2))],
    );
    let (mir, diagnostics) = lower_unit(vec![def]);
    assert!(!diagnostics.has_errors(), "{:?}", titles(&diagnostics));

    let f = mir.function("f").unwrap();
    // Entry: declare + init assignment + jump to test.
    let entry = op_names(f, BlockId(0));
    assert_eq!(entry[0], "declare");
    assert_eq!(*entry.last().unwrap(), "jump");
    // Test block ends in the conditional.
    assert_eq!(
        *op_names(f, BlockId(1)).last().unwrap(),
        "jump-conditional"
    );
    // Body evaluates the increment then jumps back to the test.
    assert!(matches!(
        f.block(BlockId(2)).terminator().map(|op| &op.kind),
        Some(OpKind::Jump { target }) if *target == BlockId(1)
    ));
    // Done undeclares the loop variable before the implicit return.
    assert_eq!(op_names(f, BlockId(3)), vec!["undeclare", "return-void"]);
    assert_invariants(f);
}

#[test]
fn break_unwinds_loop_locals_and_jumps_to_done() {
    // while (true) { u32 a; break; }
    let body = statement_list(
        vec![
            declare("u32", "a", None, 3),
            Stmt::new(StmtKind::Break, sp(4)),
        ],
        3,
    );
    let def = function(
        "f",
        "void",
        vec![],
        vec![Stmt::new(
            StmtKind::While {
                condition: Expr::new(ExprKind::LiteralBool(true), sp(2)),
                body,
            },
            sp(2),
        )],
    );
    let (mir, diagnostics) = lower_unit(vec![def]);
    assert!(!diagnostics.has_errors(), "{:?}", titles(&diagnostics));

    let f = mir.function("f").unwrap();
    // Body block: declare a, undeclare a (break unwind), jump to done.
    assert_eq!(
        op_names(f, BlockId(2)),
        vec!["declare", "undeclare", "jump"],
    );
    assert!(matches!(
        f.block(BlockId(2)).terminator().map(|op| &op.kind),
        Some(OpKind::Jump { target }) if *target == BlockId(3)
    ));
    assert_invariants(f);
}

#[test]
fn continue_jumps_to_eval_without_unwinding() {
    let body = statement_list(vec![Stmt::new(StmtKind::Continue, sp(3))], 3);
    let def = function(
        "f",
        "void",
        vec![],
        vec![Stmt::new(
            StmtKind::While {
                condition: Expr::new(ExprKind::LiteralBool(true), sp(2)),
                body,
            },
            sp(2),
        )],
    );
    let (mir, diagnostics) = lower_unit(vec![def]);
    assert!(!diagnostics.has_errors(), "{:?}", titles(&diagnostics));

    let f = mir.function("f").unwrap();
    assert!(matches!(
        f.block(BlockId(2)).terminator().map(|op| &op.kind),
        Some(OpKind::Jump { target }) if *target == BlockId(1)
    ));
}

#[test]
fn break_outside_loop_is_reported_but_lowering_continues() {
    let def = function(
        "f",
        "void",
        vec![],
        vec![Stmt::new(StmtKind::Break, sp(2))],
    );
    let (mir, diagnostics) = lower_unit(vec![def]);
    assert!(titles(&diagnostics)
        .contains(&"'break' statement not in loop or switch statement"));
    // The function still lowers; the sink marks the unit failed.
    assert!(mir.function("f").is_some());
}

#[test]
fn switch_compares_each_case_and_rejects_type_mismatch() {
    let switch = Switch {
        value: var("x", 2),
        cases: vec![
            SwitchCase {
                value: Some(int("1u32", 3)),
                body: statement_list(vec![], 3),
                span: sp(3),
            },
            SwitchCase {
                value: Some(int("2u64", 4)),
                body: statement_list(vec![], 4),
                span: sp(4),
            },
            SwitchCase {
                value: None,
                body: statement_list(vec![], 5),
                span: sp(5),
            },
        ],
    };
    let def = function(
        "f",
        "void",
        vec![("u32", "x")],
        vec![Stmt::new(StmtKind::Switch(switch), sp(2))],
    );
    let (mir, diagnostics) = lower_unit(vec![def]);
    // The u64 case does not match the u32 switch value.
    assert!(titles(&diagnostics).contains(&"Case must match switch type"));
    assert!(mir.function("f").is_none());
}

#[test]
fn switch_default_must_be_last() {
    let switch = Switch {
        value: var("x", 2),
        cases: vec![
            SwitchCase {
                value: None,
                body: statement_list(vec![], 3),
                span: sp(3),
            },
            SwitchCase {
                value: Some(int("1u32", 4)),
                body: statement_list(vec![], 4),
                span: sp(4),
            },
        ],
    };
    let def = function(
        "f",
        "void",
        vec![("u32", "x")],
        vec![Stmt::new(StmtKind::Switch(switch), sp(2))],
    );
    let (_, diagnostics) = lower_unit(vec![def]);
    assert!(titles(&diagnostics)
        .contains(&"Default clause must be the last clause in a switch statement."));
}

#[test]
fn switch_emits_equality_chain() {
    let switch = Switch {
        value: var("x", 2),
        cases: vec![SwitchCase {
            value: Some(int("1u32", 3)),
            body: statement_list(vec![], 3),
            span: sp(3),
        }],
    };
    let def = function(
        "f",
        "void",
        vec![("u32", "x")],
        vec![Stmt::new(StmtKind::Switch(switch), sp(2))],
    );
    let (mir, diagnostics) = lower_unit(vec![def]);
    assert!(!diagnostics.has_errors(), "{:?}", titles(&diagnostics));

    let f = mir.function("f").unwrap();
    let entry = op_names(f, BlockId(0));
    assert!(entry.contains(&"compare-eq"));
    assert_eq!(*entry.last().unwrap(), "jump-conditional");
    assert_invariants(f);
}

#[test]
fn duplicate_local_cites_both_sites() {
    let def = function(
        "f",
        "void",
        vec![],
        vec![
            declare("u32", "a", None, 2),
            declare("u32", "a", None, 3),
        ],
    );
    let (_, diagnostics) = lower_unit(vec![def]);
    let diagnostic = diagnostics
        .iter()
        .find(|d| d.title == "Duplicate Local Variable.")
        .unwrap();
    assert_eq!(diagnostic.labels.len(), 2);
    assert_eq!(diagnostic.labels[0].span, sp(3));
    assert_eq!(diagnostic.labels[1].span, sp(2));
}

#[test]
fn non_void_function_without_return_is_reported() {
    let def = function("f", "u32", vec![], vec![]);
    let (mir, diagnostics) = lower_unit(vec![def]);
    assert!(titles(&diagnostics).contains(&"Control reaches end of non-void function"));
    // The function is still registered; the sink gates the hand-off.
    assert!(mir.function("f").is_some());
}

#[test]
fn duplicate_labels_are_rejected() {
    let def = function(
        "f",
        "void",
        vec![],
        vec![
            Stmt::new(
                StmtKind::Label {
                    name: "l".to_string(),
                    name_span: sp(2),
                },
                sp(2),
            ),
            Stmt::new(
                StmtKind::Label {
                    name: "l".to_string(),
                    name_span: sp(3),
                },
                sp(3),
            ),
        ],
    );
    let (_, diagnostics) = lower_unit(vec![def]);
    assert!(titles(&diagnostics).contains(&"Labels in functions must be unique"));
}

#[test]
fn else_if_chain_drains_into_outer_done() {
    // if (a) {} else if (b) {} -- every path must reach a terminated block.
    let chain = IfElse {
        condition: var("a", 2),
        then_body: statement_list(vec![], 2),
        else_arm: ElseArm::ElseIf(Box::new(IfElse {
            condition: var("b", 3),
            then_body: statement_list(vec![], 3),
            else_arm: ElseArm::None,
            span: sp(3),
        })),
        span: sp(2),
    };
    let def = function(
        "f",
        "void",
        vec![("bool", "a"), ("bool", "b")],
        vec![Stmt::new(StmtKind::IfElse(chain), sp(2))],
    );
    let (mir, diagnostics) = lower_unit(vec![def]);
    assert!(!diagnostics.has_errors(), "{:?}", titles(&diagnostics));
    assert_invariants(mir.function("f").unwrap());
}

#[test]
fn non_bool_if_condition_is_rejected() {
    let def = function(
        "f",
        "void",
        vec![("u32", "x")],
        vec![Stmt::new(
            StmtKind::IfElse(IfElse {
                condition: var("x", 2),
                then_body: statement_list(vec![], 2),
                else_arm: ElseArm::None,
                span: sp(2),
            }),
            sp(2),
        )],
    );
    let (_, diagnostics) = lower_unit(vec![def]);
    assert!(titles(&diagnostics).contains(&"Invalid condition in if statement."));
}
