//! End-to-end scenarios: hand-built `ast::Program` trees run through
//! `compile` + `execute` (no parser lives in this crate), with output
//! captured off a shared buffer rather than stdout.

use phpcore::ast::*;
use phpcore::error::RuntimeError;
use phpcore::value::Value;
use phpcore::{compile, execute, new_execution_context, set_include_callback};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

fn run_program(program: &Program) -> (Value, String) {
    let buf = SharedBuffer::default();
    let unit = compile(program).expect("compile");
    let mut ctx = new_execution_context(Box::new(buf.clone()));
    let result = execute(&unit, &mut ctx).expect("execute");
    (result, buf.text())
}

fn var(name: &str) -> Expr {
    Expr::Variable(name.to_string())
}

fn int(n: i64) -> Expr {
    Expr::Integer(n)
}

fn str_lit(s: &str) -> Expr {
    Expr::String(s.to_string())
}

fn assign(target: Expr, value: Expr) -> Expr {
    Expr::Assign { target: Box::new(target), op: AssignOp::Assign, value: Box::new(value), by_ref: false }
}

fn bin(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary { left: Box::new(left), op, right: Box::new(right) }
}

fn arg(value: Expr) -> Argument {
    Argument { name: None, value: Box::new(value), spread: false }
}

fn call_named(name: &str, args: Vec<Expr>) -> Expr {
    Expr::FunctionCall { callee: Box::new(Expr::String(name.to_string())), args: args.into_iter().map(arg).collect() }
}

fn param(name: &str) -> FunctionParam {
    FunctionParam { name: name.to_string(), type_hint: None, default: None, by_ref: false, is_variadic: false, promote_visibility: None, promote_readonly: false }
}

#[test]
fn increment_and_echo() {
    let program = Program {
        statements: vec![
            Stmt::Expression(assign(var("a"), int(1))),
            Stmt::Expression(Expr::Unary { op: UnaryOp::PostInc, expr: Box::new(var("a")) }),
            Stmt::Echo(vec![var("a")]),
        ],
    };
    let (_, output) = run_program(&program);
    assert_eq!(output, "2");
}

#[test]
fn recursive_fib_in_a_for_loop() {
    let fib_body = vec![
        Stmt::If {
            condition: bin(var("n"), BinaryOp::LessThan, int(2)),
            then_branch: vec![Stmt::Return(Some(var("n")))],
            elseif_branches: vec![],
            else_branch: None,
        },
        Stmt::Return(Some(bin(
            call_named("fib", vec![bin(var("n"), BinaryOp::Sub, int(1))]),
            BinaryOp::Add,
            call_named("fib", vec![bin(var("n"), BinaryOp::Sub, int(2))]),
        ))),
    ];
    let program = Program {
        statements: vec![
            Stmt::Function { name: "fib".to_string(), params: vec![param("n")], return_type: None, body: fib_body, by_ref_return: false },
            Stmt::For {
                init: vec![assign(var("i"), int(0))],
                condition: Some(bin(var("i"), BinaryOp::LessThan, int(10))),
                update: vec![Expr::Unary { op: UnaryOp::PostInc, expr: Box::new(var("i")) }],
                body: vec![Stmt::Echo(vec![call_named("fib", vec![var("i")])])],
            },
        ],
    };
    let (_, output) = run_program(&program);
    fn fib(n: i64) -> i64 {
        if n < 2 {
            n
        } else {
            fib(n - 1) + fib(n - 2)
        }
    }
    let expected: String = (0..10).map(|i| fib(i).to_string()).collect();
    assert_eq!(output, expected);
}

#[test]
fn try_catch_finally_runs_finally_after_a_caught_throw() {
    let exception_class = Stmt::Class {
        name: "Exception".to_string(),
        is_abstract: false,
        is_final: false,
        readonly: false,
        parent: None,
        interfaces: vec![],
        trait_uses: vec![],
        constants: vec![],
        properties: vec![Property {
            name: "message".to_string(),
            visibility: Visibility::Public,
            write_visibility: None,
            default: None,
            readonly: false,
            is_static: false,
            type_hint: None,
        }],
        methods: vec![Method {
            name: "__construct".to_string(),
            visibility: Visibility::Public,
            is_static: false,
            is_abstract: false,
            is_final: false,
            params: vec![param("message")],
            return_type: None,
            body: vec![Stmt::Expression(assign(
                Expr::PropertyAccess { object: Box::new(Expr::This), property: MemberName::Name("message".to_string()), nullsafe: false },
                var("message"),
            ))],
        }],
    };

    let try_catch = Stmt::TryCatch {
        try_body: vec![Stmt::Throw(Expr::New {
            class: ClassRef::Name("Exception".to_string()),
            args: vec![arg(str_lit("boom"))],
        })],
        catch_clauses: vec![CatchClause {
            exception_types: vec!["Exception".to_string()],
            variable: Some("e".to_string()),
            body: vec![Stmt::Echo(vec![bin(
                str_lit("caught:"),
                BinaryOp::Concat,
                Expr::PropertyAccess { object: Box::new(var("e")), property: MemberName::Name("message".to_string()), nullsafe: false },
            )])],
        }],
        finally_body: Some(vec![Stmt::Echo(vec![str_lit(":finally")])]),
    };

    let program = Program { statements: vec![exception_class, try_catch] };
    let (_, output) = run_program(&program);
    assert_eq!(output, "caught:boom:finally");
}

#[test]
fn closure_mutates_its_by_ref_capture() {
    let closure = Expr::Closure {
        params: vec![],
        uses: vec![ClosureUse { name: "x".to_string(), by_ref: true }],
        body: vec![Stmt::Expression(assign(var("x"), bin(var("x"), BinaryOp::Add, int(1))))],
        is_static: false,
    };
    let program = Program {
        statements: vec![
            Stmt::Expression(assign(var("x"), int(1))),
            Stmt::Expression(assign(var("inc"), closure)),
            Stmt::Expression(Expr::FunctionCall { callee: Box::new(var("inc")), args: vec![] }),
            Stmt::Echo(vec![var("x")]),
        ],
    };
    let (_, output) = run_program(&program);
    assert_eq!(output, "2");
}

#[test]
fn match_expression_picks_the_matching_arm() {
    let match_expr = Expr::Match {
        subject: Box::new(var("x")),
        arms: vec![
            MatchArm { conditions: Some(vec![int(1)]), body: Box::new(str_lit("one")) },
            MatchArm { conditions: Some(vec![int(2)]), body: Box::new(str_lit("two")) },
            MatchArm { conditions: None, body: Box::new(str_lit("other")) },
        ],
    };
    let program = Program {
        statements: vec![
            Stmt::Expression(assign(var("x"), int(2))),
            Stmt::Expression(assign(var("result"), match_expr)),
            Stmt::Echo(vec![var("result")]),
        ],
    };
    let (_, output) = run_program(&program);
    assert_eq!(output, "two");
}

#[test]
fn unset_array_key_then_append_picks_the_next_free_index() {
    let array_literal = Expr::Array(vec![
        ArrayElement { key: None, value: Box::new(int(10)), by_ref: false },
        ArrayElement { key: None, value: Box::new(int(20)), by_ref: false },
        ArrayElement { key: None, value: Box::new(int(30)), by_ref: false },
    ]);
    let program = Program {
        statements: vec![
            Stmt::Expression(assign(var("a"), array_literal)),
            Stmt::Unset(vec![Expr::ArrayAccess { array: Box::new(var("a")), index: Some(Box::new(int(1))) }]),
            Stmt::Expression(assign(
                Expr::ArrayAccess { array: Box::new(var("a")), index: None },
                int(99),
            )),
            Stmt::Echo(vec![Expr::Ternary {
                condition: Box::new(call_named("array_key_exists", vec![int(1), var("a")])),
                then_expr: Some(Box::new(str_lit("y"))),
                else_expr: Box::new(str_lit("n")),
            }]),
            Stmt::Echo(vec![str_lit("-")]),
            Stmt::Echo(vec![call_named("count", vec![var("a")])]),
        ],
    };
    let (_, output) = run_program(&program);
    assert_eq!(output, "n-3");
}

#[test]
fn goto_jumps_back_to_a_label() {
    let program = Program {
        statements: vec![
            Stmt::Expression(assign(var("i"), int(0))),
            Stmt::Label("start".to_string()),
            Stmt::Expression(Expr::Unary { op: UnaryOp::PostInc, expr: Box::new(var("i")) }),
            Stmt::If {
                condition: bin(var("i"), BinaryOp::LessThan, int(3)),
                then_branch: vec![Stmt::Goto("start".to_string())],
                elseif_branches: vec![],
                else_branch: None,
            },
            Stmt::Echo(vec![var("i")]),
        ],
    };
    let (_, output) = run_program(&program);
    assert_eq!(output, "3");
}

#[test]
fn constructor_property_promotion_assigns_fields() {
    let mut x_param = param("x");
    x_param.promote_visibility = Some(Visibility::Public);
    let mut y_param = param("y");
    y_param.promote_visibility = Some(Visibility::Public);

    let point_class = Stmt::Class {
        name: "Point".to_string(),
        is_abstract: false,
        is_final: false,
        readonly: false,
        parent: None,
        interfaces: vec![],
        trait_uses: vec![],
        constants: vec![],
        properties: vec![],
        methods: vec![Method {
            name: "__construct".to_string(),
            visibility: Visibility::Public,
            is_static: false,
            is_abstract: false,
            is_final: false,
            params: vec![x_param, y_param],
            return_type: None,
            body: vec![],
        }],
    };

    let program = Program {
        statements: vec![
            point_class,
            Stmt::Expression(assign(
                var("p"),
                Expr::New { class: ClassRef::Name("Point".to_string()), args: vec![arg(int(3)), arg(int(4))] },
            )),
            Stmt::Echo(vec![bin(
                Expr::PropertyAccess { object: Box::new(var("p")), property: MemberName::Name("x".to_string()), nullsafe: false },
                BinaryOp::Add,
                Expr::PropertyAccess { object: Box::new(var("p")), property: MemberName::Name("y".to_string()), nullsafe: false },
            )]),
        ],
    };
    let (_, output) = run_program(&program);
    assert_eq!(output, "7");
}

#[test]
fn include_once_runs_the_target_exactly_once() {
    let included = Program { statements: vec![Stmt::Echo(vec![str_lit("included;")])] };
    let included_unit = compile(&included).expect("compile included");
    let included_main = included_unit.main.expect("included program has a main body");

    let program = Program {
        statements: vec![
            Stmt::Include { path: str_lit("once.php"), is_require: false, once: true },
            Stmt::Include { path: str_lit("once.php"), is_require: false, once: true },
        ],
    };

    let buf = SharedBuffer::default();
    let unit = compile(&program).expect("compile");
    let mut ctx = new_execution_context(Box::new(buf.clone()));
    set_include_callback(
        &mut ctx,
        Box::new(move |path| if path == "once.php" { Some(included_main.clone()) } else { None }),
    );
    execute(&unit, &mut ctx).expect("execute");
    assert_eq!(buf.text(), "included;");
}

#[test]
fn require_of_an_unresolvable_path_is_fatal() {
    let program = Program { statements: vec![Stmt::Include { path: str_lit("missing.php"), is_require: true, once: false }] };
    let buf = SharedBuffer::default();
    let unit = compile(&program).expect("compile");
    let mut ctx = new_execution_context(Box::new(buf.clone()));
    set_include_callback(&mut ctx, Box::new(|_path| None));
    let err = execute(&unit, &mut ctx).expect_err("require of a missing file must fail");
    assert!(matches!(err, RuntimeError::IncludeFailed(ref p) if p == "missing.php"));
}

#[test]
fn array_map_via_the_default_registry_calls_back_into_an_arrow_function() {
    let arrow = Expr::ArrowFunction {
        params: vec![param("n")],
        body: Box::new(bin(var("n"), BinaryOp::Mul, int(2))),
        is_static: false,
    };
    let array_literal = Expr::Array(vec![
        ArrayElement { key: None, value: Box::new(int(1)), by_ref: false },
        ArrayElement { key: None, value: Box::new(int(2)), by_ref: false },
        ArrayElement { key: None, value: Box::new(int(3)), by_ref: false },
    ]);
    let program = Program {
        statements: vec![
            Stmt::Expression(assign(var("doubled"), call_named("array_map", vec![arrow, array_literal]))),
            Stmt::Echo(vec![call_named("implode", vec![str_lit(","), var("doubled")])]),
        ],
    };
    let (_, output) = run_program(&program);
    assert_eq!(output, "2,4,6");
}

#[test]
fn wait_group_joins_two_goroutines_before_wait_returns() {
    let task = Expr::Closure {
        params: vec![param("n")],
        uses: vec![ClosureUse { name: "wg".to_string(), by_ref: false }, ClosureUse { name: "results".to_string(), by_ref: true }],
        body: vec![
            Stmt::Expression(assign(
                Expr::ArrayAccess { array: Box::new(var("results")), index: None },
                bin(var("n"), BinaryOp::Mul, int(10)),
            )),
            Stmt::Expression(Expr::MethodCall {
                object: Box::new(var("wg")),
                method: MemberName::Name("Done".to_string()),
                args: vec![],
                nullsafe: false,
            }),
        ],
        is_static: false,
    };

    let program = Program {
        statements: vec![
            Stmt::Expression(assign(var("wg"), Expr::New { class: ClassRef::Name("WaitGroup".to_string()), args: vec![] })),
            Stmt::Expression(assign(var("results"), Expr::Array(vec![]))),
            Stmt::Expression(Expr::MethodCall {
                object: Box::new(var("wg")),
                method: MemberName::Name("Add".to_string()),
                args: vec![arg(int(2))],
                nullsafe: false,
            }),
            Stmt::Expression(assign(var("task"), task)),
            Stmt::Expression(Expr::Spawn { callee: Box::new(var("task")), args: vec![arg(int(1))] }),
            Stmt::Expression(Expr::Spawn { callee: Box::new(var("task")), args: vec![arg(int(2))] }),
            Stmt::Expression(Expr::MethodCall {
                object: Box::new(var("wg")),
                method: MemberName::Name("Wait".to_string()),
                args: vec![],
                nullsafe: false,
            }),
            Stmt::Echo(vec![call_named("count", vec![var("results")])]),
            Stmt::Echo(vec![str_lit("-")]),
            Stmt::Echo(vec![call_named(
                "array_reduce",
                vec![
                    var("results"),
                    Expr::ArrowFunction {
                        params: vec![param("carry"), param("item")],
                        body: Box::new(bin(var("carry"), BinaryOp::Add, var("item"))),
                        is_static: false,
                    },
                    int(0),
                ],
            )]),
        ],
    };
    let (_, output) = run_program(&program);
    assert_eq!(output, "2-30");
}
