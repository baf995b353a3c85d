mod common;

use common::{block, branch_target, compile, compile_err, function, instructions};
use velox::ir::{
    BinaryOpcode, Constant, FloatPredicate, Instruction, Linkage, Operand, Terminator, Type, Value,
};

fn binary_ops(function: &velox::ir::Function) -> Vec<BinaryOpcode> {
    instructions(function)
        .filter_map(|i| match i {
            Instruction::Binary { op, .. } => Some(*op),
            _ => None,
        })
        .collect()
}

#[test]
fn add_lowers_to_a_single_block() {
    let module = compile("int add(int a, int b) { return a + b; }");
    let add = function(&module, "add");

    assert_eq!(add.blocks.len(), 1);
    let entry = &add.blocks[0];
    assert_eq!(entry.label, "entry");
    assert_eq!(
        entry.instructions,
        [Instruction::Binary {
            dest: ".t0".into(),
            op: BinaryOpcode::Add,
            lhs: Value::local("a", Type::I32),
            rhs: Value::local("b", Type::I32),
        }]
    );
    assert_eq!(
        entry.terminator,
        Some(Terminator::Ret(Some(Value::local(".t0", Type::I32))))
    );
}

#[test]
fn while_loop_has_condition_body_and_exit_blocks() {
    let module = compile(
        "int main() {
            int i = 0;
            while (i < 3) {
                printf(i);
                i += 1;
            }
            return 0;
        }",
    );
    let main = function(&module, "main");

    let labels: Vec<&str> = main.blocks.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, ["entry", "while.cond.0", "while.body.0", "while.end.0"]);

    let body = block(main, "while.body.0");
    assert_eq!(branch_target(main, body).as_deref(), Some("while.cond.0"));
    let entry = block(main, "entry");
    assert_eq!(branch_target(main, entry).as_deref(), Some("while.cond.0"));

    let format = module.global(".fmt.0").expect("format string global");
    assert_eq!(format.linkage, Linkage::Private);
    assert_eq!(format.init, Constant::Bytes(b"%d\n\0".to_vec()));

    let printf = function(&module, "printf");
    assert!(printf.is_declaration());
    assert!(printf.variadic);
}

#[test]
fn operand_type_mismatch_is_rejected_for_every_operator() {
    for op in [
        "+", "-", "*", "/", "%", "<", ">", "<=", ">=", "==", "!=", "&&", "||", "**",
    ] {
        let source = format!("int main() {{ float f = 1.0; int x = 1 {op} f; return 0; }}");
        let err = compile_err(&source);
        assert_eq!(err.category(), "type", "operator {op}: {err}");
    }
}

#[test]
fn jumps_outside_loops_are_structural_errors() {
    let err = compile_err("int main() { break; return 0; }");
    assert_eq!(err.category(), "structural");
    let err = compile_err("int main() { continue; return 0; }");
    assert_eq!(err.category(), "structural");
}

#[test]
fn loop_context_does_not_outlive_its_loop() {
    let err = compile_err(
        "int main() {
            while (1) { break; }
            break;
            return 0;
        }",
    );
    assert_eq!(err.category(), "structural");
}

#[test]
fn break_and_continue_target_the_innermost_loop() {
    let module = compile(
        "int main() {
            int i = 0;
            while (i < 3) {
                int j = 0;
                while (j < 3) {
                    j += 1;
                    if (j == 2) { break; }
                    continue;
                }
                i += 1;
                if (i == 2) { continue; }
            }
            return i;
        }",
    );
    let main = function(&module, "main");

    let inner_break = block(main, "if.then.2");
    assert_eq!(branch_target(main, inner_break).as_deref(), Some("while.end.1"));
    let inner_continue = block(main, "if.end.2");
    assert_eq!(branch_target(main, inner_continue).as_deref(), Some("while.cond.1"));
    let outer_continue = block(main, "if.then.3");
    assert_eq!(branch_target(main, outer_continue).as_deref(), Some("while.cond.0"));
}

#[test]
fn sibling_loops_have_independent_exits() {
    let module = compile(
        "int main() {
            while (1) { break; }
            while (1) { break; }
            return 0;
        }",
    );
    let main = function(&module, "main");
    let first = block(main, "while.body.0");
    let second = block(main, "while.body.1");
    assert_eq!(branch_target(main, first).as_deref(), Some("while.end.0"));
    assert_eq!(branch_target(main, second).as_deref(), Some("while.end.1"));
}

#[test]
fn else_if_chain_terminates_every_block() {
    let module = compile(
        "int sign(int x) {
            if (x < 0) { return -1; } else if (x == 0) { return 0; } else { return 1; }
        }",
    );
    let sign = function(&module, "sign");
    assert!(sign.blocks.iter().all(|b| b.is_terminated()));
    for label in ["if.then.0", "if.then.1", "if.else.1"] {
        assert!(matches!(
            block(sign, label).terminator,
            Some(Terminator::Ret(Some(_)))
        ));
    }
    assert_eq!(
        branch_target(sign, block(sign, "if.end.1")).as_deref(),
        Some("if.end.0")
    );
}

#[test]
fn defines_become_global_constants() {
    let module = compile("#define LIMIT 10\nint main() { return LIMIT; }");
    let global = module.global("LIMIT").expect("LIMIT global");
    assert_eq!(global.linkage, Linkage::Internal);
    assert_eq!(global.init, Constant::Int(10));

    let main = function(&module, "main");
    assert_eq!(
        main.blocks[0].terminator,
        Some(Terminator::Ret(Some(Value::int(10))))
    );
}

#[test]
fn defines_are_read_only_and_integer_only() {
    let err = compile_err("#define LIMIT 10\nint main() { LIMIT = 3; return 0; }");
    assert_eq!(err.category(), "structural");

    let err = compile_err("#define NAME \"velox\"\nint main() { return 0; }");
    assert_eq!(err.category(), "structural");

    let err = compile_err("#include stdio\nint main() { return 0; }");
    assert_eq!(err.category(), "structural");
}

#[test]
fn unknown_names_are_name_errors() {
    let err = compile_err("int main() { return x; }");
    assert_eq!(err.category(), "name");
    assert!(err.message().contains("`x`"));

    let err = compile_err("int main() { return missing(1); }");
    assert_eq!(err.category(), "name");

    // Only functions declared earlier are callable.
    let err = compile_err("int main() { return later(); } int later() { return 1; }");
    assert_eq!(err.category(), "name");
}

#[test]
fn duplicate_functions_are_name_errors() {
    let err = compile_err("int f() { return 1; } int f() { return 2; }");
    assert_eq!(err.category(), "name");
}

#[test]
fn assigned_parameter_gets_a_slot_initialised_on_entry() {
    let module = compile(
        "int countdown(int n) {
            int steps = 0;
            while (n > 0) {
                n -= 1;
                steps += 1;
            }
            return steps;
        }",
    );
    let countdown = function(&module, "countdown");
    let entry = block(countdown, "entry");
    let slot = Value::local("n.addr", Type::I32.pointer_to());

    assert!(entry.instructions.contains(&Instruction::Store {
        value: Value::local("n", Type::I32),
        ptr: slot.clone(),
    }));
    let cond = block(countdown, "while.cond.0");
    assert!(cond
        .instructions
        .iter()
        .any(|i| matches!(i, Instruction::Load { ptr, .. } if *ptr == slot)));
}

#[test]
fn unassigned_parameters_stay_direct_values() {
    let module = compile("int twice(int n) { return n + n; }");
    let twice = function(&module, "twice");
    assert!(!instructions(twice).any(|i| matches!(i, Instruction::Alloca { .. })));
}

#[test]
fn recursion_and_calls_between_functions() {
    let module = compile(
        "int fact(int n) {
            if (n < 2) { return 1; }
            return n * fact(n - 1);
        }
        int main() { return fact(5); }",
    );
    let fact = function(&module, "fact");
    assert!(instructions(fact).any(
        |i| matches!(i, Instruction::Call { callee, .. } if callee == "fact")
    ));
    let main = function(&module, "main");
    assert!(instructions(main).any(
        |i| matches!(i, Instruction::Call { callee, args, .. } if callee == "fact" && args == &[Value::int(5)])
    ));
}

#[test]
fn call_arity_and_argument_types_are_checked() {
    let err = compile_err("int f(int a) { return a; } int main() { return f(1, 2); }");
    assert_eq!(err.category(), "type");

    let err = compile_err("int f(int a) { return a; } int main() { return f(1.5); }");
    assert_eq!(err.category(), "type");

    let err = compile_err("void f() { } int main() { int x = f(); return x; }");
    assert_eq!(err.category(), "type");
}

#[test]
fn void_calls_are_statements() {
    let module = compile("void hello() { printf(1); } int main() { hello(); return 0; }");
    let main = function(&module, "main");
    assert!(instructions(main).any(
        |i| matches!(i, Instruction::Call { dest: None, callee, .. } if callee == "hello")
    ));
    let hello = function(&module, "hello");
    assert_eq!(hello.blocks[0].terminator, Some(Terminator::Ret(None)));
}

#[test]
fn return_values_are_checked_against_the_function_type() {
    assert_eq!(compile_err("int f() { return 1.5; }").category(), "type");
    assert_eq!(compile_err("void f() { return 1; }").category(), "type");
    assert_eq!(compile_err("float f() { return 1; }").category(), "type");
}

#[test]
fn missing_return_defaults_to_zero() {
    let module = compile("int f() { int x = 1; } float g() { }");
    assert_eq!(
        function(&module, "f").blocks[0].terminator,
        Some(Terminator::Ret(Some(Value::int(0))))
    );
    assert_eq!(
        function(&module, "g").blocks[0].terminator,
        Some(Terminator::Ret(Some(Value::float(0.0))))
    );
}

#[test]
fn code_after_return_lands_in_a_dead_block() {
    let module = compile("int f() { return 1; return 2; }");
    let f = function(&module, "f");
    assert_eq!(f.blocks.len(), 2);
    assert_eq!(f.blocks[1].label, "dead.0");
    assert_eq!(
        f.blocks[1].terminator,
        Some(Terminator::Ret(Some(Value::int(2))))
    );
}

#[test]
fn unsupported_types_and_arrays() {
    let err = compile_err("int main() { char c = 1; return 0; }");
    assert_eq!(err.category(), "type");

    let err = compile_err("int main() { int[] xs = {1, 2}; return 0; }");
    assert_eq!(err.category(), "structural");

    let err = compile_err("int f(void v) { return 0; }");
    assert_eq!(err.category(), "type");
}

#[test]
fn exponent_is_not_lowered() {
    let err = compile_err("int main() { return 2 ** 3; }");
    assert_eq!(err.category(), "structural");
}

#[test]
fn integer_literals_must_fit_32_bits() {
    let err = compile_err("int main() { return 4294967296; }");
    assert_eq!(err.category(), "type");
}

#[test]
fn float_arithmetic_and_conditions() {
    let module = compile(
        "float half(float x) {
            if (x) { return -x / 2.0; }
            return 0.0;
        }",
    );
    let half = function(&module, "half");
    assert!(instructions(half).any(|i| matches!(
        i,
        Instruction::FCmp { pred: FloatPredicate::One, rhs, .. } if *rhs == Value::float(0.0)
    )));
    assert!(instructions(half).any(|i| matches!(i, Instruction::FNeg { .. })));
    assert!(binary_ops(half).contains(&BinaryOpcode::FDiv));
}

#[test]
fn compound_assignment_operators() {
    let module = compile(
        "int f() {
            int x = 6;
            x &= 3; x |= 8; x ^= 1; x <<= 2; x >>= 1;
            x *= 3; x /= 2; x %= 5; x -= 1;
            return x;
        }",
    );
    assert_eq!(
        binary_ops(function(&module, "f")),
        [
            BinaryOpcode::And,
            BinaryOpcode::Or,
            BinaryOpcode::Xor,
            BinaryOpcode::Shl,
            BinaryOpcode::AShr,
            BinaryOpcode::Mul,
            BinaryOpcode::SDiv,
            BinaryOpcode::SRem,
            BinaryOpcode::Sub,
        ]
    );

    let err = compile_err("int f() { float y = 1.0; y |= 2.0; return 0; }");
    assert_eq!(err.category(), "type");
}

#[test]
fn assignment_type_must_match_the_slot() {
    let err = compile_err("int f() { int x = 1; x = 2.5; return x; }");
    assert_eq!(err.category(), "type");
    let err = compile_err("int f() { float y = 1; return 0; }");
    assert_eq!(err.category(), "type");
}

#[test]
fn comparison_results_widen_to_int() {
    let module = compile("int f(int a) { int b = a < 3; return a == 1; }");
    let zexts = instructions(function(&module, "f"))
        .filter(|i| matches!(i, Instruction::ZExt { to: Type::I32, .. }))
        .count();
    assert_eq!(zexts, 2);
}

#[test]
fn logical_and_unary_operators() {
    let module = compile(
        "int f(int a, int b) {
            if (!a && !b || ~a == 0) { return 1; }
            return 0;
        }",
    );
    let ops = binary_ops(function(&module, "f"));
    assert!(ops.contains(&BinaryOpcode::And));
    assert!(ops.contains(&BinaryOpcode::Or));
    assert!(ops.contains(&BinaryOpcode::Xor));
}

#[test]
fn printf_formats_each_argument() {
    let module = compile("int main() { printf(1.5, 2 < 3, 7); return 0; }");
    let format = module.global(".fmt.0").expect("format string");
    assert_eq!(format.init, Constant::Bytes(b"%f%d%d\n\0".to_vec()));

    let main = function(&module, "main");
    let call = instructions(main)
        .find_map(|i| match i {
            Instruction::Call { callee, args, .. } if callee == "printf" => Some(args),
            _ => None,
        })
        .expect("printf call");
    assert_eq!(call.len(), 4);
    assert!(matches!(
        &call[0].operand,
        Operand::GlobalElement { global, .. } if global == ".fmt.0"
    ));
    assert_eq!(call[1], Value::float(1.5));
    assert_eq!(call[2].ty, Type::I32);
}

#[test]
fn each_printf_call_gets_its_own_format_string() {
    let module = compile("int main() { printf(1); printf(2.0); return 0; }");
    assert!(module.global(".fmt.0").is_some());
    assert_eq!(
        module.global(".fmt.1").map(|g| &g.init),
        Some(&Constant::Bytes(b"%f\n\0".to_vec()))
    );
    assert_eq!(
        module.functions.iter().filter(|f| f.name == "printf").count(),
        1
    );
}

#[test]
fn user_defined_printf_takes_precedence() {
    let module = compile("int printf(int x) { return x; } int main() { return printf(3); }");
    assert!(module.global(".fmt.0").is_none());
    let printf = function(&module, "printf");
    assert!(!printf.variadic);
    assert!(!printf.is_declaration());
}

#[test]
fn shadowing_declarations_get_unique_slots() {
    let module = compile("int f() { int x = 1; int x = 2; return x; }");
    let slots: Vec<&str> = instructions(function(&module, "f"))
        .filter_map(|i| match i {
            Instruction::Alloca { dest, .. } => Some(dest.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(slots, ["x", "x.1"]);
}

#[test]
fn target_triple_is_recorded() {
    let module = velox::compile("int main() { return 0; }", Some("x86_64-pc-linux-gnu")).unwrap();
    assert_eq!(module.target_triple.as_deref(), Some("x86_64-pc-linux-gnu"));
}

#[test]
fn local_named_entry_does_not_clash_with_entry_block() {
    let module = compile("int main() { int entry = 1; return entry; }");
    let main = function(&module, "main");
    assert_eq!(main.blocks[0].label, "entry");
    assert!(instructions(main).any(|i| i.dest() == Some("entry.1")));
}

#[test]
fn parameter_named_entry_is_renamed() {
    let module = compile("int f(int entry) { return entry + 1; }");
    let f = function(&module, "f");
    assert_eq!(f.params[0].name, "entry.1");
    assert_eq!(f.blocks[0].label, "entry");

    let module = compile("int g(int entry) { entry += 1; return entry; }");
    let g = function(&module, "g");
    assert!(instructions(g).any(|i| i.dest() == Some("entry.addr")));
}

#[test]
fn dead_block_labels_avoid_slot_names() {
    let module = compile(
        "int f(int a) { int dead = 1; int dead = 2; if (a > 0) { dead = 3; } return dead; dead = 4; }",
    );
    let f = function(&module, "f");
    assert!(instructions(f).any(|i| i.dest() == Some("dead.1")));
    assert!(f.block_by_label("dead.1.1").is_some());
}
