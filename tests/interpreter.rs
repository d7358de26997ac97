#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use lox_treewalk as lox;

    use lox::lox::{Lox, Outcome};
    use lox::value::Value;
    use pretty_assertions::assert_eq;

    /// Output sink the test keeps a handle to after giving it to a session.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        /// Drains what has been printed so far, one entry per line.
        fn take_lines(&self) -> Vec<String> {
            let bytes = std::mem::take(&mut *self.0.borrow_mut());
            String::from_utf8(bytes)
                .expect("utf-8 output")
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    fn session() -> (Lox, SharedBuf) {
        let buf = SharedBuf::default();
        (Lox::with_output(buf.clone()), buf)
    }

    /// Runs `source` to completion and returns the printed lines.
    fn run_ok(source: &str) -> Vec<String> {
        let (mut lox, buf) = session();

        match lox.run(source) {
            Outcome::Completed => buf.take_lines(),
            other => panic!("expected completion, got {:?}", other),
        }
    }

    /// Runs `source`, expecting a runtime error; returns printed lines and the error text.
    fn run_err(source: &str) -> (Vec<String>, String) {
        let (mut lox, buf) = session();

        match lox.run(source) {
            Outcome::RuntimeError(e) => (buf.take_lines(), e.to_string()),
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_and_number_format() {
        assert_eq!(
            run_ok("print 1 + 3; print 9 / 2; print -2 * 3; print 10 - 0.5;"),
            ["4", "4.5", "-6", "9.5"]
        );
    }

    #[test]
    fn test_string_concatenation_and_comparison() {
        assert_eq!(
            run_ok("print \"foo\" + \"bar\"; print 1 < 2; print 2 <= 1; print \"a\" == \"a\";"),
            ["foobar", "true", "false", "true"]
        );
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(
            run_ok("print !nil; print !0; print !\"\"; print !false; print nil == false;"),
            ["true", "false", "false", "true", "false"]
        );
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(
            run_ok("print nil or \"yes\"; print 1 and 2; print false and undefined;"),
            ["yes", "2", "false"]
        );
    }

    #[test]
    fn test_counter_closure() {
        let source = "
            fun makeCounter() {
                var i = 0;
                fun count() { i = i + 1; return i; }
                return count;
            }
            var c = makeCounter();
            print c(); print c(); print c();";

        assert_eq!(run_ok(source), ["1", "2", "3"]);
    }

    #[test]
    fn test_counters_are_independent() {
        let source = "
            fun makeCounter() {
                var i = 0;
                fun count() { i = i + 1; return i; }
                return count;
            }
            var a = makeCounter();
            var b = makeCounter();
            print a(); print a(); print b();";

        assert_eq!(run_ok(source), ["1", "2", "1"]);
    }

    #[test]
    fn test_closure_sees_declaration_scope_not_later_shadow() {
        let source = "
            var a = \"global\";
            {
                fun show() { print a; }
                show();
                var a = \"block\";
                show();
            }";

        assert_eq!(run_ok(source), ["global", "global"]);
    }

    #[test]
    fn test_shadowed_initializer_reads_outer() {
        assert_eq!(run_ok("var a = 1; { var a = a + 1; print a; }"), ["2"]);
    }

    #[test]
    fn test_control_flow() {
        let source = "
            var total = 0;
            for (var i = 0; i < 5; i = i + 1) {
                if (i == 2) total = total + 10; else total = total + i;
            }
            print total;
            var n = 3;
            while (n > 0) n = n - 1;
            print n;";

        assert_eq!(run_ok(source), ["18", "0"]);
    }

    #[test]
    fn test_recursion_and_early_return() {
        let source = "
            fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
            print fib(15);
            fun firstOver(limit) {
                for (var i = 0; ; i = i + 1) { if (i * i > limit) return i; }
            }
            print firstOver(50);";

        assert_eq!(run_ok(source), ["610", "8"]);
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(run_ok("fun f() {} print f(); print f;"), ["nil", "<fn f>"]);
    }

    #[test]
    fn test_classes_fields_and_methods() {
        let source = "
            class Point {
                init(x, y) { this.x = x; this.y = y; }
                sum() { return this.x + this.y; }
            }
            var p = Point(2, 3);
            print p.sum();
            p.x = 10;
            print p.sum();
            print Point;
            print p;";

        assert_eq!(run_ok(source), ["5", "13", "Point", "Point instance"]);
    }

    #[test]
    fn test_bound_method_keeps_receiver() {
        let source = "
            class Greeter {
                init(name) { this.name = name; }
                greet() { print \"hi \" + this.name; }
            }
            var g = Greeter(\"bob\").greet;
            g();";

        assert_eq!(run_ok(source), ["hi bob"]);
    }

    #[test]
    fn test_fields_shadow_methods() {
        let source = "
            class A { m() { return \"method\"; } }
            var a = A();
            a.m = \"field\";
            print a.m;";

        assert_eq!(run_ok(source), ["field"]);
    }

    #[test]
    fn test_initializer_returns_instance() {
        let source = "
            class A { init() { this.v = 1; return; } }
            var a = A();
            print a.init() == a;";

        assert_eq!(run_ok(source), ["true"]);
    }

    #[test]
    fn test_instances_compare_by_identity() {
        let source = "class A {} var a = A(); var b = A(); print a == a; print a == b;";

        assert_eq!(run_ok(source), ["true", "false"]);
    }

    #[test]
    fn test_clock_is_a_native_number() {
        assert_eq!(
            run_ok("print clock; var t = clock(); print t > 0;"),
            ["<native fn>", "true"]
        );
    }

    #[test]
    fn test_arity_mismatch_skips_body() {
        let (printed, error) = run_err("fun f(a, b) { print \"body\"; }\nf(1);");

        assert!(printed.is_empty());
        assert_eq!(error, "[line 2] Error at ')': Expected 2 arguments but got 1.");
    }

    #[test]
    fn test_class_arity_comes_from_init() {
        let (_, error) = run_err("class A { init(x) {} } A();");

        assert_eq!(error, "[line 1] Error at ')': Expected 1 arguments but got 0.");
    }

    #[test]
    fn test_operand_type_errors() {
        assert_eq!(
            run_err("print \"10\" / 2;").1,
            "[line 1] Error at '/': Operands must be numbers."
        );
        assert_eq!(
            run_err("print -\"x\";").1,
            "[line 1] Error at '-': Operand must be a number."
        );
        assert_eq!(
            run_err("print 1 + \"x\";").1,
            "[line 1] Error at '+': Operands must be two numbers or two strings."
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(run_err("print 5 / 0;").1, "[line 1] Error at '/': Division by zero.");
    }

    #[test]
    fn test_undefined_names() {
        assert_eq!(
            run_err("print missing;").1,
            "[line 1] Error at 'missing': Undefined variable 'missing'."
        );
        assert_eq!(
            run_err("missing = 1;").1,
            "[line 1] Error at 'missing': Undefined variable 'missing'."
        );
        assert_eq!(
            run_err("class A {} print A().nope;").1,
            "[line 1] Error at 'nope': Undefined property 'nope'."
        );
    }

    #[test]
    fn test_property_access_on_non_instances() {
        assert_eq!(
            run_err("var x = 1; print x.y;").1,
            "[line 1] Error at 'y': Only instances have properties."
        );
        assert_eq!(
            run_err("var x = 1; x.y = 2;").1,
            "[line 1] Error at 'y': Only instances have fields."
        );
    }

    #[test]
    fn test_calling_non_callable() {
        assert_eq!(
            run_err("\"not a function\"();").1,
            "[line 1] Error at ')': Can only call functions and classes."
        );
    }

    #[test]
    fn test_runtime_error_keeps_earlier_output() {
        let (printed, error) = run_err("print 1;\nprint nil + 1;\nprint 3;");

        assert_eq!(printed, ["1"]);
        assert!(error.starts_with("[line 2]"));
    }

    #[test]
    fn test_unbounded_recursion_reports_stack_overflow() {
        let (_, error) = run_err("fun f() { f(); }\nf();");

        assert_eq!(error, "[line 1] Error at ')': Stack overflow.");
    }

    #[test]
    fn test_static_errors_prevent_execution() {
        let (mut lox, buf) = session();

        match lox.run("print 1;\nprint ;\n{ var a = 1; var a = 2; }") {
            Outcome::StaticErrors(errors) => assert_eq!(errors.len(), 1),
            other => panic!("expected static errors, got {:?}", other),
        }

        assert!(buf.take_lines().is_empty());

        // Resolve errors are found once the unit parses.
        match lox.run("print 1;\n{ var a = 1; var a = 2; }") {
            Outcome::StaticErrors(errors) => assert_eq!(
                errors[0].to_string(),
                "[line 2] Error at 'a': Already a variable with this name in this scope."
            ),
            other => panic!("expected static errors, got {:?}", other),
        }

        assert!(buf.take_lines().is_empty());
    }

    #[test]
    fn test_session_state_persists_across_units() {
        let (mut lox, buf) = session();

        assert!(lox.run("var count = 1;").is_completed());
        assert!(lox.run("fun bump() { count = count + 1; return count; }").is_completed());
        assert!(lox.run("print bump();").is_completed());

        assert_eq!(buf.take_lines(), ["2"]);
    }

    #[test]
    fn test_runtime_error_does_not_end_session() {
        let (mut lox, buf) = session();

        assert!(lox.run("var x = 5;").is_completed());
        assert!(matches!(lox.run("{ var y = 1; print x / 0; }"), Outcome::RuntimeError(_)));

        // The failed unit's block scope is gone; globals survive.
        assert!(lox.run("print x;").is_completed());
        assert!(matches!(lox.run("print y;"), Outcome::RuntimeError(_)));

        assert_eq!(buf.take_lines(), ["5"]);
    }

    #[test]
    fn test_closures_from_earlier_units_keep_working() {
        let (mut lox, buf) = session();

        assert!(lox
            .run("fun make() { var n = 0; fun inc() { n = n + 1; return n; } return inc; }")
            .is_completed());
        assert!(lox.run("var inc = make();").is_completed());
        assert!(lox.run("print inc();").is_completed());
        assert!(lox.run("print inc();").is_completed());

        assert_eq!(buf.take_lines(), ["1", "2"]);
    }

    #[test]
    fn test_repl_self_reference_uses_existing_global() {
        let (mut lox, buf) = session();

        assert!(lox.run("var a = 10;").is_completed());
        assert!(lox.run("{ var a = a * 2; print a; }").is_completed());

        assert_eq!(buf.take_lines(), ["20"]);
    }

    #[test]
    fn test_evaluate_single_expression() {
        let (mut lox, _) = session();

        assert_eq!(lox.evaluate("1 + 2 * 3").ok(), Some(Value::Number(7.0)));
        assert_eq!(
            lox.evaluate("\"a\" + \"b\"").ok(),
            Some(Value::String("ab".into()))
        );

        assert!(matches!(lox.evaluate("1 +"), Err(Outcome::StaticErrors(_))));
        assert!(matches!(lox.evaluate("-nil"), Err(Outcome::RuntimeError(_))));
    }
}
