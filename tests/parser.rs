#[cfg(test)]
mod parser_tests {
    use lox_treewalk as lox;

    use lox::ast::{Expr, LiteralValue, Stmt};
    use lox::ast_printer::AstPrinter;
    use lox::error::{Diagnostics, LoxError};
    use lox::lox::Lox;
    use lox::parser::Parser;
    use lox::scanner::Scanner;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> (Vec<Stmt>, Vec<String>) {
        let mut diagnostics = Diagnostics::new();
        let statements = Lox::compile(source, &mut diagnostics);
        let errors = diagnostics.iter().map(LoxError::to_string).collect();

        (statements, errors)
    }

    fn print_expr(source: &str) -> String {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
        let expr = Parser::new(&tokens, &mut diagnostics)
            .parse_expression()
            .expect("expression parses");

        assert!(!diagnostics.has_errors());

        AstPrinter.print(&expr)
    }

    fn print_program(source: &str) -> Vec<String> {
        let (statements, errors) = parse(source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

        statements.iter().map(|s| AstPrinter.print_stmt(s)).collect()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(print_expr("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(print_expr("(1 + 2) * 3"), "(* (group (+ 1 2)) 3)");
        assert_eq!(print_expr("-1 - -2"), "(- (- 1) (- 2))");
        assert_eq!(print_expr("1 < 2 == !false"), "(== (< 1 2) (! false))");
        assert_eq!(print_expr("a or b and c"), "(or a (and b c))");
    }

    #[test]
    fn test_left_associative_arithmetic() {
        assert_eq!(print_expr("8 - 4 - 2"), "(- (- 8 4) 2)");
        assert_eq!(print_expr("8 / 4 / 2"), "(/ (/ 8 4) 2)");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(print_expr("a = b = 1"), "(= a (= b 1))");
        assert_eq!(print_expr("a.b.c = 2"), "(= (. (. a b) c) 2)");
    }

    #[test]
    fn test_call_chains() {
        assert_eq!(print_expr("f(1)(2).g(x, y)"), "(call (. (call (call f 1) 2) g) x y)");
    }

    #[test]
    fn test_for_desugars_to_while() {
        assert_eq!(
            print_program("for (var i = 0; i < 3; i = i + 1) print i;"),
            ["(block (var i = 0) (while (< i 3) (block (print i) (; (= i (+ i 1))))))"]
        );

        assert_eq!(print_program("for (;;) print 1;"), ["(while true (print 1))"]);
    }

    #[test]
    fn test_dangling_else_binds_to_nearest_if() {
        let (statements, errors) = parse("if (a) if (b) print 1; else print 2;");
        assert!(errors.is_empty());

        let Stmt::If {
            then_branch,
            else_branch,
            ..
        } = &statements[0]
        else {
            panic!("expected if");
        };

        assert!(else_branch.is_none());
        assert!(matches!(
            then_branch.as_ref(),
            Stmt::If {
                else_branch: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_declarations() {
        assert_eq!(
            print_program("fun add(a, b) { return a + b; } class Point { init(x) { this.x = x; } }"),
            [
                "(fun add(a b) (return (+ a b)))",
                "(class Point (method init(x) (; (= (. this x) x))))"
            ]
        );
    }

    #[test]
    fn test_literals() {
        let (statements, _) = parse("print \"hi\"; print nil; print 2.5;");

        let literals: Vec<&LiteralValue> = statements
            .iter()
            .map(|s| match s {
                Stmt::Print(Expr::Literal(value)) => value,
                other => panic!("unexpected {:?}", other),
            })
            .collect();

        assert_eq!(
            literals,
            [
                &LiteralValue::Str("hi".into()),
                &LiteralValue::Nil,
                &LiteralValue::Number(2.5)
            ]
        );
    }

    #[test]
    fn test_invalid_assignment_target_is_not_fatal() {
        let (statements, errors) = parse("1 + 2 = 3; print 4;");

        assert_eq!(errors, ["[line 1] Error at '=': Invalid assignment target."]);
        // Both statements are still produced.
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_synchronize_reports_independent_errors() {
        let (statements, errors) = parse("var = 1;\nprint 2;\nprint (3;\nvar ok = 4;");

        assert_eq!(
            errors,
            [
                "[line 1] Error at '=': Expect variable name.",
                "[line 3] Error at ';': Expect ')' after expression.",
            ]
        );

        let printed: Vec<String> = statements.iter().map(|s| AstPrinter.print_stmt(s)).collect();
        assert_eq!(printed, ["(print 2)", "(var ok = 4)"]);
    }

    #[test]
    fn test_error_at_end() {
        let (_, errors) = parse("print 1");

        assert_eq!(errors, ["[line 1] Error at end: Expect ';' after value."]);
    }

    #[test]
    fn test_too_many_arguments_still_parses() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let (statements, errors) = parse(&source);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].ends_with("Can't have more than 255 arguments."));

        match &statements[0] {
            Stmt::Expression(Expr::Call { arguments, .. }) => assert_eq!(arguments.len(), 256),
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_errors_inside_block_do_not_end_block() {
        let (statements, errors) = parse("{ print ; print 1; }");

        assert_eq!(errors, ["[line 1] Error at ';': Expect expression."]);
        assert_eq!(
            statements.iter().map(|s| AstPrinter.print_stmt(s)).collect::<Vec<_>>(),
            ["(block (print 1))"]
        );
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let depth = 5_000;
        let source = format!("print {}1{};", "(".repeat(depth), ")".repeat(depth));

        let (statements, errors) = parse(&source);

        assert!(errors.is_empty());
        assert_eq!(statements.len(), 1);
    }
}
