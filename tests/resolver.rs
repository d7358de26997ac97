#[cfg(test)]
mod resolver_tests {
    use lox_treewalk as lox;

    use lox::ast::{Expr, ExprId, Stmt};
    use lox::error::{Diagnostics, LoxError};
    use lox::lox::Lox;
    use lox::resolver::{Locals, Resolver};
    use pretty_assertions::assert_eq;

    /// Every variable-like reference in source order: `(name, id)`.
    fn references(statements: &[Stmt]) -> Vec<(String, ExprId)> {
        fn walk_expr(expr: &Expr, out: &mut Vec<(String, ExprId)>) {
            match expr {
                Expr::Literal(_) => {}
                Expr::Grouping(inner) | Expr::Unary { right: inner, .. } => walk_expr(inner, out),
                Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                    walk_expr(left, out);
                    walk_expr(right, out);
                }
                Expr::Variable { id, name } => out.push((name.lexeme.clone(), *id)),
                Expr::Assign { id, name, value } => {
                    walk_expr(value, out);
                    out.push((name.lexeme.clone(), *id));
                }
                Expr::Call {
                    callee, arguments, ..
                } => {
                    walk_expr(callee, out);
                    arguments.iter().for_each(|a| walk_expr(a, out));
                }
                Expr::Get { object, .. } => walk_expr(object, out),
                Expr::Set { object, value, .. } => {
                    walk_expr(object, out);
                    walk_expr(value, out);
                }
                Expr::This { id, keyword } => out.push((keyword.lexeme.clone(), *id)),
            }
        }

        fn walk_stmt(stmt: &Stmt, out: &mut Vec<(String, ExprId)>) {
            match stmt {
                Stmt::Expression(e) | Stmt::Print(e) => walk_expr(e, out),
                Stmt::Var { initializer, .. } => {
                    if let Some(e) = initializer {
                        walk_expr(e, out);
                    }
                }
                Stmt::Block(body) => body.iter().for_each(|s| walk_stmt(s, out)),
                Stmt::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    walk_expr(condition, out);
                    walk_stmt(then_branch, out);
                    if let Some(s) = else_branch {
                        walk_stmt(s, out);
                    }
                }
                Stmt::While { condition, body } => {
                    walk_expr(condition, out);
                    walk_stmt(body, out);
                }
                Stmt::Function(decl) => decl.body.iter().for_each(|s| walk_stmt(s, out)),
                Stmt::Return { value, .. } => {
                    if let Some(e) = value {
                        walk_expr(e, out);
                    }
                }
                Stmt::Class { methods, .. } => methods
                    .iter()
                    .flat_map(|m| m.body.iter())
                    .for_each(|s| walk_stmt(s, out)),
            }
        }

        let mut out = Vec::new();
        statements.iter().for_each(|s| walk_stmt(s, &mut out));
        out
    }

    fn resolve(source: &str) -> (Vec<Stmt>, Locals, Vec<String>) {
        let mut diagnostics = Diagnostics::new();
        let statements = Lox::compile(source, &mut diagnostics);
        assert!(!diagnostics.has_errors(), "source must parse");

        let locals = Resolver::new(&mut diagnostics).resolve(&statements);
        let errors = diagnostics.iter().map(LoxError::to_string).collect();

        (statements, locals, errors)
    }

    /// Depths of every reference, in source order; `None` means global.
    fn depths(source: &str) -> Vec<(String, Option<usize>)> {
        let (statements, locals, errors) = resolve(source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

        references(&statements)
            .into_iter()
            .map(|(name, id)| (name, locals.depth_of(id)))
            .collect()
    }

    fn errors(source: &str) -> Vec<String> {
        resolve(source).2
    }

    fn pair(name: &str, depth: Option<usize>) -> (String, Option<usize>) {
        (name.to_string(), depth)
    }

    #[test]
    fn test_globals_are_not_recorded() {
        assert_eq!(depths("var a = 1; print a; a = 2;"), [pair("a", None), pair("a", None)]);
    }

    #[test]
    fn test_nested_scope_distances() {
        let source = "
            var g = 0;
            {
                var a = 1;
                {
                    var b = 2;
                    print a + b + g;
                    a = b;
                }
            }";

        assert_eq!(
            depths(source),
            [
                pair("a", Some(1)),
                pair("b", Some(0)),
                pair("g", None),
                pair("b", Some(0)),
                pair("a", Some(1)),
            ]
        );
    }

    #[test]
    fn test_shadowing_binds_to_nearest_scope() {
        let source = "{ var a = 1; { var a = 2; print a; } print a; }";

        assert_eq!(depths(source), [pair("a", Some(0)), pair("a", Some(0))]);
    }

    #[test]
    fn test_closure_capture_distance() {
        let source = "
            fun outer() {
                var x = 1;
                fun inner() { return x; }
                return inner;
            }";

        assert_eq!(depths(source), [pair("x", Some(1)), pair("inner", Some(0))]);
    }

    #[test]
    fn test_this_resolves_through_class_scope() {
        let source = "class A { m() { return this; } }";

        assert_eq!(depths(source), [pair("this", Some(1))]);
    }

    #[test]
    fn test_initializer_reads_outer_binding() {
        let source = "{ var a = 1; { var a = a + 1; print a; } }";

        // The initializer's `a` is the outer one, one scope up.
        assert_eq!(depths(source), [pair("a", Some(1)), pair("a", Some(0))]);
    }

    #[test]
    fn test_initializer_falls_back_to_global() {
        assert_eq!(depths("var a = 1; { var a = a; }"), [pair("a", None)]);
    }

    #[test]
    fn test_self_initializer_without_outer_binding() {
        assert_eq!(
            errors("{ var a = a; }"),
            ["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_known_global_suppresses_self_initializer_error() {
        let mut diagnostics = Diagnostics::new();
        let statements = Lox::compile("{ var a = a; }", &mut diagnostics);

        let locals = Resolver::new(&mut diagnostics)
            .with_globals(["a"])
            .resolve(&statements);

        assert!(!diagnostics.has_errors());
        assert!(locals.is_empty());
    }

    #[test]
    fn test_duplicate_local() {
        assert_eq!(
            errors("{ var a = 1; var a = 2; }"),
            ["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );

        // Globals may be redeclared.
        assert!(errors("var a = 1; var a = 2;").is_empty());
    }

    #[test]
    fn test_duplicate_parameter() {
        assert_eq!(
            errors("fun f(a, a) {}"),
            ["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
    }

    #[test]
    fn test_top_level_return() {
        assert_eq!(
            errors("return 1;"),
            ["[line 1] Error at 'return': Can't return from top-level code."]
        );
    }

    #[test]
    fn test_this_outside_class() {
        assert_eq!(
            errors("print this;\nfun f() { return this; }"),
            [
                "[line 1] Error at 'this': Can't use 'this' outside of a class.",
                "[line 2] Error at 'this': Can't use 'this' outside of a class.",
            ]
        );
    }

    #[test]
    fn test_return_value_from_initializer() {
        assert_eq!(
            errors("class A { init() { return 1; } }"),
            ["[line 1] Error at 'return': Can't return a value from an initializer."]
        );

        // A bare return is allowed.
        assert!(errors("class A { init() { return; } }").is_empty());
    }

    #[test]
    fn test_all_errors_are_collected() {
        assert_eq!(errors("return;\n{ var x = 1; var x = 2; }\nprint this;").len(), 3);
    }
}
