#[cfg(test)]
mod parser_tests {
    use treelox as lox;

    use lox::ast_printer::AstPrinter;
    use lox::error::LoxError;
    use lox::expr::Expr;
    use lox::parser::Parser;
    use lox::scanner::Scanner;
    use lox::stmt::Stmt;
    use lox::token::Token;

    fn parse_source(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .collect::<Result<_, _>>()
            .expect("scan failed");

        Parser::new(&tokens).parse()
    }

    /// Parse `source` as a single expression statement and render its tree.
    fn parse_expr(source: &str) -> String {
        let statements = parse_source(&format!("{};", source)).expect("parse failed");

        assert_eq!(statements.len(), 1);

        match &statements[0] {
            Stmt::Expression(expr) => AstPrinter::print(expr),
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(parse_expr("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(parse_expr("(1 + 2) * 3"), "(* (group (+ 1.0 2.0)) 3.0)");
        assert_eq!(parse_expr("-1 - -2"), "(- (- 1.0) (- 2.0))");
    }

    #[test]
    fn test_comma_is_left_associative() {
        assert_eq!(parse_expr("1, 2, 3"), "(, (, 1.0 2.0) 3.0)");
    }

    #[test]
    fn test_ternary_is_right_associative() {
        assert_eq!(
            parse_expr("true ? 1 : false ? 2 : 3"),
            "(?: true 1.0 (?: false 2.0 3.0))"
        );
    }

    #[test]
    fn test_ternary_binds_tighter_than_comma() {
        // `1, true ? 2 : 3` groups as `1, (true ? 2 : 3)`
        assert_eq!(parse_expr("1, true ? 2 : 3"), "(, 1.0 (?: true 2.0 3.0))");
    }

    #[test]
    fn test_assignment_binds_below_comma() {
        assert_eq!(parse_expr("a = 1, 2"), "(= a (, 1.0 2.0))");
    }

    #[test]
    fn test_call_arguments_are_separated_by_comma() {
        assert_eq!(parse_expr("f(1, 2)"), "(call f 1.0 2.0)");

        // A parenthesized comma expression is a single argument.
        assert_eq!(parse_expr("f((1, 2))"), "(call f (group (, 1.0 2.0)))");
    }

    #[test]
    fn test_property_chain_and_super() {
        assert_eq!(parse_expr("a.b.c"), "(. (. a b) c)");
        assert_eq!(parse_expr("a.b = 1"), "(.= a b 1.0)");
    }

    #[test]
    fn test_invalid_assignment_target() {
        let errors = parse_source("1 = 2;").expect_err("expected parse failure");

        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("Invalid assignment target")));
    }

    #[test]
    fn test_if_body_requires_braces() {
        let errors = parse_source("if (true) print 1;").expect_err("expected parse failure");

        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("Expected '{' before if body")));
    }

    #[test]
    fn test_while_body_requires_braces() {
        assert!(parse_source("while (true) print 1;").is_err());
        assert!(parse_source("while (true) { print 1; }").is_ok());
    }

    #[test]
    fn test_free_block_is_scoped_forced_body_is_not() {
        let statements = parse_source("{ var a = 1; }").expect("parse failed");
        assert!(matches!(statements[0], Stmt::ScopedBlock(_)));

        let statements = parse_source("if (true) { var a = 1; }").expect("parse failed");
        match &statements[0] {
            Stmt::If(_, then_branch, _) => {
                assert!(matches!(**then_branch, Stmt::Block(_)));
            }
            other => panic!("Expected if statement, got {:?}", other),
        }
    }

    #[test]
    fn test_else_if_chains_without_extra_braces() {
        let source = "if (a) { print 1; } else if (b) { print 2; } else { print 3; }";

        let statements = parse_source(source).expect("parse failed");

        match &statements[0] {
            Stmt::If(_, _, Some(else_branch)) => {
                assert!(matches!(**else_branch, Stmt::If(..)));
            }
            other => panic!("Expected if/else-if, got {:?}", other),
        }
    }

    #[test]
    fn test_for_desugars_to_while() {
        let statements =
            parse_source("for (var i = 0; i < 3; i = i + 1) { print i; }").expect("parse failed");

        assert_eq!(statements.len(), 1);

        // Outer: plain block holding the initializer and the loop.
        let Stmt::Block(parts) = &statements[0] else {
            panic!("Expected desugared block, got {:?}", statements[0]);
        };

        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[0], Stmt::Var(..)));

        // Inner: while whose body carries the original body plus increment.
        let Stmt::While(_, body) = &parts[1] else {
            panic!("Expected while loop, got {:?}", parts[1]);
        };

        let Stmt::Block(body_parts) = &**body else {
            panic!("Expected block body, got {:?}", body);
        };

        assert_eq!(body_parts.len(), 2);
        assert!(matches!(body_parts[0], Stmt::Block(_)));
        assert!(matches!(body_parts[1], Stmt::Expression(Expr::Assign { .. })));
    }

    #[test]
    fn test_for_without_clauses() {
        let statements = parse_source("for (;;) { print 1; }").expect("parse failed");

        // No initializer, no increment: just the while with a `true` condition.
        match &statements[0] {
            Stmt::While(condition, _) => {
                assert_eq!(AstPrinter::print(condition), "true");
            }
            other => panic!("Expected bare while, got {:?}", other),
        }
    }

    #[test]
    fn test_class_declaration_with_superclass() {
        let statements =
            parse_source("class B < A { m(x) { return x; } }").expect("parse failed");

        match &statements[0] {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                assert_eq!(name.lexeme, "B");
                assert!(matches!(superclass, Some(Expr::Variable { .. })));
                assert_eq!(methods.len(), 1);
                assert_eq!(methods[0].name.lexeme, "m");
                assert_eq!(methods[0].params.len(), 1);
            }
            other => panic!("Expected class declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_synchronization_collects_multiple_errors() {
        // Three statements, first and third broken; recovery at the `;`
        // boundary lets the parser report both.
        let errors =
            parse_source("var = 1;\nprint 2;\nvar x = ;").expect_err("expected parse failure");

        assert!(errors.len() >= 2, "Expected at least 2 errors, got {:?}", errors);
    }

    #[test]
    fn test_error_at_end_of_input() {
        let errors = parse_source("print 1").expect_err("expected parse failure");

        assert!(errors.iter().any(|e| e.to_string().contains("at end")));
    }

    #[test]
    fn test_expression_ids_are_unique_across_base() {
        let tokens: Vec<Token> = Scanner::new(b"a; b;")
            .collect::<Result<_, _>>()
            .expect("scan failed");

        let mut first = Parser::new(&tokens);
        first.parse().expect("parse failed");

        let base = first.next_id();
        assert!(base >= 2);

        let mut second = Parser::with_base_id(&tokens, base);
        second.parse().expect("parse failed");

        assert!(second.next_id() > base);
    }
}
