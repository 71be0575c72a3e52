#[cfg(test)]
mod resolver_tests {
    use treelox as lox;

    use lox::error::LoxError;
    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::Scanner;
    use lox::token::Token;

    /// Scan, parse and resolve `source` against a fresh interpreter.
    fn resolve_source(source: &str) -> Result<(), Vec<LoxError>> {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .collect::<Result<_, _>>()
            .expect("scan failed");

        let statements = Parser::new(&tokens).parse().expect("parse failed");

        let mut interpreter = Interpreter::new();
        let mut resolver = Resolver::new(&mut interpreter);

        resolver.resolve(&statements)
    }

    fn assert_resolve_error(source: &str, needle: &str) {
        let errors = resolve_source(source).expect_err("expected resolve failure");

        assert!(
            errors.iter().any(|e| e.to_string().contains(needle)),
            "Expected an error containing '{}', got {:?}",
            needle,
            errors
        );
    }

    #[test]
    fn test_self_referential_initializer_is_rejected() {
        assert_resolve_error(
            "{ var a = a; }",
            "Cannot read local variable in its own initializer",
        );
    }

    #[test]
    fn test_redeclaration_in_same_scope_is_legal() {
        // Re-declaring rebinds; the old value stays readable in the new
        // initializer.
        assert!(resolve_source("{ var a = 1; var a = a + 1; }").is_ok());
    }

    #[test]
    fn test_shadowing_outer_variable_is_legal() {
        assert!(resolve_source("var a = 1; { var a = a; }").is_err());
        assert!(resolve_source("var a = 1; { var b = a; }").is_ok());
    }

    #[test]
    fn test_return_outside_function_is_rejected() {
        assert_resolve_error("return 1;", "'return' used outside of function");
    }

    #[test]
    fn test_return_inside_function_is_legal() {
        assert!(resolve_source("fun f() { return 1; }").is_ok());
    }

    #[test]
    fn test_return_value_from_initializer_is_rejected() {
        assert_resolve_error(
            "class A { init() { return 1; } }",
            "Cannot return a value from an initializer",
        );
    }

    #[test]
    fn test_bare_return_from_initializer_is_legal() {
        assert!(resolve_source("class A { init() { return; } }").is_ok());
    }

    #[test]
    fn test_this_outside_class_is_rejected() {
        assert_resolve_error("print this;", "Cannot use 'this' outside of a class");
        assert_resolve_error(
            "fun f() { return this; }",
            "Cannot use 'this' outside of a class",
        );
    }

    #[test]
    fn test_this_inside_method_is_legal() {
        assert!(resolve_source("class A { m() { return this; } }").is_ok());
    }

    #[test]
    fn test_super_outside_class_is_rejected() {
        assert_resolve_error("print super.m;", "Cannot use 'super' outside of a class");
    }

    #[test]
    fn test_super_without_superclass_is_rejected() {
        assert_resolve_error(
            "class A { m() { return super.m; } }",
            "Cannot use 'super' in a class with no superclass",
        );
    }

    #[test]
    fn test_super_with_superclass_is_legal() {
        let source = "class A { m() { return 1; } } class B < A { m() { return super.m(); } }";

        assert!(resolve_source(source).is_ok());
    }

    #[test]
    fn test_class_inheriting_from_itself_is_rejected() {
        assert_resolve_error("class A < A {}", "A class cannot inherit from itself");
    }

    #[test]
    fn test_multiple_errors_are_collected() {
        let errors =
            resolve_source("return 1;\nprint this;").expect_err("expected resolve failure");

        assert_eq!(errors.len(), 2, "Expected 2 errors, got {:?}", errors);
    }

    #[test]
    fn test_loop_bodies_resolve_in_enclosing_scope() {
        // Forced-brace bodies share the caller's scope; the body's `var` is
        // the same binding the next statement reads.
        let source = "{ while (false) { var inner = 1; } var after = 1; }";

        assert!(resolve_source(source).is_ok());
    }
}
