#[cfg(test)]
mod comprehensive_tests {
    use crate::ast::*;
    use crate::{parse_expression, parse_function, parse_program, sanitize_source, ParseError};

    #[test]
    fn test_parse_typical_method_sources() {
        let sources = [
            "() => setState('count', count + 1)",
            "(e) => setState('query', e.target.value)",
            "async_ => { const next = [...items, { id: Date.now(), text: draft }]; setState('items', next); setState('draft', ''); }",
            "(id) => setState('items', items.filter(item => item.id !== id))",
            "function (a, b = 2, ...rest) { return a + b + rest.length; }",
            "() => { if (!user) { return; } else if (user.admin) { notify('admin') } }",
            "() => { try { risky() } catch (err) { console.error(err.message) } finally { done = true } }",
        ];

        for source in sources {
            let result = parse_function(source);
            assert!(result.is_ok(), "{} failed: {:?}", source, result.err());
        }
    }

    #[test]
    fn test_sanitized_typescript_parses() {
        let raw = r#"() => { const total: number = items.reduce((sum, x) => sum + (x as any), 0); setState(\'total\', total); }"#;
        let cleaned = sanitize_source(raw);
        assert!(parse_function(&cleaned).is_ok(), "cleaned: {}", cleaned);
        // Unsanitized annotation is not part of the language
        assert!(parse_function(raw).is_err());
    }

    #[test]
    fn test_parse_expression_forms() {
        let sources = [
            "user.name",
            "items.length > 0 ? `${items.length} items` : 'empty'",
            "a ?? b || c",
            "typeof value === 'string'",
            "user?.address?.city",
            "matrix[0][1]",
            "new Date(ts).getFullYear()",
            "Math.max(...scores)",
            "{ ...defaults, label: title }",
            "-x ** 2",
            "!done && count >= 3",
            "JSON.stringify({ a: [1, 2, { b: null }] })",
        ];

        for source in sources {
            // Object literals at the top level need no parentheses for `$exp`
            let result = parse_expression(source);
            assert!(result.is_ok(), "{} failed: {:?}", source, result.err());
        }
    }

    #[test]
    fn test_member_chain_shape() {
        let expr = parse_expression("a.b[c](d)").unwrap();
        match expr {
            Expr::Call {
                callee, arguments, ..
            } => {
                assert_eq!(arguments.len(), 1);
                assert!(matches!(*callee, Expr::Index { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_keyword_property_names() {
        let expr = parse_expression("options.default + item.new").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                operator: BinaryOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn test_destructuring_declarations() {
        let program = parse_program("const { a, b: renamed } = obj; let [first, , third] = list;").unwrap();
        match &program[0] {
            Stmt::VarDecl { declarations, kind } => {
                assert_eq!(*kind, VarKind::Const);
                assert_eq!(declarations[0].0.bound_names(), vec!["a", "renamed"]);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &program[1] {
            Stmt::VarDecl { declarations, .. } => {
                assert_eq!(declarations[0].0.bound_names(), vec!["first", "third"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_compound_assignment_and_update() {
        let program = parse_program("total += price * qty; i++; --j;").unwrap();
        assert!(matches!(
            program[0],
            Stmt::Expression(Expr::Assign {
                operator: AssignOp::Add,
                ..
            })
        ));
        assert!(matches!(
            program[1],
            Stmt::Expression(Expr::Update { prefix: false, .. })
        ));
        assert!(matches!(
            program[2],
            Stmt::Expression(Expr::Update { prefix: true, .. })
        ));
    }

    #[test]
    fn test_error_reporting() {
        let err = parse_expression("count +").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));

        let err = parse_expression("(a, b").unwrap_err();
        assert!(err.to_string().contains("expected"));

        let err = parse_function("() => { let = 1 }").unwrap_err();
        assert!(err.span().is_some());
    }

    #[test]
    fn test_unterminated_template_substitution() {
        assert!(parse_expression("`total: ${count`").is_err());
    }
}
