#[cfg(test)]
mod parser_tests {
    use pretty_assertions::assert_eq;

    use rox::ast::{Expr, ExprId, ExprIds, Stmt};
    use rox::ast_printer::AstPrinter;
    use rox::error::Diagnostics;
    use rox::parser::Parser;
    use rox::scanner::scan;

    fn parse(source: &str) -> (Vec<Option<Stmt>>, Vec<String>) {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, &mut diagnostics);
        let statements = Parser::new(tokens, &mut diagnostics).parse();

        (statements, diagnostics.messages())
    }

    /// Parse `source`, insist it is error-free, and print it.
    fn printed(source: &str) -> String {
        let (statements, errors) = parse(source);
        assert_eq!(errors, Vec::<String>::new(), "unexpected errors for {source:?}");

        let statements: Vec<Stmt> = statements.into_iter().flatten().collect();
        AstPrinter.print_program(&statements)
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(printed("1 + 2 * 3;"), "(; (+ 1.0 (* 2.0 3.0)))");
        assert_eq!(printed("(1 + 2) * 3;"), "(; (* (group (+ 1.0 2.0)) 3.0))");
        assert_eq!(printed("1 - 2 - 3;"), "(; (- (- 1.0 2.0) 3.0))");
        assert_eq!(printed("-a - -b;"), "(; (- (- a) (- b)))");
        assert_eq!(printed("!true == false;"), "(; (== (! true) false))");
        assert_eq!(printed("1 < 2 == 3 >= 4;"), "(; (== (< 1.0 2.0) (>= 3.0 4.0)))");
    }

    #[test]
    fn test_assignment_and_logic() {
        assert_eq!(printed("a = b = 1;"), "(; (= a (= b 1.0)))");
        assert_eq!(printed("a or b and c;"), "(; (or a (and b c)))");
        assert_eq!(printed("obj.field = 3;"), "(; (.= obj field 3.0))");
        assert_eq!(printed("a.b.c();"), "(; (call (. (. a b) c)))");
    }

    #[test]
    fn test_conditional_and_comma() {
        assert_eq!(printed("a ? b : c ? d : e;"), "(; (?: a b (?: c d e)))");
        assert_eq!(printed("1, 2 == 3;"), "(; (, 1.0 (== 2.0 3.0)))");
        assert_eq!(printed("a, b, c;"), "(; (, (, a b) c))");
        assert_eq!(printed("x ? 1, 2 : 3;"), "(; (?: x (, 1.0 2.0) 3.0))");
    }

    #[test]
    fn test_comma_is_disabled_inside_arguments() {
        assert_eq!(printed("f(1, 2);"), "(; (call f 1.0 2.0))");
        assert_eq!(printed("f((1, 2));"), "(; (call f (group (, 1.0 2.0))))");
        assert_eq!(
            printed("f(fun () { 1, 2; });"),
            "(; (call f (fun () (; (, 1.0 2.0)))))"
        );
    }

    #[test]
    fn test_for_loop_desugars_to_while() {
        assert_eq!(
            printed("for (var i = 0; i < 3; i = i + 1) print i;"),
            "(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"
        );
        assert_eq!(printed("for (;;) break;"), "(while true (break))");
    }

    #[test]
    fn test_declarations() {
        assert_eq!(printed("var a;"), "(var a)");
        assert_eq!(
            printed("fun add(a, b) { return a + b; }"),
            "(fun add(a b) (return (+ a b)))"
        );
        assert_eq!(
            printed("var f = fun (a) { return a; };"),
            "(var f (fun (a) (return a)))"
        );
        assert_eq!(
            printed("class B < A { init(x) { this.x = x; } m() { return super.m(); } }"),
            "(class B < A (fun init(x) (; (.= this x x))) (fun m() (return (call (super m)))))"
        );
        assert_eq!(
            printed("if (a) print 1; else { print 2; }"),
            "(if a (print 1.0) (block (print 2.0)))"
        );
    }

    #[test]
    fn test_break_outside_loop_is_reported() {
        let (_, errors) = parse("break;");
        assert_eq!(
            errors,
            vec!["[line 1] Error at 'break': Cannot use 'break' keyword outside of loop."]
        );

        // A function body inside a loop is not itself inside the loop.
        let (_, errors) = parse("while (true) { fun f() { break; } }");
        assert_eq!(errors.len(), 1);

        let (_, errors) = parse("while (true) { if (x) break; }");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_invalid_assignment_target() {
        let (statements, errors) = parse("1 = 2;");

        assert_eq!(errors, vec!["[line 1] Error at '=': Invalid assignment target."]);
        assert!(statements[0].is_some());
    }

    #[test]
    fn test_missing_left_operand_still_builds_binary() {
        let (statements, errors) = parse("+ 1;");

        assert_eq!(
            errors,
            vec!["[line 1] Error at '+': Binary operator without left-hand side."]
        );

        let statements: Vec<Stmt> = statements.into_iter().flatten().collect();
        assert_eq!(
            AstPrinter.print_program(&statements),
            "(; (+ <missing> 1.0))"
        );
    }

    #[test]
    fn test_recovery_reports_every_bad_declaration() {
        let (statements, errors) = parse("var = 1;\nprint 2;\nvar x = ;\nprint 3");

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at '=': Expect variable name.",
                "[line 3] Error at ';': Expect expression.",
                "[line 4] Error at end: Expect ';' after value.",
            ]
        );
        assert_eq!(statements.len(), 4);
        assert!(statements[0].is_none());
        assert!(matches!(statements[1], Some(Stmt::Print { .. })));
        assert!(statements[2].is_none());
        assert!(statements[3].is_none());
    }

    #[test]
    fn test_argument_limit_is_not_fatal() {
        let arguments: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", arguments.join(", "));

        let (statements, errors) = parse(&source);

        assert_eq!(
            errors,
            vec!["[line 1] Error at '255': Can't have more than 255 arguments."]
        );
        assert!(statements[0].is_some());
    }

    #[test]
    fn test_ids_continue_across_parsers() {
        let mut diagnostics = Diagnostics::new();

        let tokens = scan("a;", &mut diagnostics);
        let mut first = Parser::new(tokens, &mut diagnostics).with_ids(ExprIds::new());
        let first_program = first.parse();
        let ids = first.ids();

        let tokens = scan("a;", &mut diagnostics);
        let second_program = Parser::new(tokens, &mut diagnostics).with_ids(ids).parse();

        let id_of = |program: &[Option<Stmt>]| match &program[0] {
            Some(Stmt::Expression(Expr::Variable { id, .. })) => *id,
            other => panic!("unexpected statement {other:?}"),
        };

        assert_eq!(id_of(&first_program), ExprId(0));
        assert_eq!(id_of(&second_program), ExprId(1));
    }
}
