#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;
    use std::thread;

    use pretty_assertions::assert_eq;

    use rox::ast::Stmt;
    use rox::error::{Diagnostics, RuntimeError};
    use rox::interpreter::Interpreter;
    use rox::parser::Parser;
    use rox::resolver::Resolver;
    use rox::scanner::scan;
    use rox::{Lox, Status};

    /// Output sink the test keeps a handle on after giving it away.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Output sink that refuses every write.
    struct ClosedSink;

    impl Write for ClosedSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Session {
        lox: Lox,
        out: SharedBuf,
        diagnostics: Diagnostics,
    }

    impl Session {
        fn new() -> Self {
            let out = SharedBuf::default();
            Self {
                lox: Lox::with_output(Box::new(out.clone())),
                out,
                diagnostics: Diagnostics::new(),
            }
        }

        fn run(&mut self, source: &str) -> Status {
            self.lox.run(source, &mut self.diagnostics)
        }

        fn line(&mut self, source: &str) -> Status {
            self.lox.run_line(source, &mut self.diagnostics)
        }

        fn output(&self) -> String {
            self.out.contents()
        }

        fn errors(&self) -> Vec<String> {
            self.diagnostics.messages()
        }
    }

    /// Run a whole program and return its status and printed output.
    fn run(source: &str) -> (Status, String, Vec<String>) {
        let mut session = Session::new();
        let status = session.run(source);
        (status, session.output(), session.errors())
    }

    /// Scan, parse and resolve `source` against `interpreter`, which is left
    /// ready to run the returned statements.
    fn load(source: &str, interpreter: &mut Interpreter) -> Vec<Stmt> {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, &mut diagnostics);
        let statements: Vec<Stmt> = Parser::new(tokens, &mut diagnostics)
            .parse()
            .into_iter()
            .flatten()
            .collect();
        Resolver::new(interpreter, &mut diagnostics).resolve(&statements);

        assert!(!diagnostics.had_error(), "{:?}", diagnostics.messages());
        statements
    }

    fn output_of(source: &str) -> String {
        let (status, output, errors) = run(source);
        assert_eq!(errors, Vec::<String>::new());
        assert_eq!(status, Status::Ok);
        output
    }

    #[test]
    fn test_arithmetic_and_strings() {
        assert_eq!(output_of("print 1 + 2;"), "3\n");
        assert_eq!(output_of("print 7 / 2;"), "3.5\n");
        assert_eq!(output_of("print -(2 * 3) + 10;"), "4\n");
        assert_eq!(output_of("print \"a\" + \"b\";"), "ab\n");
        assert_eq!(output_of("print 1 < 2;"), "true\n");
    }

    #[test]
    fn test_equality_and_truthiness() {
        assert_eq!(output_of("print nil == nil;"), "true\n");
        assert_eq!(output_of("print nil == false;"), "false\n");
        assert_eq!(output_of("print 0 == false;"), "false\n");
        assert_eq!(output_of("print \"1\" == 1;"), "false\n");
        assert_eq!(output_of("print !nil;"), "true\n");
        assert_eq!(output_of("print !0;"), "false\n");
        assert_eq!(output_of("if (\"\") print \"truthy\";"), "truthy\n");
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(output_of("print nil or \"x\";"), "x\n");
        assert_eq!(output_of("print 1 and 2;"), "2\n");
        assert_eq!(output_of("print false and undefined;"), "false\n");
    }

    #[test]
    fn test_conditional_and_comma() {
        assert_eq!(output_of("print true ? 1 : 2;"), "1\n");
        assert_eq!(output_of("print false ? never_evaluated : 2;"), "2\n");
        assert_eq!(output_of("print nil ? 1 : false ? 2 : 3;"), "3\n");
        assert_eq!(output_of("var a = 0; print ((a = 5), a + 1);"), "6\n");
    }

    #[test]
    fn test_division_by_zero_halts() {
        let (status, output, errors) = run("print 1;\nprint 1 / 0;\nprint 2;");

        assert_eq!(status, Status::RuntimeError);
        assert_eq!(output, "1\n");
        assert_eq!(errors, vec!["Cannot divide by zero.\n[line 2]"]);
    }

    #[test]
    fn test_type_errors() {
        let (status, _, errors) = run("print \"a\" + 1;");
        assert_eq!(status, Status::RuntimeError);
        assert_eq!(
            errors,
            vec!["Operands must be two numbers or two strings.\n[line 1]"]
        );

        let (_, _, errors) = run("print -\"a\";");
        assert_eq!(errors, vec!["Operand must be a number.\n[line 1]"]);

        let (_, _, errors) = run("print 1 < \"2\";");
        assert_eq!(errors, vec!["Operands must be numbers.\n[line 1]"]);
    }

    #[test]
    fn test_variables() {
        assert_eq!(output_of("var a = 1; { var a = 2; print a; } print a;"), "2\n1\n");
        assert_eq!(output_of("var a; a = 3; print a;"), "3\n");

        let (_, _, errors) = run("print nope;");
        assert_eq!(errors, vec!["Undefined variable 'nope'.\n[line 1]"]);

        let (_, _, errors) = run("var a; print a;");
        assert_eq!(errors, vec!["Variable 'a' is not initialized.\n[line 1]"]);

        let (_, _, errors) = run("nope = 1;");
        assert_eq!(errors, vec!["Undefined variable 'nope'.\n[line 1]"]);
    }

    #[test]
    fn test_uninitialized_local_reads_as_nil() {
        // Only globals check the initialized flag; locals resolve by depth.
        assert_eq!(output_of("{ var a; print a; }"), "nil\n");
        assert_eq!(output_of("fun f() { var a; return a; } print f();"), "nil\n");
    }

    #[test]
    fn test_resolution_is_lexical() {
        let source = r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
                print a;
            }
        "#;

        assert_eq!(output_of(source), "global\nglobal\nblock\n");
    }

    #[test]
    fn test_loops_and_break() {
        assert_eq!(
            output_of("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
        assert_eq!(
            output_of("var i = 0; while (true) { if (i == 2) break; print i; i = i + 1; }"),
            "0\n1\n"
        );
        assert_eq!(
            output_of(
                "for (var i = 0; i < 2; i = i + 1) { for (var j = 0; j < 5; j = j + 1) { if (j == 1) break; print i + j; } }"
            ),
            "0\n1\n"
        );
    }

    #[test]
    fn test_functions_and_closures() {
        let counter = r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    print i;
                }
                return count;
            }
            var counter = makeCounter();
            counter();
            counter();
        "#;
        assert_eq!(output_of(counter), "1\n2\n");

        assert_eq!(
            output_of("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
            "55\n"
        );
        assert_eq!(output_of("fun f() {} print f();"), "nil\n");
        assert_eq!(output_of("fun f() { while (true) { return 7; } } print f();"), "7\n");
        assert_eq!(output_of("var add = fun (a, b) { return a + b; }; print add(1, 2);"), "3\n");
    }

    #[test]
    fn test_call_errors() {
        let (_, _, errors) = run("fun f(a) {} f(1, 2);");
        assert_eq!(errors, vec!["Expected 1 arguments but got 2.\n[line 1]"]);

        let (_, _, errors) = run("\"not a function\"();");
        assert_eq!(errors, vec!["Can only call functions and classes.\n[line 1]"]);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(
            output_of("fun f() {} class C {} print f; print fun () {}; print clock; print C; print C();"),
            "<fn f>\n<fn>\n<native fn clock>\nC\nC instance\n"
        );
        assert_eq!(output_of("print clock() > 0;"), "true\n");
    }

    #[test]
    fn test_classes_fields_and_methods() {
        let source = r#"
            class Point {
                init(x, y) {
                    this.x = x;
                    this.y = y;
                }
                sum() { return this.x + this.y; }
            }
            var p = Point(1, 2);
            print p.sum();
            p.x = 10;
            print p.sum();
            var m = p.sum;
            print m();
        "#;

        assert_eq!(output_of(source), "3\n12\n12\n");
    }

    #[test]
    fn test_initializer_always_returns_instance() {
        let source = r#"
            class A {
                init() {
                    this.v = 1;
                    return;
                    this.v = 2;
                }
            }
            var a = A();
            print a.v;
            print a.init();
        "#;

        assert_eq!(output_of(source), "1\nA instance\n");
    }

    #[test]
    fn test_inheritance_and_super() {
        let source = r#"
            class A {
                method() { print "A method"; }
                name() { return "A"; }
            }
            class B < A {
                method() {
                    print "B method";
                    super.method();
                }
            }
            class C < B {}
            C().method();
            print C().name();
        "#;

        assert_eq!(output_of(source), "B method\nA method\nA\n");
    }

    #[test]
    fn test_property_errors() {
        let (_, _, errors) = run("class A {} print A().missing;");
        assert_eq!(errors, vec!["Undefined property 'missing'.\n[line 1]"]);

        let (_, _, errors) = run("var x = 1; print x.y;");
        assert_eq!(errors, vec!["Only instances have properties.\n[line 1]"]);

        let (_, _, errors) = run("var x = 1; x.y = 2;");
        assert_eq!(errors, vec!["Only instances have fields.\n[line 1]"]);

        let (_, _, errors) = run("var NotAClass = 1; class B < NotAClass {}");
        assert_eq!(errors, vec!["Superclass must be a class.\n[line 1]"]);
    }

    #[test]
    fn test_static_errors_prevent_execution() {
        let (status, output, errors) = run("print 1;\nprint ;");

        assert_eq!(status, Status::StaticError);
        assert_eq!(output, "");
        assert_eq!(errors, vec!["[line 2] Error at ';': Expect expression."]);

        let (status, output, _) = run("print 1; return 2;");
        assert_eq!(status, Status::StaticError);
        assert_eq!(output, "");
    }

    #[test]
    fn test_repl_echoes_expressions() {
        let mut session = Session::new();

        assert_eq!(session.line("1 + 2;"), Status::Ok);
        assert_eq!(session.line("var a = \"x\";"), Status::Ok);
        assert_eq!(session.line("a;"), Status::Ok);
        assert_eq!(session.line("print a;"), Status::Ok);

        assert_eq!(session.output(), "3\nx\nx\n");
    }

    #[test]
    fn test_repl_keeps_state_across_lines() {
        let mut session = Session::new();

        session.line("fun makeAdder(n) { return fun (x) { return x + n; }; }");
        session.line("var add2 = makeAdder(2);");
        session.line("{ var local = 40; fun peek() { return local; } var keep = peek; add2(keep()); }");
        session.line("add2(1);");

        // An error on one line leaves the session usable.
        assert_eq!(session.line("undefined;"), Status::RuntimeError);
        assert_eq!(session.line("add2(5);"), Status::Ok);

        assert_eq!(session.output(), "3\n7\n");
    }

    #[test]
    fn test_resolving_twice_is_harmless() {
        let source = "{ var a = 1; fun f() { print a; } f(); }";

        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, &mut diagnostics);
        let statements: Vec<Stmt> = Parser::new(tokens, &mut diagnostics)
            .parse()
            .into_iter()
            .flatten()
            .collect();

        let out = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(out.clone()));
        Resolver::new(&mut interpreter, &mut diagnostics).resolve(&statements);
        Resolver::new(&mut interpreter, &mut diagnostics).resolve(&statements);

        assert!(!diagnostics.had_error());
        assert_eq!(interpreter.interpret(&statements), Ok(()));
        assert_eq!(out.contents(), "1\n");
    }

    #[test]
    fn test_failed_run_leaves_interpreter_reusable() {
        let mut interpreter = Interpreter::with_output(Box::new(io::sink()));
        let statements = load("fun f() { { var x = 1 / 0; print x; } } f();", &mut interpreter);

        let first = interpreter.interpret(&statements);
        let second = interpreter.interpret(&statements);

        assert_eq!(first, Err(RuntimeError::DivisionByZero { line: 1 }));
        assert_eq!(second, first);
    }

    #[test]
    fn test_call_depth_limit() {
        let out = SharedBuf::default();
        let mut interpreter =
            Interpreter::with_output(Box::new(out.clone())).with_max_call_depth(8);
        let statements = load(
            "fun f(n) { if (n == 0) return 0; return f(n - 1) + 1; }\nprint f(7);\nprint f(8);",
            &mut interpreter,
        );

        assert_eq!(
            interpreter.interpret(&statements),
            Err(RuntimeError::StackOverflow { line: 1 })
        );
        // The depth counter unwinds with the error.
        assert_eq!(
            interpreter.interpret(&statements),
            Err(RuntimeError::StackOverflow { line: 1 })
        );
        assert_eq!(out.contents(), "7\n7\n");
    }

    #[test]
    fn test_runaway_recursion_is_a_runtime_error() {
        let handle = thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let mut session = Session::new();
                let status = session
                    .run("fun f(n) { if (n == 0) return 0; return f(n - 1) + 1; } print f(100000);");
                let errors = session.errors();

                // The session survives and can still recurse within the limit.
                let after = session.run("print f(10);");
                (status, errors, after, session.output())
            })
            .expect("spawn interpreter thread");

        let (status, errors, after, output) = handle.join().expect("interpreter thread panicked");

        assert_eq!(status, Status::RuntimeError);
        assert_eq!(errors, vec!["Stack overflow.\n[line 1]"]);
        assert_eq!(after, Status::Ok);
        assert_eq!(output, "10\n");
    }

    #[test]
    fn test_output_failure_reports_statement_line() {
        let mut lox = Lox::with_output(Box::new(ClosedSink));
        let mut diagnostics = Diagnostics::new();

        assert_eq!(lox.run("\nprint \"x\";", &mut diagnostics), Status::RuntimeError);
        assert_eq!(lox.run_line("\n\n\"echo\";", &mut diagnostics), Status::RuntimeError);

        assert_eq!(
            diagnostics.messages(),
            vec![
                "Failed to write output: sink closed\n[line 2]",
                "Failed to write output: sink closed\n[line 3]",
            ]
        );
        let lines: Vec<usize> = diagnostics.errors.iter().map(|e| e.line()).collect();
        assert_eq!(lines, vec![2, 3]);
    }
}
