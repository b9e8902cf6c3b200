#[cfg(test)]
mod scanner_tests {
    use pretty_assertions::assert_eq;

    use rox::error::Diagnostics;
    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn rendered(source: &str) -> (Vec<String>, Vec<String>) {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, &mut diagnostics);

        (
            tokens.iter().map(ToString::to_string).collect(),
            diagnostics.messages(),
        )
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators() {
        assert_token_sequence(
            "! != = == < <= > >= / - ; ? :",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::MINUS, "-"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::QUESTION, "?"),
                (TokenType::COLON, ":"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "var breaker = nil; while (true) break; _x1",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "breaker"),
                (TokenType::EQUAL, "="),
                (TokenType::NIL, "nil"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::WHILE, "while"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::TRUE, "true"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::BREAK, "break"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::IDENTIFIER, "_x1"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_literals_render_like_tokenize() {
        let (tokens, errors) = rendered("1+2 \"hi\" 3.25");

        assert_eq!(
            tokens,
            vec![
                "NUMBER 1 1.0",
                "PLUS + null",
                "NUMBER 2 2.0",
                "STRING \"hi\" hi",
                "NUMBER 3.25 3.25",
                "EOF  null",
            ]
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let results: Vec<_> = Scanner::new(source).collect();

        // COMMA, DOT, error, LEFT_PAREN, error, EOF
        assert_eq!(results.len(), 6);
        assert!(results[2].is_err());
        assert!(results[4].is_err());
        assert_eq!(
            results[3].as_ref().map(|t| t.token_type.clone()).ok(),
            Some(TokenType::LEFT_PAREN)
        );
    }

    #[test]
    fn test_invalid_character_alone_leaves_only_eof() {
        let (tokens, errors) = rendered("@");

        assert_eq!(tokens, vec!["EOF  null"]);
        assert_eq!(errors, vec!["[line 1] Error: Unexpected character: @"]);
    }

    #[test]
    fn test_non_ascii_character_is_skipped_whole() {
        let (tokens, errors) = rendered("é;");

        assert_eq!(tokens, vec!["SEMICOLON ; null", "EOF  null"]);
        assert_eq!(errors, vec!["[line 1] Error: Unexpected character: é"]);
    }

    #[test]
    fn test_comments_are_skipped() {
        let (tokens, errors) = rendered("// line\n/* outer /* inner */ still */ print");

        assert_eq!(tokens, vec!["PRINT print null", "EOF  null"]);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_unterminated_comment_and_string() {
        let (_, errors) = rendered("/* /* */");
        assert_eq!(errors, vec!["[line 1] Error: Unterminated block comment."]);

        let (tokens, errors) = rendered("\"abc\nde");
        assert_eq!(tokens, vec!["EOF  null"]);
        assert_eq!(errors, vec!["[line 2] Error: Unterminated string."]);
    }

    #[test]
    fn test_lines_are_tracked() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan("a\n\"multi\nline\"\nb", &mut diagnostics);
        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();

        assert_eq!(lines, vec![1, 3, 4, 4]);
    }

    #[test]
    fn test_scanner_is_fused() {
        let mut scanner = Scanner::new("");

        assert!(matches!(
            scanner.next(),
            Some(Ok(Token {
                token_type: TokenType::EOF,
                ..
            }))
        ));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
