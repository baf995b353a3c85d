use velox::scanner::{ScanMode, Scanner};
use velox::token::{Position, TokenKind};
use velox::tokenize;

fn kinds_and_values(source: &str) -> Vec<(TokenKind, String)> {
    tokenize(source)
        .unwrap()
        .into_iter()
        .map(|t| (t.kind, t.value))
        .collect()
}

#[test]
fn full_scan_round_trips_source() {
    let source = "#define N 3\n// count\nint main() {\n\t/* body */ return N ** 2;\n}\n";
    let tokens = Scanner::new().scan(source, ScanMode::Full).unwrap();
    let rebuilt: String = tokens.iter().map(|t| t.value.as_str()).collect();
    assert_eq!(rebuilt, source);
    assert!(tokens.iter().any(|t| t.kind == TokenKind::Comment));
    assert!(tokens.iter().any(|t| t.kind == TokenKind::Whitespace));
}

#[test]
fn significant_mode_drops_trivia() {
    let tokens = tokenize("x  /* c */ // d\n y").unwrap();
    assert_eq!(tokens.len(), 2);
    assert!(tokens.iter().all(|t| !t.kind.is_trivia()));
}

#[test]
fn keywords_take_priority_over_identifiers() {
    use TokenKind::*;
    assert_eq!(
        kinds_and_values("int integer return returned"),
        vec![
            (Keyword, "int".to_string()),
            (Identifier, "integer".to_string()),
            (Keyword, "return".to_string()),
            (Identifier, "returned".to_string()),
        ]
    );
}

#[test]
fn comments_take_priority_over_division() {
    let tokens = tokenize("a / b // tail").unwrap();
    let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
    assert_eq!(values, ["a", "/", "b"]);
}

#[test]
fn multi_character_operators_scan_as_one_token() {
    let values: Vec<String> = tokenize("a ** b && c || d <<= e >>= f += g == h != i <= j")
        .unwrap()
        .into_iter()
        .filter(|t| t.kind == TokenKind::Operator)
        .map(|t| t.value)
        .collect();
    assert_eq!(
        values,
        ["**", "&&", "||", "<<=", ">>=", "+=", "==", "!=", "<="]
    );
}

#[test]
fn numbers_strings_and_punctuation() {
    use TokenKind::*;
    assert_eq!(
        kinds_and_values(r#"f(1.5, 42, "hi");"#),
        vec![
            (Identifier, "f".to_string()),
            (Punctuation, "(".to_string()),
            (Number, "1.5".to_string()),
            (Punctuation, ",".to_string()),
            (Number, "42".to_string()),
            (Punctuation, ",".to_string()),
            (String, "\"hi\"".to_string()),
            (Punctuation, ")".to_string()),
            (Punctuation, ";".to_string()),
        ]
    );
}

#[test]
fn positions_are_one_based_lines_and_columns() {
    let tokens = tokenize("int x;\n  x = 1;").unwrap();
    assert_eq!(tokens[0].position(), Position::new(1, 1));
    assert_eq!(tokens[1].position(), Position::new(1, 5));
    assert_eq!(tokens[3].position(), Position::new(2, 3));
    assert_eq!(tokens[4].position(), Position::new(2, 5));
}

#[test]
fn unrecognized_character_is_a_lexical_error() {
    let err = tokenize("int x = 1;\nx = $;").unwrap_err();
    assert_eq!(err.category(), "lexical");
    assert_eq!(err.position(), Some(Position::new(2, 5)));
}

#[test]
fn empty_input_has_no_tokens() {
    assert!(tokenize("").unwrap().is_empty());
    assert!(tokenize("  \n\t ").unwrap().is_empty());
}
