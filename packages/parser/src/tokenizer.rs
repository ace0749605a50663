use logos::Logos;
use std::fmt;
use std::ops::Range;

use crate::error::{ParseError, ParseResult};

/// Token types for Trellis markup
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(skip r"<!--([^-]|-[^-])*-->")]
pub enum Token<'src> {
    #[token("<?")]
    InstructionOpen,

    #[token("?>")]
    InstructionClose,

    #[token("</")]
    CloseTagOpen,

    #[token("/>")]
    SelfClose,

    #[token("<")]
    LAngle,

    #[token(">")]
    RAngle,

    #[token("=")]
    Equals,

    // Element, attribute and import names (`GridPane.columnIndex`, `x:id`, `layout.*`)
    #[regex(r"[A-Za-z_][A-Za-z0-9_:\-]*(\.[A-Za-z_][A-Za-z0-9_:\-]*)*(\.\*)?", |lex| lex.slice())]
    Name(&'src str),

    // Quoted attribute values, quotes included
    #[regex(r#""[^"]*""#, |lex| lex.slice())]
    #[regex(r#"'[^']*'"#, |lex| lex.slice())]
    String(&'src str),
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::InstructionOpen => write!(f, "'<?'"),
            Token::InstructionClose => write!(f, "'?>'"),
            Token::CloseTagOpen => write!(f, "'</'"),
            Token::SelfClose => write!(f, "'/>'"),
            Token::LAngle => write!(f, "'<'"),
            Token::RAngle => write!(f, "'>'"),
            Token::Equals => write!(f, "'='"),
            Token::Name(name) => write!(f, "name '{}'", name),
            Token::String(s) => write!(f, "string {}", s),
        }
    }
}

/// Tokenize markup source, failing on the first unrecognised character
pub fn tokenize(source: &str) -> ParseResult<Vec<(Token<'_>, Range<usize>)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => return Err(ParseError::lexer_error(lexer.span())),
        }
    }

    Ok(tokens)
}

/// Strip quotes and decode the predefined XML entities
pub fn unquote(raw: &str) -> String {
    let inner = if raw.len() >= 2 { &raw[1..raw.len() - 1] } else { raw };
    unescape(inner)
}

pub fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }

    value
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_element() {
        let tokens = tokenize(r#"<Button x:id="ok" text="OK"/>"#).unwrap();
        let kinds: Vec<_> = tokens.iter().map(|(t, _)| t.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                Token::LAngle,
                Token::Name("Button"),
                Token::Name("x:id"),
                Token::Equals,
                Token::String("\"ok\""),
                Token::Name("text"),
                Token::Equals,
                Token::String("\"OK\""),
                Token::SelfClose,
            ]
        );
    }

    #[test]
    fn test_tokenize_skips_comments() {
        let tokens = tokenize("<!-- a - comment --><VBox/>").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].0, Token::Name("VBox"));
    }

    #[test]
    fn test_tokenize_wildcard_import() {
        let tokens = tokenize("<?import layout.*?>").unwrap();
        assert_eq!(tokens[2].0, Token::Name("layout.*"));
        assert_eq!(tokens[3].0, Token::InstructionClose);
    }

    #[test]
    fn test_tokenize_rejects_stray_characters() {
        let err = tokenize("<VBox % />").unwrap_err();
        assert!(matches!(err, ParseError::LexerError { .. }));
    }

    #[test]
    fn test_entities_roundtrip() {
        let raw = r#"a < b & "c""#;
        assert_eq!(unescape(&escape(raw)), raw);
        assert_eq!(unquote("'x &amp; y'"), "x & y");
    }
}
