//! Lexer for FlowScript, a small DOT-like workflow description language.

use logos::Logos;

use crate::error::LexError;

/// Tokens for FlowScript.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    #[token("digraph")]
    Digraph,

    #[token("node")]
    Node,

    #[token("shape")]
    Shape,

    #[token("label")]
    Label,

    #[token("data")]
    Data,

    #[token("=")]
    Equals,

    #[token("->")]
    Arrow,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(";")]
    Semicolon,

    /// The `data='...'` payload: raw text between a pair of single quotes.
    #[regex(r"'[^']*'", |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    Json(String),

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    StringLiteral(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Digraph => write!(f, "digraph"),
            Token::Node => write!(f, "node"),
            Token::Shape => write!(f, "shape"),
            Token::Label => write!(f, "label"),
            Token::Data => write!(f, "data"),
            Token::Equals => write!(f, "="),
            Token::Arrow => write!(f, "->"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Semicolon => write!(f, ";"),
            Token::Json(s) => write!(f, "'{s}'"),
            Token::StringLiteral(s) => write!(f, "\"{s}\""),
            Token::Identifier(s) => write!(f, "{s}"),
        }
    }
}

/// A token paired with its byte span in the source.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: std::ops::Range<usize>,
}

/// Tokenize FlowScript source. Returns `Err` on the first byte range that
/// cannot be matched to any token — the scanner does not try to resynchronize.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(SpannedToken { token, span }),
            Err(()) => {
                return Err(LexError {
                    position: span.start,
                    residue: source[span].to_string(),
                });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_header_and_braces() {
        let toks = tokenize("digraph { }").unwrap();
        assert_eq!(toks.len(), 3);
        assert!(matches!(toks[0].token, Token::Digraph));
        assert!(matches!(toks[1].token, Token::LBrace));
        assert!(matches!(toks[2].token, Token::RBrace));
    }

    #[test]
    fn tokenizes_node_declaration_with_data() {
        let toks = tokenize(r#"inputs [data='{"command":"make"}'];"#).unwrap();
        assert!(matches!(toks[0].token, Token::Identifier(ref s) if s == "inputs"));
        assert!(matches!(toks[1].token, Token::LBracket));
        assert!(matches!(toks[2].token, Token::Data));
        assert!(matches!(toks[3].token, Token::Equals));
        assert!(matches!(toks[4].token, Token::Json(ref s) if s == r#"{"command":"make"}"#));
        assert!(matches!(toks[5].token, Token::RBracket));
        assert!(matches!(toks[6].token, Token::Semicolon));
    }

    #[test]
    fn tokenizes_edge() {
        let toks = tokenize("A -> B;").unwrap();
        assert!(matches!(toks[0].token, Token::Identifier(ref s) if s == "A"));
        assert!(matches!(toks[1].token, Token::Arrow));
        assert!(matches!(toks[2].token, Token::Identifier(ref s) if s == "B"));
        assert!(matches!(toks[3].token, Token::Semicolon));
    }

    #[test]
    fn rejects_unknown_token() {
        let err = tokenize("A ~> B;").unwrap_err();
        assert_eq!(err.residue, "~");
    }

    #[test]
    fn skips_comments() {
        let toks = tokenize("// a comment\nA;").unwrap();
        assert_eq!(toks.len(), 2);
    }
}
