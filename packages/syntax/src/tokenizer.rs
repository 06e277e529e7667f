use logos::Logos;
use std::fmt;

/// CSS tokens, close to the css-syntax-3 token set.
///
/// Numbers carry no exponent part so that `1em`/`1e` are read as dimensions.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
#[logos(skip r"<!--|-->")]
pub enum Token<'src> {
    #[regex(r"[ \t\n\r\f]+")]
    Whitespace,

    #[regex(r"@(--|-?([a-zA-Z_]|[^\x00-\x7F]|\\[^\r\n\f]))([a-zA-Z0-9_-]|[^\x00-\x7F]|\\[^\r\n\f])*", |lex| &lex.slice()[1..])]
    AtKeyword(&'src str),

    #[regex(r"(--|-?([a-zA-Z_]|[^\x00-\x7F]|\\[^\r\n\f]))([a-zA-Z0-9_-]|[^\x00-\x7F]|\\[^\r\n\f])*", |lex| lex.slice())]
    Ident(&'src str),

    /// Function name without the opening parenthesis
    #[regex(r"(--|-?([a-zA-Z_]|[^\x00-\x7F]|\\[^\r\n\f]))([a-zA-Z0-9_-]|[^\x00-\x7F]|\\[^\r\n\f])*\(", |lex| { let s = lex.slice(); &s[..s.len() - 1] })]
    Function(&'src str),

    /// Unquoted `url(...)`, contents trimmed
    #[regex(r#"[uU][rR][lL]\([ \t\n\r\f]*[^"'() \t\n\r\f]*[ \t\n\r\f]*\)"#, |lex| { let s = lex.slice(); s[4..s.len() - 1].trim() })]
    Url(&'src str),

    /// Hash without the leading `#`
    #[regex(r"#([a-zA-Z0-9_-]|[^\x00-\x7F]|\\[^\r\n\f])+", |lex| &lex.slice()[1..])]
    Hash(&'src str),

    /// String literal with its quotes
    #[regex(r#""([^"\\\r\n]|\\(.|\n))*""#, |lex| lex.slice())]
    #[regex(r#"'([^'\\\r\n]|\\(.|\n))*'"#, |lex| lex.slice())]
    String(&'src str),

    #[regex(r"[+-]?([0-9]+(\.[0-9]+)?|\.[0-9]+)", |lex| lex.slice())]
    Number(&'src str),

    /// Percentage without the `%`
    #[regex(r"[+-]?([0-9]+(\.[0-9]+)?|\.[0-9]+)%", |lex| { let s = lex.slice(); &s[..s.len() - 1] })]
    Percentage(&'src str),

    #[regex(r"[+-]?([0-9]+(\.[0-9]+)?|\.[0-9]+)(--|-?([a-zA-Z_]|[^\x00-\x7F]|\\[^\r\n\f]))([a-zA-Z0-9_-]|[^\x00-\x7F]|\\[^\r\n\f])*", |lex| lex.slice())]
    Dimension(&'src str),

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    /// Any other single punctuation character
    #[regex(r#"[!-'*+\-./<-@\\^`|~]"#, |lex| lex.slice().chars().next())]
    Delim(char),
}

impl<'src> Token<'src> {
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Token::Whitespace)
    }

    pub fn is_delim(&self, c: char) -> bool {
        matches!(self, Token::Delim(d) if *d == c)
    }
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Whitespace => write!(f, "whitespace"),
            Token::AtKeyword(s) => write!(f, "at-keyword '@{}'", s),
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::Function(s) => write!(f, "function '{}('", s),
            Token::Url(s) => write!(f, "url({})", s),
            Token::Hash(s) => write!(f, "hash '#{}'", s),
            Token::String(s) => write!(f, "string {}", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Percentage(n) => write!(f, "percentage {}%", n),
            Token::Dimension(d) => write!(f, "dimension {}", d),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Colon => write!(f, ":"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Delim(c) => write!(f, "'{}'", c),
        }
    }
}

/// Split a dimension token into its numeric part and its unit
pub fn split_dimension(text: &str) -> (&str, &str) {
    let bytes = text.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    text.split_at(end)
}

/// Tokenize a source string. The first span that matches no token is returned as the error.
pub fn tokenize(source: &str) -> Result<Vec<(Token<'_>, std::ops::Range<usize>)>, std::ops::Range<usize>> {
    Token::lexer(source)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(span),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token<'_>> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_rule_tokens() {
        assert_eq!(
            kinds(".a>b{color:red}"),
            vec![
                Token::Delim('.'),
                Token::Ident("a"),
                Token::Delim('>'),
                Token::Ident("b"),
                Token::LBrace,
                Token::Ident("color"),
                Token::Colon,
                Token::Ident("red"),
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn test_numeric_tokens() {
        assert_eq!(
            kinds("1px 50% .5 -2em"),
            vec![
                Token::Dimension("1px"),
                Token::Whitespace,
                Token::Percentage("50"),
                Token::Whitespace,
                Token::Number(".5"),
                Token::Whitespace,
                Token::Dimension("-2em"),
            ]
        );
    }

    #[test]
    fn test_functions_and_urls() {
        assert_eq!(
            kinds("rgb(1,2,3) url( a.png ) url(\"b\")"),
            vec![
                Token::Function("rgb"),
                Token::Number("1"),
                Token::Comma,
                Token::Number("2"),
                Token::Comma,
                Token::Number("3"),
                Token::RParen,
                Token::Whitespace,
                Token::Url("a.png"),
                Token::Whitespace,
                Token::Function("url"),
                Token::String("\"b\""),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("a/* x */{/**/}"),
            vec![Token::Ident("a"), Token::LBrace, Token::RBrace]
        );
    }

    #[test]
    fn test_at_keyword_and_hash() {
        assert_eq!(
            kinds("@-webkit-keyframes #fff"),
            vec![
                Token::AtKeyword("-webkit-keyframes"),
                Token::Whitespace,
                Token::Hash("fff"),
            ]
        );
    }

    #[test]
    fn test_ie_hack_identifier() {
        assert_eq!(kinds("\\9"), vec![Token::Ident("\\9")]);
        assert_eq!(kinds("1px\\9"), vec![Token::Dimension("1px\\9")]);
    }

    #[test]
    fn test_split_dimension() {
        assert_eq!(split_dimension("-1.5em"), ("-1.5", "em"));
        assert_eq!(split_dimension("10px\\9"), ("10", "px\\9"));
    }
}
