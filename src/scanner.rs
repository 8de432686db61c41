use crate::{
    source::{Position, SourceSpan},
    source_reference::SourceReference,
};
use derive_new::new;
use miette::{Diagnostic, Result};
use std::{fmt::Display, iter::Peekable, str::Chars};
use strum::EnumDiscriminants;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ScannerError {
    #[error("unexpected character {character:?}")]
    UnexpectedCharacter {
        character: char,
        #[label("character found here")]
        at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("expected hex digits after '0x'")]
    MissingHexDigits {
        #[label("hex literal here")]
        at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("unterminated quoted identifier")]
    UnterminatedQuote {
        #[label("quote opened here is never closed")]
        at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
}

impl ScannerError {
    pub fn span(&self) -> SourceSpan {
        match self {
            Self::UnexpectedCharacter { at, .. }
            | Self::MissingHexDigits { at, .. }
            | Self::UnterminatedQuote { at, .. } => *at,
        }
    }
}

#[derive(Debug, Clone, new)]
pub struct Token {
    pub span: SourceSpan,
    pub token_type: TokenType,
}

impl Token {
    /// The literal text of the token. Only end of input has none.
    pub fn lexeme(&self) -> Option<&str> {
        Some(match &self.token_type {
            TokenType::Hex(text) | TokenType::Ident(text) => text.as_str(),
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Mul => "*",
            TokenType::Div => "/",
            TokenType::Pow => "**",
            TokenType::LParen => "(",
            TokenType::RParen => ")",
            TokenType::LSquare => "[",
            TokenType::RSquare => "]",
            TokenType::Dot => ".",
            TokenType::Eof => return None,
        })
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = TokenTypeName::from(&self.token_type);
        match self.lexeme() {
            Some(text) => write!(f, "{:?}:{}", name, text),
            None => write!(f, "{:?}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(TokenTypeName))]
pub enum TokenType {
    Hex(String),
    Plus,
    Minus,
    Mul,
    Div,
    Pow,
    LParen,
    RParen,
    LSquare,
    RSquare,
    Ident(String),
    Dot,
    Eof,
}

/// Characters allowed in an unquoted identifier.
pub fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(ch, '_' | '-' | '\'' | '&')
        || ('\u{4e00}'..='\u{9fa5}').contains(&ch)
}

/// Characters allowed between double quotes.
pub fn is_quoted_identifier_char(ch: char) -> bool {
    is_identifier_char(ch) || ch.is_whitespace() || matches!(ch, '(' | ')' | '[' | ']' | '=')
}

fn is_skipped_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

pub struct Scanner<'a> {
    chars: Peekable<Chars<'a>>,
    source_reference: SourceReference,
    position: Position,
    token_start: Position,
    quote_start: Option<Position>,
    at_end: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str, source_reference: SourceReference) -> Self {
        Self {
            chars: source.chars().peekable(),
            source_reference,
            position: Position::default(),
            token_start: Position::default(),
            quote_start: None,
            at_end: false,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.position.advance(ch);
        Some(ch)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance_while<F: Fn(char) -> bool>(&mut self, check: F, text: &mut String) {
        while let Some(ch) = self.peek() {
            if !check(ch) {
                return;
            }
            text.push(ch);
            self.advance();
        }
    }

    fn in_quote(&self) -> bool {
        self.quote_start.is_some()
    }

    fn begin_token(&mut self) {
        self.token_start = self.position;
    }

    fn current_span(&self) -> SourceSpan {
        SourceSpan::range(self.token_start, self.position)
    }

    fn yield_token(&self, token_type: TokenType) -> Token {
        Token::new(self.current_span(), token_type)
    }

    fn yield_conditional_token(
        &mut self,
        target_ch: char,
        token_if_found: TokenType,
        token_if_not_found: TokenType,
    ) -> Token {
        let token = match self.peek() {
            Some(ch) if ch == target_ch => {
                self.advance();
                token_if_found
            }
            _ => token_if_not_found,
        };
        self.yield_token(token)
    }

    fn finish(&mut self) -> Result<Token, ScannerError> {
        self.begin_token();
        match self.quote_start.take() {
            Some(opened_at) => Err(ScannerError::UnterminatedQuote {
                at: SourceSpan::range(opened_at, self.position),
                source_code: self.source_reference.clone(),
            }),
            None => Ok(self.yield_token(TokenType::Eof)),
        }
    }

    fn scan_hex(&mut self, first: char) -> Result<Token, ScannerError> {
        let mut text = first.to_string();
        if first == '0' && self.peek() == Some('x') {
            self.advance();
            text.push('x');
            let digits_start = text.len();
            self.advance_while(|ch| ch.is_ascii_hexdigit(), &mut text);
            if text.len() == digits_start {
                return Err(ScannerError::MissingHexDigits {
                    at: self.current_span(),
                    source_code: self.source_reference.clone(),
                });
            }
        } else {
            self.advance_while(|ch| ch.is_ascii_hexdigit(), &mut text);
        }
        Ok(self.yield_token(TokenType::Hex(text)))
    }

    fn scan_identifier(&mut self, first: char) -> Token {
        let mut text = first.to_string();
        if self.in_quote() {
            self.advance_while(is_quoted_identifier_char, &mut text);
        } else {
            self.advance_while(is_identifier_char, &mut text);
        }
        self.yield_token(TokenType::Ident(text))
    }

    fn scan_token(&mut self) -> Option<Result<Token, ScannerError>> {
        loop {
            self.begin_token();
            let ch = match self.advance() {
                Some(ch) => ch,
                None => return Some(self.finish()),
            };
            let in_quote = self.in_quote();
            return Some(match ch {
                '"' => {
                    self.quote_start = match self.quote_start {
                        Some(_) => None,
                        None => Some(self.token_start),
                    };
                    continue;
                }
                '.' => Ok(self.yield_token(TokenType::Dot)),
                ch if in_quote && is_quoted_identifier_char(ch) => Ok(self.scan_identifier(ch)),
                ch if in_quote => Err(self.unexpected(ch)),
                ch if is_skipped_whitespace(ch) => continue,
                '+' => Ok(self.yield_token(TokenType::Plus)),
                '-' => Ok(self.yield_token(TokenType::Minus)),
                '*' => Ok(self.yield_conditional_token('*', TokenType::Pow, TokenType::Mul)),
                '/' => Ok(self.yield_token(TokenType::Div)),
                '(' => Ok(self.yield_token(TokenType::LParen)),
                ')' => Ok(self.yield_token(TokenType::RParen)),
                '[' => Ok(self.yield_token(TokenType::LSquare)),
                ']' => Ok(self.yield_token(TokenType::RSquare)),
                ch if ch.is_ascii_digit() => self.scan_hex(ch),
                ch if is_identifier_char(ch) => Ok(self.scan_identifier(ch)),
                ch => Err(self.unexpected(ch)),
            });
        }
    }

    fn unexpected(&self, character: char) -> ScannerError {
        ScannerError::UnexpectedCharacter {
            character,
            at: self.current_span(),
            source_code: self.source_reference.clone(),
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, ScannerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.at_end {
            return None;
        }

        let result = self.scan_token()?;
        if matches!(
            result,
            Err(_)
                | Ok(Token {
                    token_type: TokenType::Eof,
                    ..
                })
        ) {
            self.at_end = true;
        }
        Some(result)
    }
}

/// Scans all of `source`, stopping at the first error. The returned tokens
/// always end with [`TokenType::Eof`].
pub fn tokenize(source: &str, source_reference: SourceReference) -> Result<Vec<Token>, ScannerError> {
    Scanner::new(source, source_reference).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(source: &str) -> Result<Vec<Token>, ScannerError> {
        tokenize(
            source,
            SourceReference::new("<test>".to_string(), source.to_string()),
        )
    }

    fn token_types(source: &str) -> Vec<TokenType> {
        scan(source)
            .unwrap()
            .into_iter()
            .map(|token| token.token_type)
            .collect()
    }

    fn ident(name: &str) -> TokenType {
        TokenType::Ident(name.to_string())
    }

    fn hex(text: &str) -> TokenType {
        TokenType::Hex(text.to_string())
    }

    #[test]
    fn operators() {
        use TokenType::*;
        assert_eq!(
            token_types("+ - * / ** ( ) [ ]"),
            vec![Plus, Minus, Mul, Div, Pow, LParen, RParen, LSquare, RSquare, Eof]
        );
    }

    #[test]
    fn module_with_offset() {
        use TokenType::*;
        assert_eq!(
            token_types("game.exe+0x10"),
            vec![ident("game"), Dot, ident("exe"), Plus, hex("0x10"), Eof]
        );
    }

    #[test]
    fn hex_literal_stops_at_non_hex_digit() {
        use TokenType::*;
        assert_eq!(token_types("1fz"), vec![hex("1f"), ident("z"), Eof]);
        assert_eq!(token_types("5x3"), vec![hex("5"), ident("x3"), Eof]);
    }

    #[test]
    fn identifiers_swallow_hyphens_but_not_operators() {
        use TokenType::*;
        assert_eq!(
            token_types("my-mod&co'+s1"),
            vec![ident("my-mod&co'"), Plus, ident("s1"), Eof]
        );
    }

    #[test]
    fn cjk_identifier() {
        assert_eq!(
            token_types("生命值"),
            vec![ident("生命值"), TokenType::Eof]
        );
    }

    #[test]
    fn quoted_identifier_keeps_spaces_and_brackets() {
        use TokenType::*;
        assert_eq!(
            token_types("\"my game (x86).exe\" + 4"),
            vec![ident("my game (x86)"), Dot, ident("exe"), Plus, hex("4"), Eof]
        );
    }

    #[test]
    fn digits_inside_quotes_are_identifiers() {
        use TokenType::*;
        assert_eq!(
            token_types("\"7zip.dll\""),
            vec![ident("7zip"), Dot, ident("dll"), Eof]
        );
    }

    #[test]
    fn token_spans_track_rows_and_columns() {
        let tokens = scan("1 +\n  s1").unwrap();
        let spans: Vec<_> = tokens
            .iter()
            .map(|token| {
                let (start, end) = (token.span.start(), token.span.end());
                (start.row, start.column, end.row, end.column)
            })
            .collect();
        assert_eq!(
            spans,
            vec![(0, 0, 0, 1), (0, 2, 0, 3), (1, 2, 1, 4), (1, 4, 1, 4)]
        );
    }

    #[test]
    fn lexemes() {
        let tokens = scan("0x1f**s1").unwrap();
        let lexemes: Vec<_> = tokens.iter().map(Token::lexeme).collect();
        assert_eq!(lexemes, vec![Some("0x1f"), Some("**"), Some("s1"), None]);
        assert_eq!(tokens[0].to_string(), "Hex:0x1f");
        assert_eq!(tokens[3].to_string(), "Eof");
    }

    #[test]
    fn unexpected_character() {
        match scan("1 + $") {
            Err(ScannerError::UnexpectedCharacter { character, at, .. }) => {
                assert_eq!(character, '$');
                assert_eq!(at.start().column, 4);
                assert_eq!(at.end().column, 5);
            }
            other => panic!("expected unexpected character error, got {:?}", other),
        }
    }

    #[test]
    fn operator_inside_quotes_is_rejected() {
        assert!(matches!(
            scan("\"a+b\""),
            Err(ScannerError::UnexpectedCharacter { character: '+', .. })
        ));
    }

    #[test]
    fn bare_hex_prefix_is_rejected() {
        assert!(matches!(
            scan("0x+1"),
            Err(ScannerError::MissingHexDigits { .. })
        ));
    }

    #[test]
    fn unterminated_quote() {
        match scan("1+\"user32") {
            Err(ScannerError::UnterminatedQuote { at, .. }) => {
                assert_eq!(at.start().column, 2);
                assert_eq!(at.end().column, 9);
            }
            other => panic!("expected unterminated quote error, got {:?}", other),
        }
    }

    #[test]
    fn scanner_stops_after_first_error() {
        let source = "$ $";
        let results: Vec<_> = Scanner::new(
            source,
            SourceReference::new("<test>".to_string(), source.to_string()),
        )
        .collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
