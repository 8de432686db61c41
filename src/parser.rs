use miette::{Diagnostic, Result};
use thiserror::Error;

use crate::{
    ast::*,
    scanner::{Token, TokenType, TokenTypeName},
    source::SourceSpan,
    source_reference::SourceReference,
};

#[derive(Error, Diagnostic, Debug)]
pub enum ParserError {
    #[error("expected ')'")]
    UnmatchedParenthesis {
        #[label("opening parenthesis here")]
        opener: SourceSpan,
        found: TokenTypeName,
        #[label("found {found:?} instead")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("expected ']'")]
    UnmatchedBracket {
        #[label("opening bracket here")]
        opener: SourceSpan,
        found: TokenTypeName,
        #[label("found {found:?} instead")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("expected identifier")]
    ExpectedIdentifier {
        found: TokenTypeName,
        #[label("found {found:?} after '.'")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("invalid token")]
    InvalidToken {
        found: TokenTypeName,
        #[label("found {found:?} instead of a hex number, identifier, '(' or '['")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("expression nested too deeply")]
    TooDeep {
        limit: usize,
        #[label("more than {limit} levels deep here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("unexpected trailing input")]
    TrailingInput {
        found: TokenTypeName,
        #[label("expected end of input, found {found:?}")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
}

impl ParserError {
    pub fn span(&self) -> SourceSpan {
        match self {
            Self::UnmatchedParenthesis { found_at, .. }
            | Self::UnmatchedBracket { found_at, .. }
            | Self::ExpectedIdentifier { found_at, .. }
            | Self::InvalidToken { found_at, .. }
            | Self::TooDeep { found_at, .. }
            | Self::TrailingInput { found_at, .. } => *found_at,
        }
    }
}

/// Binding power of prefix `+` and `-`.
const PREFIX_POWER: u8 = 17;

/// Deepest tree the parser will build. Evaluation and drop both recurse over
/// the tree, so this also bounds their stack use.
pub const MAX_DEPTH: usize = 256;

fn infix_operator(token_type: &TokenType) -> Option<(BinaryOperator, u8)> {
    Some(match token_type {
        TokenType::Pow => (BinaryOperator::Power, 16),
        TokenType::Mul => (BinaryOperator::Multiply, 15),
        TokenType::Div => (BinaryOperator::Divide, 15),
        TokenType::Plus => (BinaryOperator::Plus, 14),
        TokenType::Minus => (BinaryOperator::Minus, 14),
        _ => return None,
    })
}

fn prefix_operator(token_type: &TokenType) -> Option<UnaryOperator> {
    match token_type {
        TokenType::Plus => Some(UnaryOperator::Plus),
        TokenType::Minus => Some(UnaryOperator::Minus),
        _ => None,
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
    source_code: SourceReference,
}

impl Parser {
    /// Parses one complete expression. Anything left over other than end of
    /// input is an error.
    pub fn parse(tokens: Vec<Token>, source_code: SourceReference) -> Result<Expr, ParserError> {
        let mut parser = Self::new(tokens, source_code);
        let expr = parser.parse_binary_expr(0)?;
        let trailing = parser.peek();
        if trailing.token_type != TokenType::Eof {
            return Err(ParserError::TrailingInput {
                found: (&trailing.token_type).into(),
                found_at: trailing.span,
                source_code: parser.source_code.clone(),
            });
        }
        Ok(expr)
    }
    fn new(mut tokens: Vec<Token>, source_code: SourceReference) -> Self {
        if !matches!(
            tokens.last(),
            Some(Token {
                token_type: TokenType::Eof,
                ..
            })
        ) {
            let end = tokens
                .last()
                .map(|token| token.span.end())
                .unwrap_or_default();
            tokens.push(Token::new(SourceSpan::point(end), TokenType::Eof));
        }
        Self {
            tokens,
            current: 0,
            depth: 0,
            source_code,
        }
    }
}

impl Parser {
    fn parse_binary_expr(&mut self, min_power: u8) -> Result<Expr, ParserError> {
        let entry_depth = self.depth;
        let mut last_expr = match self.consume_match(|token| {
            prefix_operator(&token.token_type).map(|op| WithSpan::new(op, token.span))
        }) {
            Some(operator) if PREFIX_POWER > min_power => {
                self.descend(operator.source_span())?;
                Expr::Unary(UnaryExpr {
                    operator,
                    right: Box::new(self.parse_atom()?),
                })
            }
            Some(_) => return Err(self.invalid_token_at(self.current - 1)),
            None => self.parse_atom()?,
        };

        // An operator of the same power ends the recursive call and is folded
        // here instead, so every binary operator (`**` included) is
        // left-associative.
        while let Some((operator, power)) = self.consume_match(|token| {
            infix_operator(&token.token_type)
                .filter(|(_, power)| *power > min_power)
                .map(|(op, power)| (WithSpan::new(op, token.span), power))
        }) {
            // Each fold puts the tree built so far one level further down.
            self.descend(operator.source_span())?;
            last_expr = Expr::Binary(BinaryExpr {
                left: Box::new(last_expr),
                right: Box::new(self.parse_binary_expr(power)?),
                operator,
            });
        }

        self.depth = entry_depth;
        Ok(last_expr)
    }
    fn parse_atom(&mut self) -> Result<Expr, ParserError> {
        if let Some(literal) = self.consume_match(|token| match &token.token_type {
            TokenType::Hex(text) => Some(HexLiteralExpr {
                text: text.clone(),
                source_span: token.span,
            }),
            _ => None,
        }) {
            return Ok(Expr::HexLiteral(literal));
        }

        if let Some(first) = self.consume_identifier() {
            let mut path = IdentPathExpr::new(first);
            while self.consume_token(TokenType::Dot).is_some() {
                match self.consume_identifier() {
                    Some(segment) => path.push(segment),
                    None => {
                        let found = self.peek();
                        return Err(ParserError::ExpectedIdentifier {
                            found: (&found.token_type).into(),
                            found_at: found.span,
                            source_code: self.source_code.clone(),
                        });
                    }
                }
            }
            return Ok(Expr::IdentPath(path));
        }

        if let Some(opener) = self.consume_token_to_span(TokenType::LParen) {
            self.descend(opener)?;
            let expr = self.parse_binary_expr(0)?;
            self.depth -= 1;
            let source_code = self.source_code.clone();
            self.consume_token_or_error(&TokenType::RParen, |token| {
                ParserError::UnmatchedParenthesis {
                    opener,
                    found: (&token.token_type).into(),
                    found_at: token.span,
                    source_code,
                }
            })?;
            return Ok(expr);
        }

        if let Some(open_span) = self.consume_token_to_span(TokenType::LSquare) {
            self.descend(open_span)?;
            let address = self.parse_binary_expr(0)?;
            self.depth -= 1;
            let source_code = self.source_code.clone();
            let close_span = self
                .consume_token_or_error(&TokenType::RSquare, |token| {
                    ParserError::UnmatchedBracket {
                        opener: open_span,
                        found: (&token.token_type).into(),
                        found_at: token.span,
                        source_code,
                    }
                })?
                .span;
            return Ok(Expr::Dereference(DereferenceExpr {
                address: Box::new(address),
                open_span,
                close_span,
            }));
        }

        Err(self.invalid_token_at(self.current))
    }
    fn consume_identifier(&mut self) -> Option<Identifier> {
        self.consume_match(|token| match &token.token_type {
            TokenType::Ident(name) => Some(Identifier {
                name: name.clone(),
                source_span: token.span,
            }),
            _ => None,
        })
    }
    fn descend(&mut self, at: SourceSpan) -> Result<(), ParserError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParserError::TooDeep {
                limit: MAX_DEPTH,
                found_at: at,
                source_code: self.source_code.clone(),
            });
        }
        Ok(())
    }
    fn invalid_token_at(&self, index: usize) -> ParserError {
        let token = self.token_at(index);
        ParserError::InvalidToken {
            found: (&token.token_type).into(),
            found_at: token.span,
            source_code: self.source_code.clone(),
        }
    }
    fn token_at(&self, index: usize) -> &Token {
        // `new` guarantees a trailing Eof, so the list is never empty.
        &self.tokens[index.min(self.tokens.len() - 1)]
    }
    fn peek(&self) -> &Token {
        self.token_at(self.current)
    }
    fn advance(&mut self) {
        if self.peek().token_type != TokenType::Eof {
            self.current += 1;
        }
    }
    fn consume_match<T: Sized, F: Fn(&Token) -> Option<T>>(&mut self, check: F) -> Option<T> {
        let value = check(self.peek())?;
        self.advance();
        Some(value)
    }
    fn consume_token(&mut self, token_type: TokenType) -> Option<&Token> {
        if self.peek().token_type == token_type {
            let index = self.current;
            self.advance();
            Some(self.token_at(index))
        } else {
            None
        }
    }
    fn consume_token_to_span(&mut self, token_type: TokenType) -> Option<SourceSpan> {
        self.consume_token(token_type).map(|token| token.span)
    }
    fn consume_token_or_error<F: FnOnce(&Token) -> ParserError>(
        &mut self,
        token_type: &TokenType,
        make_err: F,
    ) -> Result<&Token, ParserError> {
        if self.peek().token_type == *token_type {
            let index = self.current;
            self.advance();
            Ok(self.token_at(index))
        } else {
            Err(make_err(self.peek()))
        }
    }
}
