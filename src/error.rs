use std::fmt::Display;

use miette::{Diagnostic, LabeledSpan, SourceCode};
use thiserror::Error;

use crate::{
    interpreter::RuntimeError, parser::ParserError, scanner::ScannerError, source::SourceSpan,
    SourceReference,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    #[strum(serialize = "LexError")]
    Lex,
    #[strum(serialize = "SyntaxError")]
    Syntax,
    #[strum(serialize = "RuntimeError")]
    Runtime,
}

/// Failure from any stage of [`crate::evaluate`]. The first failing stage
/// ends the pipeline.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error(transparent)]
    Lex(#[from] ScannerError),
    #[error(transparent)]
    Syntax(#[from] ParserError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl EvaluationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Lex(_) => ErrorKind::Lex,
            Self::Syntax(_) => ErrorKind::Syntax,
            Self::Runtime(_) => ErrorKind::Runtime,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn span(&self) -> SourceSpan {
        match self {
            Self::Lex(err) => err.span(),
            Self::Syntax(err) => err.span(),
            Self::Runtime(err) => err.span(),
        }
    }

    pub fn source_reference(&self) -> &SourceReference {
        match self {
            Self::Lex(
                ScannerError::UnexpectedCharacter { source_code, .. }
                | ScannerError::MissingHexDigits { source_code, .. }
                | ScannerError::UnterminatedQuote { source_code, .. },
            ) => source_code,
            Self::Syntax(
                ParserError::UnmatchedParenthesis { source_code, .. }
                | ParserError::UnmatchedBracket { source_code, .. }
                | ParserError::ExpectedIdentifier { source_code, .. }
                | ParserError::InvalidToken { source_code, .. }
                | ParserError::TooDeep { source_code, .. }
                | ParserError::TrailingInput { source_code, .. },
            ) => source_code,
            Self::Runtime(
                RuntimeError::UndefinedSymbol { source_code, .. }
                | RuntimeError::NotFound { source_code, .. }
                | RuntimeError::DivisionByZero { source_code, .. }
                | RuntimeError::Overflow { source_code, .. }
                | RuntimeError::LiteralOutOfRange { source_code, .. }
                | RuntimeError::NegativeAddress { source_code, .. }
                | RuntimeError::AddressOutOfRange { source_code, .. }
                | RuntimeError::MemoryRead { source_code, .. },
            ) => source_code,
        }
    }

    /// The offending source line with a caret underline.
    pub fn excerpt(&self) -> String {
        self.source_reference().excerpt(self.span())
    }

    /// Plain-text diagnostic for hosts that do not render miette reports.
    pub fn report(&self) -> String {
        format!(
            "{}: {}\n\t{}\n\n{}\n",
            self.kind(),
            self,
            self.span().start(),
            self.excerpt()
        )
    }

    fn as_diagnostic(&self) -> &dyn Diagnostic {
        match self {
            Self::Lex(err) => err,
            Self::Syntax(err) => err,
            Self::Runtime(err) => err,
        }
    }
}

impl Diagnostic for EvaluationError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.kind()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.as_diagnostic().help()
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.as_diagnostic().source_code()
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        self.as_diagnostic().labels()
    }
}
