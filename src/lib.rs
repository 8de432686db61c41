//! Evaluates address strings such as `game.exe+0x10`, `[user32.MessageBoxA]`
//! or `s1*2` against a set of symbol and module tables.

pub mod ast;
mod error;
mod interpreter;
mod parser;
mod scanner;
mod source;
mod source_reference;
mod tables;

use itertools::Itertools;

pub use error::{ErrorKind, EvaluationError};
pub use interpreter::{Interpreter, MemoryError, MemoryReader, PlaceholderReader, RuntimeError};
pub use parser::{Parser, ParserError, MAX_DEPTH};
pub use scanner::{tokenize, Scanner, ScannerError, Token, TokenType, TokenTypeName};
pub use source::{Position, SourceSpan};
pub use source_reference::SourceReference;
pub use tables::{ExportTable, ModuleBaseTable, ModuleExportTable, ResolutionTables, SymbolTable};

const DEFAULT_SOURCE_NAME: &str = "<input>";

/// Evaluates `source` to an address, resolving names through `tables` and
/// answering dereferences with [`PlaceholderReader`].
pub fn evaluate(source: &str, tables: &ResolutionTables) -> Result<u64, EvaluationError> {
    Evaluator::new(tables).evaluate(source)
}

/// Scans and parses `source` without evaluating it.
pub fn parse(source: &str) -> Result<ast::Expr, EvaluationError> {
    parse_named(DEFAULT_SOURCE_NAME, source).map(|(expr, _)| expr)
}

fn parse_named(name: &str, source: &str) -> Result<(ast::Expr, SourceReference), EvaluationError> {
    let source_reference = SourceReference::new(name.to_string(), source.to_string());
    let tokens = tokenize(source, source_reference.clone())?;
    if cfg!(feature = "debug") {
        eprintln!("tokens: {}", tokens.iter().join(" "));
    }
    let expr = Parser::parse(tokens, source_reference.clone())?;
    if cfg!(feature = "debug") {
        eprintln!("tree: {}", expr);
    }
    Ok((expr, source_reference))
}

/// Tables plus the reader used for `[...]`. Evaluation never mutates either,
/// so one evaluator can be shared freely.
pub struct Evaluator<'t, R: MemoryReader = PlaceholderReader> {
    tables: &'t ResolutionTables,
    reader: R,
}

impl<'t> Evaluator<'t, PlaceholderReader> {
    pub fn new(tables: &'t ResolutionTables) -> Self {
        Self::with_reader(tables, PlaceholderReader)
    }
}

impl<'t, R: MemoryReader> Evaluator<'t, R> {
    pub fn with_reader(tables: &'t ResolutionTables, reader: R) -> Self {
        Self { tables, reader }
    }

    pub fn evaluate(&self, source: &str) -> Result<u64, EvaluationError> {
        self.evaluate_named(DEFAULT_SOURCE_NAME, source)
    }

    /// Like [`Evaluator::evaluate`], with `name` shown in diagnostics.
    pub fn evaluate_named(&self, name: &str, source: &str) -> Result<u64, EvaluationError> {
        let (expr, source_reference) = parse_named(name, source)?;
        let address =
            Interpreter::new(self.tables, &self.reader).interpret(&expr, &source_reference)?;
        Ok(address)
    }
}
