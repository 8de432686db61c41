use std::fmt::Display;

/// A location in the source text. `index` is a byte offset, `row` and
/// `column` are 0-based and count characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub index: usize,
    pub row: usize,
    pub column: usize,
}

impl Position {
    pub fn new(index: usize, row: usize, column: usize) -> Self {
        Self { index, row, column }
    }

    /// Moves past `ch`.
    pub fn advance(&mut self, ch: char) {
        self.index += ch.len_utf8();
        if ch == '\n' {
            self.row += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }

    pub fn advanced(mut self, ch: char) -> Self {
        self.advance(ch);
        self
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row({}), col({})", self.row, self.column)
    }
}

/// Half-open region of source text: `end` is the position just past the
/// last character covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    start: Position,
    end: Position,
}

impl SourceSpan {
    pub fn range(start: Position, end: Position) -> Self {
        debug_assert!(start.index <= end.index);
        Self { start, end }
    }
    pub fn point(at: Position) -> Self {
        Self { start: at, end: at }
    }
    /// The smallest span covering both `self` and `other`.
    pub fn cover(&self, other: SourceSpan) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
    pub fn start(&self) -> Position {
        self.start
    }
    pub fn end(&self) -> Position {
        self.end
    }
    pub fn len(&self) -> usize {
        self.end.index - self.start.index
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&SourceSpan> for miette::SourceSpan {
    fn from(span: &SourceSpan) -> Self {
        Self::new(span.start.index.into(), span.len().into())
    }
}
impl From<SourceSpan> for miette::SourceSpan {
    fn from(span: SourceSpan) -> Self {
        Self::from(&span)
    }
}
