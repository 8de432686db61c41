use std::sync::Arc;

use miette::{NamedSource, SourceCode};

use crate::source::SourceSpan;

#[derive(Debug)]
struct SourceReferenceInner {
    text: Arc<str>,
    named_source: NamedSource,
}

/// Cheaply clonable handle to the text being evaluated. Every error keeps
/// one so it can be rendered after the pipeline has finished.
#[derive(Clone, Debug)]
pub struct SourceReference(Arc<SourceReferenceInner>);

impl SourceReference {
    pub fn new(name: String, source: String) -> Self {
        SourceReference(Arc::new(SourceReferenceInner {
            text: Arc::from(source.as_str()),
            named_source: NamedSource::new(name, source),
        }))
    }
    fn inner(&self) -> &SourceReferenceInner {
        self.0.as_ref()
    }
    pub fn text(&self) -> &str {
        &self.inner().text
    }
    /// The 0-based `row`th line, without its terminator.
    pub fn line(&self, row: usize) -> Option<&str> {
        self.text()
            .split('\n')
            .nth(row)
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
    }

    /// Two lines: the line `span` starts on, and a caret underline beneath the
    /// covered columns. A span crossing lines is underlined to the end of its
    /// first line; an empty span still gets one caret.
    pub fn excerpt(&self, span: SourceSpan) -> String {
        let (start, end) = (span.start(), span.end());
        let line = self.line(start.row).unwrap_or_default();
        let end_column = if end.row == start.row {
            end.column
        } else {
            line.chars().count()
        };
        let width = end_column.saturating_sub(start.column).max(1);
        format!("{}\n{}{}", line, " ".repeat(start.column), "^".repeat(width))
    }
}

impl SourceCode for SourceReference {
    fn read_span<'a>(
        &'a self,
        span: &miette::SourceSpan,
        context_lines_before: usize,
        context_lines_after: usize,
    ) -> Result<Box<dyn miette::SpanContents<'a> + 'a>, miette::MietteError> {
        self.inner()
            .named_source
            .read_span(span, context_lines_before, context_lines_after)
    }
}
