//! Pest scanner locating positional placeholders in templated query text.

use pest::Parser;
use pest_derive::Parser;

use crate::error::{NestqlError, Result};

#[derive(Parser)]
#[grammar = "template/placeholder.pest"]
struct TemplateScanner;

/// Location of a `?` placeholder within query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    /// Byte offset of the placeholder.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub col: usize,
}

/// Scans query text for positional placeholders, in textual order.
///
/// Question marks inside string literals, quoted identifiers and comments
/// are not placeholders.
///
/// # Errors
///
/// Returns a `SchemaError` if the text contains an unterminated literal,
/// identifier or block comment.
pub fn scan_placeholders(query: &str) -> Result<Vec<Placeholder>> {
    let pairs = TemplateScanner::parse(Rule::template, query).map_err(|e| {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos((l, c))
            | pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };
        NestqlError::SchemaError(format!(
            "Malformed query template at line {line}, column {col}: {}",
            e.variant.message()
        ))
    })?;

    let mut placeholders = Vec::new();
    for pair in pairs.flatten() {
        if pair.as_rule() == Rule::placeholder {
            let start = pair.as_span().start_pos();
            let (line, col) = start.line_col();
            placeholders.push(Placeholder {
                offset: start.pos(),
                line,
                col,
            });
        }
    }
    Ok(placeholders)
}
