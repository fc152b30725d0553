use crate::descriptor::ServerDescriptor;
use crate::parser::{LineError, parse_line};

/// A feed line that could not be parsed. `line` is 1-based and counts blank lines.
#[derive(thiserror::Error, Debug, PartialEq)]
#[error("line {line}: {source}")]
pub struct BatchError {
    pub line: usize,
    #[source]
    pub source: LineError,
}

/// Parses every non-blank line of a decoded feed, keeping feed order.
///
/// The first malformed line fails the whole batch.
pub fn parse_feed(text: &str) -> Result<Vec<ServerDescriptor>, BatchError> {
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(line_no, line)| {
            parse_line(line).map_err(|source| BatchError {
                line: line_no,
                source,
            })
        })
        .collect()
}
