//! Core shared types and errors (format-agnostic).

use thiserror::Error;

/// Failures raised while turning OBJ/MTL text into geometry.
/// Line numbers are 1-based.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Malformed number '{token}' on line {line}")]
    MalformedNumber { line: usize, token: String },

    #[error("Missing value for '{keyword}' on line {line}")]
    MissingValue { line: usize, keyword: String },

    #[error("Face on line {line} has {count} vertex references (need at least 3)")]
    MalformedFace { line: usize, count: usize },

    #[error("Index '{token}' on line {line} does not address an entry (table len={len})")]
    MalformedIndex {
        line: usize,
        token: String,
        len: usize,
    },

    #[error("Triangle {triangle} is degenerate, flat normal is undefined")]
    DegenerateTriangle { triangle: usize },

    #[error("Position data of length {len} is not a whole number of triangles")]
    TruncatedPositions { len: usize },
}

impl ParseError {
    /// Source line the error was detected on, if it came from a text document.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MalformedNumber { line, .. }
            | Self::MissingValue { line, .. }
            | Self::MalformedFace { line, .. }
            | Self::MalformedIndex { line, .. } => Some(*line),
            Self::DegenerateTriangle { .. } | Self::TruncatedPositions { .. } => None,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_is_reported_for_text_errors_only() {
        let face = ParseError::MalformedFace { line: 7, count: 2 };
        assert_eq!(face.line(), Some(7));
        assert_eq!(ParseError::DegenerateTriangle { triangle: 0 }.line(), None);
    }

    #[test]
    fn messages_name_the_offending_token() {
        let err = ParseError::MalformedNumber {
            line: 3,
            token: "abc".into(),
        };
        assert_eq!(err.to_string(), "Malformed number 'abc' on line 3");
    }
}
