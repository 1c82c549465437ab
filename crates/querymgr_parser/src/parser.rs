use std::fmt::Debug;

use querymgr_error::{ErrorCode, QueryError};

use crate::statement::Statement;

/// How numeric literals with a decimal point should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DecimalLiteralTreatment {
    AsDouble,
    #[default]
    AsDecimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    pub decimal_literal_treatment: DecimalLiteralTreatment,
}

impl ParseOptions {
    pub fn new(parse_decimal_literals_as_double: bool) -> Self {
        let decimal_literal_treatment = if parse_decimal_literals_as_double {
            DecimalLiteralTreatment::AsDouble
        } else {
            DecimalLiteralTreatment::AsDecimal
        };
        ParseOptions {
            decimal_literal_treatment,
        }
    }
}

/// Error produced when query text could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}:{column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        ParseError {
            message: message.into(),
            line,
            column,
        }
    }
}

impl From<ParseError> for QueryError {
    fn from(value: ParseError) -> Self {
        QueryError::new(ErrorCode::SyntaxError, value.to_string())
    }
}

/// Turns query text into a statement.
pub trait StatementParser: Debug + Sync + Send {
    fn parse(&self, sql: &str, options: &ParseOptions) -> Result<Statement, ParseError>;
}
