//! Statement model for the query manager.
//!
//! Text parsing is provided from the outside through the [`StatementParser`]
//! trait. This crate only owns the tree shapes the admission pipeline needs
//! to inspect and rewrite, along with parameter extraction and SQL display.
pub mod ast;
pub mod parameters;
pub mod parser;
pub mod statement;

pub use parser::{DecimalLiteralTreatment, ParseError, ParseOptions, StatementParser};
pub use statement::{Statement, StatementKind};
