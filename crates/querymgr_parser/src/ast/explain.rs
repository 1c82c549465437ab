use std::fmt;

use crate::statement::Statement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExplainOutput {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExplainNode {
    /// EXPLAIN ANALYZE, runs the statement.
    pub analyze: bool,
    pub verbose: bool,
    pub body: Box<Statement>,
    pub output: Option<ExplainOutput>,
}

impl fmt::Display for ExplainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EXPLAIN ")?;
        if self.analyze {
            write!(f, "ANALYZE ")?;
        }
        if self.verbose {
            write!(f, "VERBOSE ")?;
        }
        match self.output {
            Some(ExplainOutput::Text) => write!(f, "(FORMAT TEXT) ")?,
            Some(ExplainOutput::Json) => write!(f, "(FORMAT JSON) ")?,
            None => (),
        }
        write!(f, "{}", self.body)
    }
}
