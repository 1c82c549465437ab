use std::fmt;

use super::{Ident, ObjectReference, QueryNode, display_separated};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Insert {
    pub table: ObjectReference,
    pub columns: Vec<Ident>,
    pub source: QueryNode,
}

impl fmt::Display for Insert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INSERT INTO {}", self.table)?;
        if !self.columns.is_empty() {
            write!(f, " (")?;
            display_separated(f, &self.columns, ", ")?;
            write!(f, ")")?;
        }
        write!(f, " {}", self.source)
    }
}
