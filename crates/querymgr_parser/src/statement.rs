use std::fmt;

use crate::ast::{ExplainNode, Expr, Ident, Insert, ObjectReference, QueryNode, display_separated};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropType {
    Table,
    View,
    Schema,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDef {
    pub name: Ident,
    /// Unparsed data type name.
    pub datatype: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Statement {
    Query(QueryNode),

    /// INSERT INTO ...
    Insert(Insert),

    /// EXPLAIN [ANALYZE] ...
    Explain(ExplainNode),

    /// CREATE SCHEMA ...
    CreateSchema {
        reference: ObjectReference,
        if_not_exists: bool,
    },

    /// CREATE TABLE ... [AS <query>]
    CreateTable {
        reference: ObjectReference,
        columns: Vec<ColumnDef>,
        source: Option<QueryNode>,
        if_not_exists: bool,
    },

    /// DROP ...
    Drop {
        drop_type: DropType,
        reference: ObjectReference,
        if_exists: bool,
    },

    /// SET <variable> TO <value>
    SetVariable {
        reference: ObjectReference,
        value: Expr,
    },

    /// PREPARE <name> FROM <statement>
    Prepare {
        name: Ident,
        statement: Box<Statement>,
    },

    /// EXECUTE <name> [USING <expr>, ...]
    Execute { name: Ident, parameters: Vec<Expr> },

    /// DEALLOCATE PREPARE <name>
    Deallocate { name: Ident },
}

/// The concrete kind of a statement.
///
/// Execution factories are registered per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatementKind {
    Query,
    Insert,
    Explain,
    CreateSchema,
    CreateTable,
    Drop,
    SetVariable,
    Prepare,
    Execute,
    Deallocate,
}

impl StatementKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Insert => "Insert",
            Self::Explain => "Explain",
            Self::CreateSchema => "CreateSchema",
            Self::CreateTable => "CreateTable",
            Self::Drop => "Drop",
            Self::SetVariable => "SetVariable",
            Self::Prepare => "Prepare",
            Self::Execute => "Execute",
            Self::Deallocate => "Deallocate",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::Query(_) => StatementKind::Query,
            Self::Insert(_) => StatementKind::Insert,
            Self::Explain(_) => StatementKind::Explain,
            Self::CreateSchema { .. } => StatementKind::CreateSchema,
            Self::CreateTable { .. } => StatementKind::CreateTable,
            Self::Drop { .. } => StatementKind::Drop,
            Self::SetVariable { .. } => StatementKind::SetVariable,
            Self::Prepare { .. } => StatementKind::Prepare,
            Self::Execute { .. } => StatementKind::Execute,
            Self::Deallocate { .. } => StatementKind::Deallocate,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query(query) => write!(f, "{query}"),
            Self::Insert(insert) => write!(f, "{insert}"),
            Self::Explain(explain) => write!(f, "{explain}"),
            Self::CreateSchema {
                reference,
                if_not_exists,
            } => {
                write!(f, "CREATE SCHEMA ")?;
                if *if_not_exists {
                    write!(f, "IF NOT EXISTS ")?;
                }
                write!(f, "{reference}")
            }
            Self::CreateTable {
                reference,
                columns,
                source,
                if_not_exists,
            } => {
                write!(f, "CREATE TABLE ")?;
                if *if_not_exists {
                    write!(f, "IF NOT EXISTS ")?;
                }
                write!(f, "{reference}")?;
                if !columns.is_empty() {
                    write!(f, " (")?;
                    for (idx, col) in columns.iter().enumerate() {
                        if idx > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{} {}", col.name, col.datatype)?;
                    }
                    write!(f, ")")?;
                }
                if let Some(source) = source {
                    write!(f, " AS {source}")?;
                }
                Ok(())
            }
            Self::Drop {
                drop_type,
                reference,
                if_exists,
            } => {
                let drop_type = match drop_type {
                    DropType::Table => "TABLE",
                    DropType::View => "VIEW",
                    DropType::Schema => "SCHEMA",
                };
                write!(f, "DROP {drop_type} ")?;
                if *if_exists {
                    write!(f, "IF EXISTS ")?;
                }
                write!(f, "{reference}")
            }
            Self::SetVariable { reference, value } => write!(f, "SET {reference} TO {value}"),
            Self::Prepare { name, statement } => write!(f, "PREPARE {name} FROM {statement}"),
            Self::Execute { name, parameters } => {
                write!(f, "EXECUTE {name}")?;
                if !parameters.is_empty() {
                    write!(f, " USING ")?;
                    display_separated(f, parameters, ", ")?;
                }
                Ok(())
            }
            Self::Deallocate { name } => write!(f, "DEALLOCATE PREPARE {name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Literal;

    #[test]
    fn kind_names() {
        let stmt = Statement::CreateTable {
            reference: ObjectReference::from_strings(["t1"]),
            columns: Vec::new(),
            source: None,
            if_not_exists: false,
        };
        assert_eq!(StatementKind::CreateTable, stmt.kind());
        assert_eq!("CreateTable", stmt.kind().to_string());
    }

    #[test]
    fn display_execute_using() {
        let stmt = Statement::Execute {
            name: Ident::new_unquoted("my_stmt"),
            parameters: vec![
                Expr::Literal(Literal::Number("1".to_string())),
                Expr::Literal(Literal::SingleQuotedString("a".to_string())),
            ],
        };
        assert_eq!("EXECUTE my_stmt USING 1, 'a'", stmt.to_string());
    }
}
