use std::fmt;

use super::{Expr, Ident, ObjectReference, QueryNode, display_separated};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FromNode {
    pub alias: Option<FromAlias>,
    pub body: FromNodeBody,
}

impl FromNode {
    /// Create an unaliased base table reference.
    pub fn base_table(reference: ObjectReference) -> Self {
        FromNode {
            alias: None,
            body: FromNodeBody::BaseTable(FromBaseTable { reference }),
        }
    }
}

impl fmt::Display for FromNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {alias}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FromAlias {
    pub alias: Ident,
    pub columns: Option<Vec<Ident>>,
}

impl fmt::Display for FromAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.alias)?;
        if let Some(columns) = &self.columns {
            write!(f, " (")?;
            display_separated(f, columns, ", ")?;
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FromNodeBody {
    BaseTable(FromBaseTable),
    Subquery(FromSubquery),
    TableFunction(FromTableFunction),
    Join(FromJoin),
}

impl fmt::Display for FromNodeBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BaseTable(table) => write!(f, "{}", table.reference),
            Self::Subquery(subquery) => write!(f, "({})", subquery.query),
            Self::TableFunction(func) => {
                write!(f, "{}(", func.reference)?;
                display_separated(f, &func.args, ", ")?;
                write!(f, ")")
            }
            Self::Join(join) => write!(f, "{join}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FromBaseTable {
    pub reference: ObjectReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FromSubquery {
    pub query: QueryNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FromTableFunction {
    pub reference: ObjectReference,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FromJoin {
    pub left: Box<FromNode>,
    pub right: Box<FromNode>,
    pub join_type: JoinType,
    pub join_condition: JoinCondition,
}

impl fmt::Display for FromJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = match self.join_type {
            JoinType::Cross => "CROSS JOIN",
            JoinType::Inner => "JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
        };
        write!(f, "{} {join} {}", self.left, self.right)?;
        match &self.join_condition {
            JoinCondition::On(expr) => write!(f, " ON {expr}"),
            JoinCondition::Using(cols) => {
                write!(f, " USING (")?;
                display_separated(f, cols, ", ")?;
                write!(f, ")")
            }
            JoinCondition::Natural | JoinCondition::None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Cross,
    Inner,
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JoinCondition {
    On(Expr),
    Using(Vec<Ident>),
    Natural,
    None,
}
