use std::fmt;

use super::{Expr, Ident, SelectNode, display_separated};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryNode {
    pub ctes: Option<CommonTableExprDefs>,
    pub body: QueryNodeBody,
    pub order_by: Vec<OrderByNode>,
    pub limit: LimitModifier,
}

impl QueryNode {
    /// Create a query node with just a body.
    pub fn from_body(body: QueryNodeBody) -> Self {
        QueryNode {
            ctes: None,
            body,
            order_by: Vec::new(),
            limit: LimitModifier::default(),
        }
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ctes) = &self.ctes {
            write!(f, "{ctes} ")?;
        }
        write!(f, "{}", self.body)?;
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY ")?;
            display_separated(f, &self.order_by, ", ")?;
        }
        write!(f, "{}", self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryNodeBody {
    Select(Box<SelectNode>),
    Nested(Box<QueryNode>),
    Set {
        left: Box<QueryNodeBody>,
        right: Box<QueryNodeBody>,
        operation: SetOperation,
        all: bool,
    },
    Values(Values),
}

impl fmt::Display for QueryNodeBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(select) => write!(f, "{select}"),
            Self::Nested(query) => write!(f, "({query})"),
            Self::Set {
                left,
                right,
                operation,
                all,
            } => {
                let all = if *all { " ALL" } else { "" };
                write!(f, "{left} {operation}{all} {right}")
            }
            Self::Values(values) => write!(f, "{values}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOperation {
    Union,
    Except,
    Intersect,
}

impl fmt::Display for SetOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Union => write!(f, "UNION"),
            Self::Except => write!(f, "EXCEPT"),
            Self::Intersect => write!(f, "INTERSECT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Values {
    pub rows: Vec<Vec<Expr>>,
}

impl fmt::Display for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VALUES ")?;
        for (idx, row) in self.rows.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "(")?;
            display_separated(f, row, ", ")?;
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommonTableExprDefs {
    pub recursive: bool,
    pub ctes: Vec<CommonTableExpr>,
}

impl fmt::Display for CommonTableExprDefs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WITH ")?;
        if self.recursive {
            write!(f, "RECURSIVE ")?;
        }
        display_separated(f, &self.ctes, ", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommonTableExpr {
    pub alias: Ident,
    pub column_aliases: Vec<Ident>,
    pub body: Box<QueryNode>,
}

impl fmt::Display for CommonTableExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.alias)?;
        if !self.column_aliases.is_empty() {
            write!(f, " (")?;
            display_separated(f, &self.column_aliases, ", ")?;
            write!(f, ")")?;
        }
        write!(f, " AS ({})", self.body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderByDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderByNode {
    pub expr: Expr,
    pub direction: Option<OrderByDirection>,
}

impl fmt::Display for OrderByNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        match self.direction {
            Some(OrderByDirection::Asc) => write!(f, " ASC"),
            Some(OrderByDirection::Desc) => write!(f, " DESC"),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LimitModifier {
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

impl LimitModifier {
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }
}

impl fmt::Display for LimitModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(limit) = &self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = &self.offset {
            write!(f, " OFFSET {offset}")?;
        }
        Ok(())
    }
}
