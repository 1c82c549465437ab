use std::fmt;

use super::{Expr, FromNode, Ident, ObjectReference, display_separated};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectNode {
    /// DISTINCT [ON]
    pub distinct: Option<DistinctModifier>,
    /// Projection list. May included wildcards.
    pub projections: Vec<SelectExpr>,
    /// FROM
    pub from: Option<FromNode>,
    /// WHERE
    pub where_expr: Option<Expr>,
    /// GROUP BY
    pub group_by: Option<GroupByNode>,
    /// HAVING
    pub having: Option<Expr>,
}

impl fmt::Display for SelectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if let Some(distinct) = &self.distinct {
            write!(f, "{distinct} ")?;
        }
        display_separated(f, &self.projections, ", ")?;
        if let Some(from) = &self.from {
            write!(f, " FROM {from}")?;
        }
        if let Some(where_expr) = &self.where_expr {
            write!(f, " WHERE {where_expr}")?;
        }
        if let Some(group_by) = &self.group_by {
            write!(f, " GROUP BY {group_by}")?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {having}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DistinctModifier {
    On(Vec<Expr>),
    All,
    Distinct,
}

impl fmt::Display for DistinctModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On(exprs) => {
                write!(f, "DISTINCT ON (")?;
                display_separated(f, exprs, ", ")?;
                write!(f, ")")
            }
            Self::All => write!(f, "ALL"),
            Self::Distinct => write!(f, "DISTINCT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectExpr {
    /// An unaliases expression.
    Expr(Expr),
    /// An aliased expression.
    ///
    /// `<expr> AS <ident>`
    AliasedExpr(Expr, Ident),
    /// A qualified wild card.
    ///
    /// `<reference>.*`
    QualifiedWildcard(ObjectReference),
    /// An unqualifed wild card.
    Wildcard,
}

impl fmt::Display for SelectExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expr(expr) => write!(f, "{expr}"),
            Self::AliasedExpr(expr, alias) => write!(f, "{expr} AS {alias}"),
            Self::QualifiedWildcard(reference) => write!(f, "{reference}.*"),
            Self::Wildcard => write!(f, "*"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupByNode {
    All,
    Exprs { exprs: Vec<Expr> },
}

impl fmt::Display for GroupByNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "ALL"),
            Self::Exprs { exprs } => display_separated(f, exprs, ", "),
        }
    }
}
