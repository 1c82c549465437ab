use std::fmt;

use super::{Ident, ObjectReference, QueryNode, display_separated};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// Plus, e.g. `+9`
    Plus,
    /// Minus, e.g. `-9`
    Minus,
    /// Not, e.g. `NOT(true)`
    Not,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Not => write!(f, "NOT "),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// Plus, e.g. `a + b`
    Plus,
    /// Minus, e.g. `a - b`
    Minus,
    /// Multiply, e.g. `a * b`
    Multiply,
    /// Divide, e.g. `a / b`
    Divide,
    /// Modulo, e.g. `a % b`
    Modulo,
    /// String/Array Concat operator, e.g. `a || b`
    StringConcat,
    /// Greater than, e.g. `a > b`
    Gt,
    /// Less than, e.g. `a < b`
    Lt,
    /// Greater equal, e.g. `a >= b`
    GtEq,
    /// Less equal, e.g. `a <= b`
    LtEq,
    /// Equal, e.g. `a = b`
    Eq,
    /// Not equal, e.g. `a <> b`
    NotEq,
    /// And, e.g. `a AND b`
    And,
    /// Or, e.g. `a OR b`
    Or,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::StringConcat => "||",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::GtEq => ">=",
            Self::LtEq => "<=",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::And => "AND",
            Self::Or => "OR",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    /// Unparsed number literal.
    Number(String),
    /// String literal.
    SingleQuotedString(String),
    /// Boolean literal.
    Boolean(bool),
    /// Null literal
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::SingleQuotedString(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Boolean(true) => write!(f, "TRUE"),
            Self::Boolean(false) => write!(f, "FALSE"),
            Self::Null => write!(f, "NULL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Column or table identifier.
    Ident(Ident),
    /// Compound identifier.
    ///
    /// `table.col`
    CompoundIdent(Vec<Ident>),
    /// An expression literal,
    Literal(Literal),
    /// A bound parameter placeholder.
    ///
    /// Holds the zero-based position of the placeholder in the statement.
    Parameter(usize),
    /// A unary expression.
    UnaryExpr { op: UnaryOperator, expr: Box<Expr> },
    /// A binary expression.
    BinaryExpr {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// `<expr> [NOT] LIKE <pattern> [ESCAPE <escape>]`
    ///
    /// ILIKE when `case_insensitive` is set.
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<Box<Expr>>,
        negated: bool,
        case_insensitive: bool,
    },
    /// `<expr> IS [NOT] NULL`
    IsNull { expr: Box<Expr>, negated: bool },
    /// `<expr> [NOT] IN (<list>)`
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// `<expr> [NOT] BETWEEN <low> AND <high>`
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    /// A function call.
    Function {
        reference: ObjectReference,
        args: Vec<Expr>,
        distinct: bool,
    },
    /// A parenthesized expression.
    Nested(Box<Expr>),
    /// A scalar subquery.
    Subquery(Box<QueryNode>),
    /// `[NOT] EXISTS (<subquery>)`
    Exists {
        subquery: Box<QueryNode>,
        not_exists: bool,
    },
}

impl Expr {
    /// Return a new expression tree with nodes replaced by `f`.
    ///
    /// `f` is called on a node before its children. Returning `Some` replaces
    /// the node, and the replacement is not visited further. Returning `None`
    /// rebuilds the node from its transformed children.
    ///
    /// Subquery bodies are not descended into.
    pub fn transform<F>(&self, f: &mut F) -> Expr
    where
        F: FnMut(&Expr) -> Option<Expr>,
    {
        if let Some(replaced) = f(self) {
            return replaced;
        }

        match self {
            Expr::UnaryExpr { op, expr } => Expr::UnaryExpr {
                op: *op,
                expr: Box::new(expr.transform(f)),
            },
            Expr::BinaryExpr { left, op, right } => Expr::BinaryExpr {
                left: Box::new(left.transform(f)),
                op: *op,
                right: Box::new(right.transform(f)),
            },
            Expr::Like {
                expr,
                pattern,
                escape,
                negated,
                case_insensitive,
            } => Expr::Like {
                expr: Box::new(expr.transform(f)),
                pattern: Box::new(pattern.transform(f)),
                escape: escape.as_ref().map(|e| Box::new(e.transform(f))),
                negated: *negated,
                case_insensitive: *case_insensitive,
            },
            Expr::IsNull { expr, negated } => Expr::IsNull {
                expr: Box::new(expr.transform(f)),
                negated: *negated,
            },
            Expr::InList {
                expr,
                list,
                negated,
            } => Expr::InList {
                expr: Box::new(expr.transform(f)),
                list: list.iter().map(|e| e.transform(f)).collect(),
                negated: *negated,
            },
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => Expr::Between {
                expr: Box::new(expr.transform(f)),
                low: Box::new(low.transform(f)),
                high: Box::new(high.transform(f)),
                negated: *negated,
            },
            Expr::Function {
                reference,
                args,
                distinct,
            } => Expr::Function {
                reference: reference.clone(),
                args: args.iter().map(|e| e.transform(f)).collect(),
                distinct: *distinct,
            },
            Expr::Nested(expr) => Expr::Nested(Box::new(expr.transform(f))),
            Expr::Ident(_)
            | Expr::CompoundIdent(_)
            | Expr::Literal(_)
            | Expr::Parameter(_)
            | Expr::Subquery(_)
            | Expr::Exists { .. } => self.clone(),
        }
    }

    /// Returns true if this expression can be evaluated without a row.
    ///
    /// Column references and subqueries make an expression non-constant.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Ident(_) | Expr::CompoundIdent(_) => false,
            Expr::Subquery(_) | Expr::Exists { .. } => false,
            Expr::Literal(_) | Expr::Parameter(_) => true,
            Expr::UnaryExpr { expr, .. } => expr.is_constant(),
            Expr::BinaryExpr { left, right, .. } => left.is_constant() && right.is_constant(),
            Expr::Like {
                expr,
                pattern,
                escape,
                ..
            } => {
                expr.is_constant()
                    && pattern.is_constant()
                    && escape.as_ref().is_none_or(|e| e.is_constant())
            }
            Expr::IsNull { expr, .. } => expr.is_constant(),
            Expr::InList { expr, list, .. } => {
                expr.is_constant() && list.iter().all(|e| e.is_constant())
            }
            Expr::Between {
                expr, low, high, ..
            } => expr.is_constant() && low.is_constant() && high.is_constant(),
            Expr::Function { args, .. } => args.iter().all(|e| e.is_constant()),
            Expr::Nested(expr) => expr.is_constant(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(ident) => write!(f, "{ident}"),
            Self::CompoundIdent(idents) => display_separated(f, idents, "."),
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Parameter(_) => write!(f, "?"),
            Self::UnaryExpr { op, expr } => write!(f, "{op}{expr}"),
            Self::BinaryExpr { left, op, right } => write!(f, "{left} {op} {right}"),
            Self::Like {
                expr,
                pattern,
                escape,
                negated,
                case_insensitive,
            } => {
                let not = if *negated { "NOT " } else { "" };
                let like = if *case_insensitive { "ILIKE" } else { "LIKE" };
                write!(f, "{expr} {not}{like} {pattern}")?;
                if let Some(escape) = escape {
                    write!(f, " ESCAPE {escape}")?;
                }
                Ok(())
            }
            Self::IsNull { expr, negated } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{expr} IS {not}NULL")
            }
            Self::InList {
                expr,
                list,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{expr} {not}IN (")?;
                display_separated(f, list, ", ")?;
                write!(f, ")")
            }
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{expr} {not}BETWEEN {low} AND {high}")
            }
            Self::Function {
                reference,
                args,
                distinct,
            } => {
                write!(f, "{reference}(")?;
                if *distinct {
                    write!(f, "DISTINCT ")?;
                }
                display_separated(f, args, ", ")?;
                write!(f, ")")
            }
            Self::Nested(expr) => write!(f, "({expr})"),
            Self::Subquery(query) => write!(f, "({query})"),
            Self::Exists {
                subquery,
                not_exists,
            } => {
                let not = if *not_exists { "NOT " } else { "" };
                write!(f, "{not}EXISTS ({subquery})")
            }
        }
    }
}
