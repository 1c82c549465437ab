//! Parameter placeholder extraction.
use crate::ast::{
    DistinctModifier, Expr, FromNode, FromNodeBody, GroupByNode, JoinCondition, QueryNode,
    QueryNodeBody, SelectExpr, SelectNode,
};
use crate::statement::Statement;

impl Statement {
    /// Count every parameter placeholder in the statement.
    ///
    /// Placeholders inside a `PREPARE` body belong to the prepared statement
    /// and are not counted, neither are the values of an `EXECUTE ... USING`.
    pub fn parameter_count(&self) -> usize {
        let mut counter = ParameterCounter::default();
        counter.visit_statement(self);
        counter.count
    }
}

impl Expr {
    pub fn parameter_count(&self) -> usize {
        let mut counter = ParameterCounter::default();
        counter.visit_expr(self);
        counter.count
    }
}

#[derive(Debug, Default)]
struct ParameterCounter {
    count: usize,
}

impl ParameterCounter {
    fn visit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Query(query) => self.visit_query(query),
            Statement::Insert(insert) => self.visit_query(&insert.source),
            Statement::Explain(explain) => self.visit_statement(&explain.body),
            Statement::CreateTable {
                source: Some(source),
                ..
            } => self.visit_query(source),
            Statement::SetVariable { value, .. } => self.visit_expr(value),
            Statement::CreateTable { source: None, .. }
            | Statement::CreateSchema { .. }
            | Statement::Drop { .. }
            | Statement::Prepare { .. }
            | Statement::Execute { .. }
            | Statement::Deallocate { .. } => (),
        }
    }

    fn visit_query(&mut self, query: &QueryNode) {
        if let Some(ctes) = &query.ctes {
            for cte in &ctes.ctes {
                self.visit_query(&cte.body);
            }
        }
        self.visit_query_body(&query.body);
        for order_by in &query.order_by {
            self.visit_expr(&order_by.expr);
        }
        if let Some(limit) = &query.limit.limit {
            self.visit_expr(limit);
        }
        if let Some(offset) = &query.limit.offset {
            self.visit_expr(offset);
        }
    }

    fn visit_query_body(&mut self, body: &QueryNodeBody) {
        match body {
            QueryNodeBody::Select(select) => self.visit_select(select),
            QueryNodeBody::Nested(query) => self.visit_query(query),
            QueryNodeBody::Set { left, right, .. } => {
                self.visit_query_body(left);
                self.visit_query_body(right);
            }
            QueryNodeBody::Values(values) => {
                for row in &values.rows {
                    for expr in row {
                        self.visit_expr(expr);
                    }
                }
            }
        }
    }

    fn visit_select(&mut self, select: &SelectNode) {
        if let Some(DistinctModifier::On(exprs)) = &select.distinct {
            for expr in exprs {
                self.visit_expr(expr);
            }
        }
        for projection in &select.projections {
            match projection {
                SelectExpr::Expr(expr) | SelectExpr::AliasedExpr(expr, _) => self.visit_expr(expr),
                SelectExpr::QualifiedWildcard(_) | SelectExpr::Wildcard => (),
            }
        }
        if let Some(from) = &select.from {
            self.visit_from(from);
        }
        if let Some(where_expr) = &select.where_expr {
            self.visit_expr(where_expr);
        }
        if let Some(GroupByNode::Exprs { exprs }) = &select.group_by {
            for expr in exprs {
                self.visit_expr(expr);
            }
        }
        if let Some(having) = &select.having {
            self.visit_expr(having);
        }
    }

    fn visit_from(&mut self, from: &FromNode) {
        match &from.body {
            FromNodeBody::BaseTable(_) => (),
            FromNodeBody::Subquery(subquery) => self.visit_query(&subquery.query),
            FromNodeBody::TableFunction(func) => {
                for arg in &func.args {
                    self.visit_expr(arg);
                }
            }
            FromNodeBody::Join(join) => {
                self.visit_from(&join.left);
                self.visit_from(&join.right);
                if let JoinCondition::On(expr) = &join.join_condition {
                    self.visit_expr(expr);
                }
            }
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Parameter(_) => self.count += 1,
            Expr::Ident(_) | Expr::CompoundIdent(_) | Expr::Literal(_) => (),
            Expr::UnaryExpr { expr, .. } | Expr::IsNull { expr, .. } | Expr::Nested(expr) => {
                self.visit_expr(expr)
            }
            Expr::BinaryExpr { left, right, .. } => {
                self.visit_expr(left);
                self.visit_expr(right);
            }
            Expr::Like {
                expr,
                pattern,
                escape,
                ..
            } => {
                self.visit_expr(expr);
                self.visit_expr(pattern);
                if let Some(escape) = escape {
                    self.visit_expr(escape);
                }
            }
            Expr::InList { expr, list, .. } => {
                self.visit_expr(expr);
                for item in list {
                    self.visit_expr(item);
                }
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                self.visit_expr(expr);
                self.visit_expr(low);
                self.visit_expr(high);
            }
            Expr::Function { args, .. } => {
                for arg in args {
                    self.visit_expr(arg);
                }
            }
            Expr::Subquery(query) => self.visit_query(query),
            Expr::Exists { subquery, .. } => self.visit_query(subquery),
        }
    }
}
