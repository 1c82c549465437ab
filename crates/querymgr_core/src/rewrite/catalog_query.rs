//! Rewrite `LIKE` filters in catalog introspection queries into equality.
//!
//! Some BI tools read table metadata with queries like:
//!
//! ```text
//! SELECT * FROM information_schema.tables
//! WHERE table_schema LIKE 'sales_2024' AND table_name LIKE 'orders_eu'
//! ```
//!
//! The `_` in those literals is meant literally, but as a `LIKE` pattern it
//! forces a full scan of the metadata store. Filters on `table_schema` and
//! `table_name` whose pattern has no `%` but does have an unescaped `_` are
//! turned into `=` (or `<>` for `NOT LIKE`), so `_` stops acting as a
//! wildcard for those filters.
use querymgr_parser::Statement;
use querymgr_parser::ast::{
    BinaryOperator, Expr, FromNode, FromNodeBody, Literal, QueryNode, QueryNodeBody, SelectNode,
};

const CATALOG_SCHEMA: &str = "information_schema";
const CATALOG_TABLES: [&str; 2] = ["columns", "tables"];
const FILTER_COLUMNS: [&str; 2] = ["table_schema", "table_name"];

/// Rewrite the statement if it's a catalog introspection query, otherwise
/// return a clone of it.
pub fn rewrite_catalog_query(statement: &Statement, parameters: &[Expr]) -> Statement {
    if !parameters.is_empty() {
        return statement.clone();
    }
    let Statement::Query(query) = statement else {
        return statement.clone();
    };
    if !query.order_by.is_empty() || !query.limit.is_empty() {
        return statement.clone();
    }
    let QueryNodeBody::Select(select) = &query.body else {
        return statement.clone();
    };
    if select.group_by.is_some() || select.having.is_some() {
        return statement.clone();
    }
    let (Some(from), Some(where_expr)) = (&select.from, &select.where_expr) else {
        return statement.clone();
    };
    if !is_catalog_table(from) {
        return statement.clone();
    }

    let where_expr = where_expr.transform(&mut rewrite_like);

    Statement::Query(QueryNode {
        ctes: query.ctes.clone(),
        body: QueryNodeBody::Select(Box::new(SelectNode {
            where_expr: Some(where_expr),
            ..(**select).clone()
        })),
        order_by: query.order_by.clone(),
        limit: query.limit.clone(),
    })
}

fn is_catalog_table(from: &FromNode) -> bool {
    if from.alias.is_some() {
        return false;
    }
    let FromNodeBody::BaseTable(table) = &from.body else {
        return false;
    };

    let (schema, name) = match table.reference.0.as_slice() {
        [_, schema, name] | [schema, name] => (schema, name),
        _ => return false,
    };

    schema.eq_ignore_case(CATALOG_SCHEMA) && CATALOG_TABLES.iter().any(|t| name.eq_ignore_case(t))
}

fn rewrite_like(expr: &Expr) -> Option<Expr> {
    let Expr::Like {
        expr: value,
        pattern,
        negated,
        case_insensitive: false,
        ..
    } = expr
    else {
        return None;
    };

    let Expr::Ident(ident) = value.as_ref() else {
        return None;
    };
    let Expr::Literal(Literal::SingleQuotedString(literal)) = pattern.as_ref() else {
        return None;
    };
    if !FILTER_COLUMNS.iter().any(|c| ident.eq_ignore_case(c)) {
        return None;
    }
    if literal.contains('%') || !literal.contains('_') || literal.contains("\\_") {
        return None;
    }

    let op = if *negated {
        BinaryOperator::NotEq
    } else {
        BinaryOperator::Eq
    };

    Some(Expr::BinaryExpr {
        left: value.clone(),
        op,
        right: pattern.clone(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use querymgr_parser::ast::{GroupByNode, Ident, LimitModifier, ObjectReference, SelectExpr};

    use super::*;
    use crate::testutil::number;

    fn like(column: Ident, pattern: &str, negated: bool) -> Expr {
        Expr::Like {
            expr: Box::new(Expr::Ident(column)),
            pattern: Box::new(Expr::Literal(Literal::SingleQuotedString(
                pattern.to_string(),
            ))),
            escape: None,
            negated,
            case_insensitive: false,
        }
    }

    fn and(left: Expr, right: Expr) -> Expr {
        Expr::BinaryExpr {
            left: Box::new(left),
            op: BinaryOperator::And,
            right: Box::new(right),
        }
    }

    fn select(table: &[&str], where_expr: Expr) -> SelectNode {
        SelectNode {
            distinct: None,
            projections: vec![SelectExpr::Wildcard],
            from: Some(FromNode::base_table(ObjectReference::from_strings(
                table.iter().copied(),
            ))),
            where_expr: Some(where_expr),
            group_by: None,
            having: None,
        }
    }

    fn query(select: SelectNode) -> Statement {
        Statement::Query(QueryNode::from_body(QueryNodeBody::Select(Box::new(select))))
    }

    fn rewritten_sql(statement: &Statement) -> String {
        rewrite_catalog_query(statement, &[]).to_string()
    }

    #[test]
    fn underscore_literals_become_equality() {
        let statement = query(select(
            &["information_schema", "tables"],
            and(
                like(Ident::new_unquoted("table_schema"), "sales_2024", false),
                like(Ident::new_unquoted("TABLE_NAME"), "orders_eu", false),
            ),
        ));

        assert_eq!(
            "SELECT * FROM information_schema.tables WHERE table_schema = 'sales_2024' AND TABLE_NAME = 'orders_eu'",
            rewritten_sql(&statement)
        );
    }

    #[test]
    fn input_not_modified() {
        let statement = query(select(
            &["information_schema", "tables"],
            like(Ident::new_unquoted("table_schema"), "sales_2024", false),
        ));
        let before = statement.clone();
        let _ = rewrite_catalog_query(&statement, &[]);
        assert_eq!(before, statement);
    }

    #[test]
    fn three_part_name_and_quoted_column() {
        let statement = query(select(
            &["hive", "INFORMATION_SCHEMA", "columns"],
            like(Ident::new_quoted("table_name"), "orders_eu", false),
        ));

        assert_eq!(
            "SELECT * FROM hive.INFORMATION_SCHEMA.columns WHERE \"table_name\" = 'orders_eu'",
            rewritten_sql(&statement)
        );
    }

    #[test]
    fn not_like_becomes_not_equal() {
        let statement = query(select(
            &["information_schema", "tables"],
            like(Ident::new_unquoted("table_name"), "orders_eu", true),
        ));

        assert_eq!(
            "SELECT * FROM information_schema.tables WHERE table_name <> 'orders_eu'",
            rewritten_sql(&statement)
        );
    }

    #[test]
    fn patterns_left_alone() {
        let cases = [
            // Real wildcard.
            "orders_%",
            // Nothing to rewrite.
            "orders",
            // Escaped underscore.
            "orders\\_eu",
        ];

        for pattern in cases {
            let statement = query(select(
                &["information_schema", "tables"],
                like(Ident::new_unquoted("table_name"), pattern, false),
            ));
            assert_eq!(
                statement,
                rewrite_catalog_query(&statement, &[]),
                "pattern: {pattern}"
            );
        }
    }

    #[test]
    fn other_columns_left_alone() {
        let statement = query(select(
            &["information_schema", "columns"],
            like(Ident::new_unquoted("column_name"), "order_id", false),
        ));
        assert_eq!(statement, rewrite_catalog_query(&statement, &[]));
    }

    #[test]
    fn ilike_left_alone() {
        let statement = query(select(
            &["information_schema", "tables"],
            Expr::Like {
                expr: Box::new(Expr::Ident(Ident::new_unquoted("table_name"))),
                pattern: Box::new(Expr::Literal(Literal::SingleQuotedString(
                    "orders_eu".to_string(),
                ))),
                escape: None,
                negated: false,
                case_insensitive: true,
            },
        ));
        assert_eq!(statement, rewrite_catalog_query(&statement, &[]));
    }

    #[test]
    fn non_catalog_queries_left_alone() {
        let where_expr = like(Ident::new_unquoted("table_name"), "orders_eu", false);

        // Wrong table.
        let statement = query(select(&["public", "tables"], where_expr.clone()));
        assert_eq!(statement, rewrite_catalog_query(&statement, &[]));

        // Grouped.
        let mut grouped = select(&["information_schema", "tables"], where_expr.clone());
        grouped.group_by = Some(GroupByNode::All);
        let statement = query(grouped);
        assert_eq!(statement, rewrite_catalog_query(&statement, &[]));

        // Limited.
        let mut node = QueryNode::from_body(QueryNodeBody::Select(Box::new(select(
            &["information_schema", "tables"],
            where_expr.clone(),
        ))));
        node.limit = LimitModifier {
            limit: Some(number(10)),
            offset: None,
        };
        let statement = Statement::Query(node);
        assert_eq!(statement, rewrite_catalog_query(&statement, &[]));

        // Has parameters.
        let statement = query(select(&["information_schema", "tables"], where_expr));
        assert_eq!(statement, rewrite_catalog_query(&statement, &[number(1)]));
    }
}
