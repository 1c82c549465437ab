//! Statement rewrites applied during admission.
pub mod catalog_query;
pub mod prepared_insert;

use querymgr_error::QueryError;
use querymgr_parser::Statement;
use querymgr_parser::ast::Expr;

/// Apply all admission rewrites to a parsed statement.
///
/// The input is never modified. Statements that no rewrite applies to are
/// returned as a clone.
pub fn rewrite_statement(statement: &Statement, parameters: &[Expr]) -> Result<Statement, QueryError> {
    let statement = prepared_insert::rewrite_prepared_insert(statement, parameters)?;
    let statement = catalog_query::rewrite_catalog_query(&statement, parameters);
    Ok(statement)
}

/// Check that the supplied parameters match the statement's placeholders and
/// are all constant.
pub fn validate_parameters(statement: &Statement, parameters: &[Expr]) -> Result<(), QueryError> {
    let expected = statement.parameter_count();
    if parameters.len() != expected {
        return Err(QueryError::parameter_count(expected, parameters.len()));
    }

    for param in parameters {
        if !param.is_constant() {
            return Err(QueryError::expression_not_constant(format!(
                "Parameter must be a constant expression: {param}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use querymgr_error::ErrorCode;
    use querymgr_parser::ast::{BinaryOperator, Ident, Literal};

    use super::*;
    use crate::testutil::{insert_values_statement, number, select_statement};

    #[test]
    fn validate_count_mismatch() {
        let statement = insert_values_statement(2);
        let err = validate_parameters(&statement, &[number(1)]).unwrap_err();
        assert_eq!(ErrorCode::InvalidParameterUsage, err.code);
        assert_eq!(
            "Incorrect number of parameters: expected 2 but found 1",
            err.message
        );
    }

    #[test]
    fn validate_non_constant() {
        let statement = insert_values_statement(1);
        let err = validate_parameters(&statement, &[Expr::Ident(Ident::new_unquoted("a"))])
            .unwrap_err();
        assert_eq!(ErrorCode::ExpressionNotConstant, err.code);
    }

    #[test]
    fn validate_ok() {
        let statement = insert_values_statement(2);
        let one_plus_one = Expr::BinaryExpr {
            left: Box::new(number(1)),
            op: BinaryOperator::Plus,
            right: Box::new(number(1)),
        };
        validate_parameters(&statement, &[one_plus_one, Expr::Literal(Literal::Null)]).unwrap();
        validate_parameters(&select_statement(), &[]).unwrap();
    }

    #[test]
    fn rewrite_then_validate_expanded_insert() {
        let statement = insert_values_statement(2);
        let params: Vec<_> = (0..4).map(number).collect();

        let rewritten = rewrite_statement(&statement, &params).unwrap();
        validate_parameters(&rewritten, &params).unwrap();
        assert_ne!(statement, rewritten);
    }
}
