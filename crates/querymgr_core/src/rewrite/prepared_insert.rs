use querymgr_error::QueryError;
use querymgr_parser::Statement;
use querymgr_parser::ast::{Expr, Insert, QueryNode, QueryNodeBody, Values};

/// Expand a single row `INSERT ... VALUES` into multiple rows when the
/// supplied parameters are a multiple of the row's placeholders.
///
/// `INSERT INTO t VALUES (?, ?)` with 6 parameters becomes three rows with
/// placeholders `0..2`, `2..4`, and `4..6`.
///
/// Returns the statement unchanged if there are no parameters, no
/// placeholders, or the counts already match.
pub fn rewrite_prepared_insert(
    statement: &Statement,
    parameters: &[Expr],
) -> Result<Statement, QueryError> {
    let placeholders = statement.parameter_count();
    let supplied = parameters.len();
    if supplied == 0 || placeholders == 0 || supplied == placeholders {
        return Ok(statement.clone());
    }

    let invalid = || QueryError::parameter_count(placeholders, supplied);

    if supplied % placeholders != 0 {
        return Err(invalid());
    }
    let Statement::Insert(insert) = statement else {
        return Err(invalid());
    };
    let QueryNodeBody::Values(values) = &insert.source.body else {
        return Err(invalid());
    };
    let [row] = values.rows.as_slice() else {
        return Err(invalid());
    };

    let rows = (0..supplied / placeholders)
        .map(|i| {
            let offset = i * placeholders;
            row.iter()
                .map(|expr| {
                    expr.transform(&mut |e| match e {
                        Expr::Parameter(pos) => Some(Expr::Parameter(offset + pos)),
                        _ => None,
                    })
                })
                .collect()
        })
        .collect();

    Ok(Statement::Insert(Insert {
        table: insert.table.clone(),
        columns: insert.columns.clone(),
        source: QueryNode {
            ctes: insert.source.ctes.clone(),
            body: QueryNodeBody::Values(Values { rows }),
            order_by: insert.source.order_by.clone(),
            limit: insert.source.limit.clone(),
        },
    }))
}
