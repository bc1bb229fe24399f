//! SQL rendering for document tables.
//!
//! Every entity table has the shape `(key TEXT PRIMARY KEY, version BIGINT,
//! body JSONB)`. Criteria become predicates over `body` with the document
//! path and the compared value bound as parameters, so no user input is
//! ever spliced into the statement text.

use sqlx::{Postgres, QueryBuilder};

use shipping_core::traits::TableDef;
use shipping_core::types::{Criteria, FilterField, FilterOp, FilterValue, SortDirection, SortField};

/// Quote an identifier that comes from a static table definition.
pub(crate) fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal for DDL, where parameters are not allowed.
fn literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn path_segments(field: &str) -> Vec<String> {
    field.split('.').map(str::to_string).collect()
}

/// `body->'a'->>'b'` for DDL expressions.
fn text_expr(field: &str) -> String {
    let segments: Vec<&str> = field.split('.').collect();
    let mut expr = String::from("body");
    for (i, segment) in segments.iter().enumerate() {
        let arrow = if i + 1 == segments.len() { "->>" } else { "->" };
        expr.push_str(arrow);
        expr.push_str(&literal(segment));
    }
    expr
}

/// Statements that create a table, its unique indexes, and its foreign keys.
///
/// Referenced tables are created bare first so the foreign key can be
/// declared; their own constraints are added when they are first used.
/// Every statement is idempotent.
pub(crate) fn create_table_statements(table: &TableDef) -> Vec<String> {
    let mut statements = Vec::new();
    for reference in table.references {
        statements.push(bare_table(reference.table));
    }
    statements.push(bare_table(table.name));

    for set in table.unique {
        let index = format!("{}_uq_{}", table.name, set.join("_").replace('.', "_"));
        let columns: Vec<String> = set.iter().map(|field| format!("({})", text_expr(field))).collect();
        statements.push(format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
            ident(&index),
            ident(table.name),
            columns.join(", ")
        ));
    }

    for reference in table.references {
        statements.push(format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} TEXT GENERATED ALWAYS AS ({}) STORED REFERENCES {} (key)",
            ident(table.name),
            ident(&format!("ref_{}", reference.field.replace('.', "_"))),
            text_expr(reference.field),
            ident(reference.table)
        ));
    }
    statements
}

fn bare_table(name: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY, version BIGINT NOT NULL DEFAULT 1, body JSONB NOT NULL)",
        ident(name)
    )
}

/// Append `criteria` as a boolean SQL expression.
///
/// Each field predicate is wrapped in `COALESCE(.., FALSE)` so that SQL
/// `NULL` never leaks into `NOT`, matching the in-memory evaluator.
pub(crate) fn push_criteria(qb: &mut QueryBuilder<'_, Postgres>, criteria: &Criteria) {
    match criteria {
        Criteria::Field(field) => {
            qb.push("COALESCE(");
            push_field(qb, field);
            qb.push(", FALSE)");
        }
        Criteria::And(terms) => push_junction(qb, terms, " AND ", "TRUE"),
        Criteria::Or(terms) => push_junction(qb, terms, " OR ", "FALSE"),
        Criteria::Not(term) => {
            qb.push("NOT (");
            push_criteria(qb, term);
            qb.push(")");
        }
    }
}

fn push_junction(
    qb: &mut QueryBuilder<'_, Postgres>,
    terms: &[Criteria],
    separator: &str,
    empty: &str,
) {
    if terms.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        push_criteria(qb, term);
    }
    qb.push(")");
}

fn push_json(qb: &mut QueryBuilder<'_, Postgres>, field: &str) {
    qb.push("(body #> ");
    qb.push_bind(path_segments(field));
    qb.push(")");
}

fn push_text(qb: &mut QueryBuilder<'_, Postgres>, field: &str) {
    qb.push("(body #>> ");
    qb.push_bind(path_segments(field));
    qb.push(")");
}

/// Shape of the timestamps documents store; checked before `::timestamptz`.
const RFC3339_PATTERN: &str = r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])[Tt ]([01]\d|2[0-3]):[0-5]\d:[0-5]\d(\.\d+)?([Zz]|[+-]\d{2}:\d{2})$";

/// The document value converted to the SQL type of `value`, or `NULL`
/// when the stored JSON type does not match.
fn push_typed(qb: &mut QueryBuilder<'_, Postgres>, field: &str, value: &FilterValue) -> bool {
    let (json_type, cast) = match value {
        FilterValue::Boolean(_) => ("boolean", "::boolean"),
        FilterValue::Integer(_) | FilterValue::Float(_) => ("number", "::numeric"),
        FilterValue::Timestamp(_) => ("string", "::timestamptz"),
        FilterValue::Uuid(_) | FilterValue::String(_) => ("string", " COLLATE \"C\""),
        FilterValue::StringList(_) | FilterValue::Null => return false,
    };
    qb.push("(CASE WHEN jsonb_typeof");
    push_json(qb, field);
    qb.push(format!(" = '{json_type}'"));
    if matches!(value, FilterValue::Timestamp(_)) {
        // Strings that are not RFC 3339 timestamps never match.
        qb.push(" AND ");
        push_text(qb, field);
        qb.push(format!(" ~ '{RFC3339_PATTERN}'"));
    }
    qb.push(" THEN ");
    push_text(qb, field);
    qb.push(cast);
    qb.push(" END)");
    true
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Boolean(v) => {
            qb.push_bind(*v);
        }
        FilterValue::Integer(v) => {
            qb.push_bind(*v);
            qb.push("::numeric");
        }
        FilterValue::Float(v) => {
            qb.push_bind(*v);
            qb.push("::numeric");
        }
        FilterValue::Uuid(v) => {
            qb.push_bind(v.to_string());
        }
        FilterValue::Timestamp(v) => {
            qb.push_bind(*v);
        }
        FilterValue::String(v) => {
            qb.push_bind(v.clone());
        }
        FilterValue::StringList(v) => {
            qb.push_bind(v.clone());
        }
        FilterValue::Null => {
            qb.push("NULL");
        }
    }
}

fn push_comparison(
    qb: &mut QueryBuilder<'_, Postgres>,
    field: &FilterField,
    operator: &str,
) {
    if push_typed(qb, &field.field, &field.value) {
        qb.push(format!(" {operator} "));
        push_value(qb, &field.value);
    } else {
        qb.push("FALSE");
    }
}

fn push_field(qb: &mut QueryBuilder<'_, Postgres>, field: &FilterField) {
    match field.op {
        FilterOp::IsNull | FilterOp::IsNotNull => {
            if field.op == FilterOp::IsNotNull {
                qb.push("NOT ");
            }
            qb.push("(jsonb_typeof");
            push_json(qb, &field.field);
            qb.push(" IS NULL OR jsonb_typeof");
            push_json(qb, &field.field);
            qb.push(" = 'null')");
        }
        FilterOp::Eq => push_comparison(qb, field, "="),
        FilterOp::Ne => push_comparison(qb, field, "<>"),
        FilterOp::Gt => push_comparison(qb, field, ">"),
        FilterOp::Gte => push_comparison(qb, field, ">="),
        FilterOp::Lt => push_comparison(qb, field, "<"),
        FilterOp::Lte => push_comparison(qb, field, "<="),
        FilterOp::Like | FilterOp::ILike => match &field.value {
            FilterValue::String(pattern) => {
                push_scalar_text(qb, &field.field);
                qb.push(if field.op == FilterOp::ILike {
                    " ILIKE "
                } else {
                    " LIKE "
                });
                qb.push_bind(pattern.clone());
            }
            _ => {
                qb.push("FALSE");
            }
        },
        FilterOp::In => match &field.value {
            FilterValue::StringList(items) => {
                push_scalar_text(qb, &field.field);
                qb.push(" = ANY(");
                qb.push_bind(items.clone());
                qb.push(")");
            }
            _ => push_comparison(qb, field, "="),
        },
    }
}

/// Text of a string, number, or boolean document value; `NULL` otherwise.
fn push_scalar_text(qb: &mut QueryBuilder<'_, Postgres>, field: &str) {
    qb.push("(CASE WHEN jsonb_typeof");
    push_json(qb, field);
    qb.push(" IN ('string', 'number', 'boolean') THEN ");
    push_text(qb, field);
    qb.push(" END)");
}

/// Append `ORDER BY` for `order`, always ending with the primary key.
pub(crate) fn push_order(qb: &mut QueryBuilder<'_, Postgres>, order: Option<&SortField>) {
    qb.push(" ORDER BY ");
    if let Some(order) = order {
        qb.push("NULLIF(");
        push_json(qb, &order.field);
        qb.push(", 'null'::jsonb) ");
        qb.push(match order.direction {
            SortDirection::Asc => "ASC NULLS LAST, ",
            SortDirection::Desc => "DESC NULLS FIRST, ",
        });
    }
    qb.push("key COLLATE \"C\" ASC");
}
