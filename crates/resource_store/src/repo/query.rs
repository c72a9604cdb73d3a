//! SQL text builders for resource find-filters and update-patches.
//!
//! # Invariants
//! - Only column names, operators and keywords are spliced into SQL text;
//!   every caller-supplied value is a bound parameter.
//! - Clauses are emitted in a fixed field order, so equal requests always
//!   produce identical statements.

use crate::model::resource::{FindResource, UpdateResource};
use rusqlite::types::Value;

/// Projection shared by every list query, in row-decoder order.
const RESOURCE_COLUMNS: &[&str] = &[
    "id",
    "filename",
    "external_link",
    "type",
    "size",
    "creator_id",
    "created_ts",
    "updated_ts",
    "internal_path",
    "memo_id",
];

const BLOB_COLUMN: &str = "blob";

/// SQL text with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoundStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Builds the `SELECT` for a find-filter.
///
/// Rows come back newest first; `id` breaks ties between rows created in
/// the same second. `offset` is only applied together with `limit`.
pub(crate) fn build_list_statement(find: &FindResource) -> BoundStatement {
    let mut predicates = vec!["1 = 1"];
    let mut params: Vec<Value> = Vec::new();

    if let Some(id) = find.id {
        predicates.push("id = ?");
        params.push(Value::Integer(i64::from(id)));
    }
    if let Some(creator_id) = find.creator_id {
        predicates.push("creator_id = ?");
        params.push(Value::Integer(i64::from(creator_id)));
    }
    if let Some(filename) = find.filename.as_ref() {
        predicates.push("filename = ?");
        params.push(Value::Text(filename.clone()));
    }
    if let Some(memo_id) = find.memo_id {
        predicates.push("memo_id = ?");
        params.push(Value::Integer(i64::from(memo_id)));
    }
    if find.has_related_memo {
        predicates.push("memo_id IS NOT NULL");
    }

    let mut columns = RESOURCE_COLUMNS.to_vec();
    if find.include_blob {
        columns.push(BLOB_COLUMN);
    }

    let mut sql = format!(
        "SELECT {} FROM resource WHERE {} GROUP BY id ORDER BY created_ts DESC, id DESC",
        columns.join(", "),
        predicates.join(" AND ")
    );

    if let Some(limit) = find.limit {
        sql.push_str(" LIMIT ?");
        params.push(Value::Integer(i64::from(limit)));
        if let Some(offset) = find.offset {
            sql.push_str(" OFFSET ?");
            params.push(Value::Integer(i64::from(offset)));
        }
    }

    BoundStatement { sql, params }
}

/// Builds the `UPDATE` for a patch, or `None` when the patch assigns nothing.
///
/// The target id is always the last parameter.
pub(crate) fn build_update_statement(update: &UpdateResource) -> Option<BoundStatement> {
    let mut assignments: Vec<&str> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(updated_ts) = update.updated_ts {
        assignments.push("updated_ts = ?");
        params.push(Value::Integer(updated_ts));
    }
    if let Some(filename) = update.filename.as_ref() {
        assignments.push("filename = ?");
        params.push(Value::Text(filename.clone()));
    }
    if let Some(internal_path) = update.internal_path.as_ref() {
        assignments.push("internal_path = ?");
        params.push(Value::Text(internal_path.clone()));
    }
    if update.unbind_memo {
        assignments.push("memo_id = NULL");
    } else if let Some(memo_id) = update.memo_id {
        assignments.push("memo_id = ?");
        params.push(Value::Integer(i64::from(memo_id)));
    }
    if let Some(blob) = update.blob.as_ref() {
        assignments.push("blob = ?");
        params.push(Value::Blob(blob.clone()));
    }

    if assignments.is_empty() {
        return None;
    }

    params.push(Value::Integer(i64::from(update.id)));
    Some(BoundStatement {
        sql: format!(
            "UPDATE resource SET {} WHERE id = ?",
            assignments.join(", ")
        ),
        params,
    })
}
