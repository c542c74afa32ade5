//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from catalog entities.

use crate::model::{ColumnInfo, EntityDef, OwnerLink, SqlType};
use serde_json::Value;
use std::collections::HashMap;

/// Hard cap on rows returned by a list query.
pub const MAX_LIMIT: u32 = 1000;

/// Quote identifier for PostgreSQL (safe: only from catalog).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Push a value and return its placeholder cast to the column type.
    fn push_typed(&mut self, column: &ColumnInfo, v: Value) -> String {
        let n = self.push_param(v);
        format!("${}::{}", n, column.sql_type.cast())
    }
}

/// Select expression for one column. Numeric is read as float8 so it decodes to a JSON number.
fn column_expr(c: &ColumnInfo, alias: Option<&str>) -> String {
    let q = quoted(&c.name);
    let qualified = match alias {
        Some(a) => format!("{}.{}", a, q),
        None => q.clone(),
    };
    match (c.sql_type, alias) {
        (SqlType::Numeric, _) => format!("{}::float8 AS {}", qualified, q),
        (_, Some(_)) => format!("{} AS {}", qualified, q),
        (_, None) => qualified,
    }
}

/// Columns the server maintains itself; request bodies never write them.
fn is_server_managed(c: &ColumnInfo) -> bool {
    c.is_pk || c.name == "created_at" || c.name == "updated_at"
}

/// SELECT list without sensitive columns.
fn select_column_list(entity: &EntityDef, alias: Option<&str>) -> String {
    entity
        .columns
        .iter()
        .filter(|c| !entity.is_sensitive(&c.name))
        .map(|c| column_expr(c, alias))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT by primary key.
pub fn select_by_id(entity: &EntityDef, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = &entity.pk_column;
    let n = q.push_param(id.clone());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}::integer",
        select_column_list(entity, None),
        quoted(&entity.table_name),
        quoted(pk),
        n
    );
    q
}

/// SELECT list with optional filters (exact match per column), ORDER BY pk, optional LIMIT/OFFSET.
/// Filters naming unknown or sensitive columns are ignored.
pub fn select_list(
    entity: &EntityDef,
    filters: &[(String, Value)],
    limit: Option<u32>,
    offset: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (col, val) in filters {
        if entity.is_sensitive(col) {
            continue;
        }
        let Some(c) = entity.column(col) else { continue };
        let ph = q.push_typed(c, val.clone());
        where_parts.push(format!("{} = {}", quoted(col), ph));
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    let limit_clause = limit
        .map(|n| format!(" LIMIT {}", n.min(MAX_LIMIT)))
        .unwrap_or_default();
    let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}{}{}",
        select_column_list(entity, None),
        quoted(&entity.table_name),
        where_clause,
        quoted(&entity.pk_column),
        limit_clause,
        offset_clause
    );
    q
}

/// First row (lowest pk) where `column = value`. Returns None when the column is unknown.
pub fn select_by_column(entity: &EntityDef, column: &str, value: &Value) -> Option<QueryBuf> {
    let c = entity.column(column)?;
    let mut q = QueryBuf::new();
    let ph = q.push_typed(c, value.clone());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {} ORDER BY {} LIMIT 1",
        select_column_list(entity, None),
        quoted(&entity.table_name),
        quoted(column),
        ph,
        quoted(&entity.pk_column)
    );
    Some(q)
}

/// Single column of the first row where `key_column = key`. May read sensitive columns;
/// callers must not return the value to clients unless it is public.
pub fn select_column_value(entity: &EntityDef, key_column: &str, key: &Value, column: &str) -> Option<QueryBuf> {
    let key_col = entity.column(key_column)?;
    let target = entity.column(column)?;
    let mut q = QueryBuf::new();
    let ph = q.push_typed(key_col, key.clone());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {} LIMIT 1",
        column_expr(target, None),
        quoted(&entity.table_name),
        quoted(key_column),
        ph
    );
    Some(q)
}

/// Rows of `path[0]` reachable from an owner id through the FK chain in `path`.
/// `path[i].fk_column` references `path[i + 1]`'s pk; the last FK is compared to `owner_id`.
pub fn select_owned_by(path: &[OwnerLink<'_>], owner_id: &Value) -> Option<QueryBuf> {
    let first = path.first()?;
    let last_index = path.len() - 1;
    let mut q = QueryBuf::new();
    let mut from = format!("{} t0", quoted(&first.entity.table_name));
    for i in 1..path.len() {
        let prev = &path[i - 1];
        let link = &path[i];
        from.push_str(&format!(
            " JOIN {} t{} ON t{}.{} = t{}.{}",
            quoted(&link.entity.table_name),
            i,
            i - 1,
            quoted(prev.fk_column),
            i,
            quoted(&link.entity.pk_column)
        ));
    }
    let n = q.push_param(owner_id.clone());
    q.sql = format!(
        "SELECT {} FROM {} WHERE t{}.{} = ${}::integer ORDER BY t0.{}",
        select_column_list(first.entity, Some("t0")),
        from,
        last_index,
        quoted(path[last_index].fk_column),
        n,
        quoted(&first.entity.pk_column)
    );
    Some(q)
}

/// INSERT: columns from entity, values from body. Columns with a DB default are omitted when
/// the body does not provide them; the pk and audit timestamps are never inserted.
pub fn insert(entity: &EntityDef, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &entity.columns {
        if is_server_managed(c) {
            continue;
        }
        let val = body.get(&c.name).filter(|v| !v.is_null()).cloned();
        if val.is_none() && c.has_default() {
            continue;
        }
        let ph = q.push_typed(c, val.unwrap_or(Value::Null));
        cols.push(quoted(&c.name));
        placeholders.push(ph);
    }
    let returning = select_column_list(entity, None);
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quoted(&entity.table_name),
            returning
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quoted(&entity.table_name),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only columns present in body (and known to the entity), plus `updated_at`.
/// Columns are emitted in catalog order so the statement text is deterministic.
pub fn update(entity: &EntityDef, id: &Value, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in &entity.columns {
        if is_server_managed(c) {
            continue;
        }
        let Some(v) = body.get(&c.name) else { continue };
        let rhs = q.push_typed(c, v.clone());
        sets.push(format!("{} = {}", quoted(&c.name), rhs));
    }
    if entity.has_column("updated_at") {
        sets.push(format!("{} = NOW()", quoted("updated_at")));
    }
    let id_param = q.push_param(id.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}::integer RETURNING {}",
        quoted(&entity.table_name),
        sets.join(", "),
        quoted(&entity.pk_column),
        id_param,
        select_column_list(entity, None)
    );
    q
}

/// DELETE by id, returning the removed row.
pub fn delete(entity: &EntityDef, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id.clone());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${}::integer RETURNING {}",
        quoted(&entity.table_name),
        quoted(&entity.pk_column),
        n,
        select_column_list(entity, None)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{build_catalog, EntityKind};
    use serde_json::json;

    fn body(v: Value) -> HashMap<String, Value> {
        v.as_object().unwrap().clone().into_iter().collect()
    }

    #[test]
    fn select_by_id_hides_sensitive_columns() {
        let catalog = build_catalog();
        let q = select_by_id(catalog.entity(EntityKind::Customers), &json!(7));
        assert!(q.sql.starts_with("SELECT \"id\", \"full_name\", \"email\""));
        assert!(!q.sql.contains("password_hash"));
        assert!(q.sql.ends_with("FROM \"customers\" WHERE \"id\" = $1::integer"));
        assert_eq!(q.params, vec![json!(7)]);
    }

    #[test]
    fn numeric_columns_are_read_as_float() {
        let catalog = build_catalog();
        let q = select_by_id(catalog.entity(EntityKind::Payments), &json!(1));
        assert!(q.sql.contains("\"amount\"::float8 AS \"amount\""));
    }

    #[test]
    fn list_filters_known_columns_and_caps_limit() {
        let catalog = build_catalog();
        let filters = vec![
            ("status".to_string(), json!("paid")),
            ("nope".to_string(), json!(1)),
            ("event_id".to_string(), json!(3)),
        ];
        let q = select_list(catalog.entity(EntityKind::Orders), &filters, Some(5000), Some(10));
        assert!(q.sql.contains(" WHERE \"status\" = $1::text AND \"event_id\" = $2::integer"));
        assert!(q.sql.ends_with(" ORDER BY \"id\" LIMIT 1000 OFFSET 10"));
        assert_eq!(q.params, vec![json!("paid"), json!(3)]);
    }

    #[test]
    fn list_ignores_filters_on_sensitive_columns() {
        let catalog = build_catalog();
        let filters = vec![("password_hash".to_string(), json!("x"))];
        let q = select_list(catalog.entity(EntityKind::Customers), &filters, None, None);
        assert!(!q.sql.contains("WHERE"));
        assert!(q.params.is_empty());
    }

    #[test]
    fn insert_omits_defaults_and_casts_placeholders() {
        let catalog = build_catalog();
        let q = insert(
            catalog.entity(EntityKind::Orders),
            &body(json!({"event_id": 2, "total_amount": "4500.00", "id": 99})),
        );
        assert_eq!(
            q.sql,
            "INSERT INTO \"orders\" (\"event_id\", \"total_amount\") VALUES ($1::integer, $2::numeric) RETURNING \
             \"id\", \"event_id\", \"order_date\", \"total_amount\"::float8 AS \"total_amount\", \"status\", \"created_at\", \"updated_at\""
        );
        assert_eq!(q.params, vec![json!(2), json!("4500.00")]);
    }

    #[test]
    fn insert_never_writes_audit_timestamps() {
        let catalog = build_catalog();
        let q = insert(
            catalog.entity(EntityKind::Orders),
            &body(json!({
                "event_id": 2,
                "total_amount": 10,
                "created_at": "1999-01-01T00:00:00Z",
                "updated_at": "not-a-date"
            })),
        );
        assert!(q
            .sql
            .starts_with("INSERT INTO \"orders\" (\"event_id\", \"total_amount\") VALUES ($1::integer, $2::numeric)"));
        assert_eq!(q.params, vec![json!(2), json!(10)]);
    }

    #[test]
    fn insert_binds_null_for_missing_required_columns() {
        let catalog = build_catalog();
        let q = insert(catalog.entity(EntityKind::Contracts), &body(json!({"event_id": 1})));
        assert!(q.sql.contains("(\"event_id\", \"pdf_file\") VALUES ($1::integer, $2::text)"));
        assert_eq!(q.params, vec![json!(1), Value::Null]);
    }

    #[test]
    fn update_sets_present_columns_in_catalog_order() {
        let catalog = build_catalog();
        let q = update(
            catalog.entity(EntityKind::Products),
            &json!(4),
            &body(json!({"active": false, "name": "Open bar", "id": 5, "created_at": "x"})),
        );
        assert!(q.sql.starts_with(
            "UPDATE \"products\" SET \"name\" = $1::text, \"active\" = $2::boolean, \"updated_at\" = NOW() WHERE \"id\" = $3::integer RETURNING "
        ));
        assert_eq!(q.params, vec![json!("Open bar"), json!(false), json!(4)]);
    }

    #[test]
    fn delete_returns_row() {
        let catalog = build_catalog();
        let q = delete(catalog.entity(EntityKind::Events), &json!(11));
        assert!(q.sql.starts_with("DELETE FROM \"events\" WHERE \"id\" = $1::integer RETURNING \"id\""));
        assert_eq!(q.params, vec![json!(11)]);
    }

    #[test]
    fn owned_by_joins_up_to_customer() {
        let catalog = build_catalog();
        let path = catalog
            .owner_path(EntityKind::Payments, EntityKind::Customers)
            .unwrap();
        let q = select_owned_by(&path, &json!(8)).unwrap();
        assert!(q.sql.contains(
            "FROM \"payments\" t0 JOIN \"orders\" t1 ON t0.\"order_id\" = t1.\"id\" JOIN \"events\" t2 ON t1.\"event_id\" = t2.\"id\""
        ));
        assert!(q.sql.ends_with("WHERE t2.\"customer_id\" = $1::integer ORDER BY t0.\"id\""));
        assert!(q.sql.starts_with("SELECT t0.\"id\" AS \"id\", t0.\"order_id\" AS \"order_id\", t0.\"amount\"::float8 AS \"amount\""));
    }

    #[test]
    fn owned_by_direct_owner_has_no_join() {
        let catalog = build_catalog();
        let path = catalog.owner_path(EntityKind::Events, EntityKind::Customers).unwrap();
        let q = select_owned_by(&path, &json!(1)).unwrap();
        assert!(!q.sql.contains("JOIN"));
        assert!(q.sql.contains("WHERE t0.\"customer_id\" = $1::integer"));
        assert!(select_owned_by(&[], &json!(1)).is_none());
    }

    #[test]
    fn column_value_can_read_sensitive_column() {
        let catalog = build_catalog();
        let q = select_column_value(
            catalog.entity(EntityKind::Customers),
            "email",
            &json!("ana@example.com"),
            "password_hash",
        )
        .unwrap();
        assert_eq!(
            q.sql,
            "SELECT \"password_hash\" FROM \"customers\" WHERE \"email\" = $1::text LIMIT 1"
        );
        assert!(select_column_value(catalog.entity(EntityKind::Customers), "email", &json!("a"), "nope").is_none());
    }
}
