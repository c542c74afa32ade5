//! Generic CRUD execution against PostgreSQL.

use crate::error::AppError;
use crate::model::{EntityDef, OwnerLink};
use crate::sql::{
    delete, insert, select_by_column, select_by_id, select_column_value, select_list, select_owned_by, update,
    PgBindValue, QueryBuf,
};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;

pub const DEFAULT_LIMIT: u32 = 100;

pub struct CrudService;

impl CrudService {
    /// List rows with optional filters (exact match), limit (default 100, max 1000), offset (default 0).
    pub async fn list(
        pool: &PgPool,
        entity: &EntityDef,
        filters: &[(String, Value)],
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Value>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let offset = offset.unwrap_or(0);
        let q = select_list(entity, filters, Some(limit), Some(offset));
        Self::query_many(pool, &q).await
    }

    /// Fetch one row by primary key.
    pub async fn read(pool: &PgPool, entity: &EntityDef, id: i64) -> Result<Option<Value>, AppError> {
        let q = select_by_id(entity, &Value::from(id));
        Self::query_optional(pool, &q).await
    }

    /// First row where `column = value` (e.g. invoice by order, customer by email).
    pub async fn find_one_by(
        pool: &PgPool,
        entity: &EntityDef,
        column: &str,
        value: &Value,
    ) -> Result<Option<Value>, AppError> {
        let q = select_by_column(entity, column, value)
            .ok_or_else(|| AppError::Internal(format!("unknown column {}.{}", entity.table_name, column)))?;
        Self::query_optional(pool, &q).await
    }

    /// Single column value of the row keyed by `key_column = key`.
    /// Outer None: no such row. Inner Value may be null.
    pub async fn fetch_column(
        pool: &PgPool,
        entity: &EntityDef,
        key_column: &str,
        key: &Value,
        column: &str,
    ) -> Result<Option<Value>, AppError> {
        let q = select_column_value(entity, key_column, key, column).ok_or_else(|| {
            AppError::Internal(format!("unknown column {}.{} or {}", entity.table_name, key_column, column))
        })?;
        let row = Self::query_optional(pool, &q).await?;
        Ok(row.map(|mut r| r.get_mut(column).map(Value::take).unwrap_or(Value::Null)))
    }

    /// Rows of `path[0]` owned by `owner_id` through the FK chain.
    pub async fn list_owned_by(
        pool: &PgPool,
        path: &[OwnerLink<'_>],
        owner_id: i64,
    ) -> Result<Vec<Value>, AppError> {
        let q = select_owned_by(path, &Value::from(owner_id))
            .ok_or_else(|| AppError::Internal("empty ownership path".into()))?;
        Self::query_many(pool, &q).await
    }

    /// Insert one row. Returns the created row.
    pub async fn create(
        pool: &PgPool,
        entity: &EntityDef,
        body: &HashMap<String, Value>,
    ) -> Result<Value, AppError> {
        let q = insert(entity, body);
        Self::query_optional(pool, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Update one row by id. Returns the updated row, or None when the id does not exist.
    pub async fn update(
        pool: &PgPool,
        entity: &EntityDef,
        id: i64,
        body: &HashMap<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let q = update(entity, &Value::from(id), body);
        Self::query_optional(pool, &q).await
    }

    /// Delete one row by id. Returns the deleted row or None.
    pub async fn delete(pool: &PgPool, entity: &EntityDef, id: i64) -> Result<Option<Value>, AppError> {
        let q = delete(entity, &Value::from(id));
        Self::query_optional(pool, &q).await
    }

    async fn query_optional(pool: &PgPool, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = query.fetch_optional(pool).await?;
        Ok(row.map(|r| row_to_json(&r)))
    }

    async fn query_many(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
