//! Apply the entity catalog to the database: CREATE TABLE with constraints, then FK indexes.
//! Tables are created parents first so REFERENCES always resolve. Every statement is idempotent.

use crate::error::{AppError, ConfigError};
use crate::model::{Catalog, ColumnInfo, EntityDef, ValidationRule};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn column_def(catalog: &Catalog, c: &ColumnInfo) -> String {
    let mut def = format!("{} {}", quote(&c.name), c.sql_type.ddl());
    if c.is_pk {
        def.push_str(" PRIMARY KEY");
        return def;
    }
    if !c.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(ref d) = c.default {
        def.push_str(" DEFAULT ");
        def.push_str(d);
    }
    if c.unique {
        def.push_str(" UNIQUE");
    }
    if let Some(target) = c.references {
        let target = catalog.entity(target);
        def.push_str(&format!(
            " REFERENCES {} ({}) ON DELETE CASCADE",
            quote(&target.table_name),
            quote(&target.pk_column)
        ));
    }
    def
}

/// CHECK expressions mirroring the request rules that the database can enforce.
fn check_exprs(column: &str, rule: &ValidationRule) -> Vec<String> {
    let col = quote(column);
    let mut out = Vec::new();
    if let Some(ref allowed) = rule.allowed {
        let values: Vec<String> = allowed.iter().map(|v| literal(v)).collect();
        out.push(format!("{} IN ({})", col, values.join(", ")));
    }
    if let Some(min) = rule.exclusive_minimum {
        out.push(format!("{} > {}", col, min));
    }
    if let Some(max) = rule.maximum {
        out.push(format!("{} <= {}", col, max));
    }
    if rule.min_length.map_or(false, |n| n > 0) {
        out.push(format!("length(trim({})) > 0", col));
    }
    out
}

pub fn create_table_sql(catalog: &Catalog, entity: &EntityDef) -> String {
    let mut defs: Vec<String> = entity.columns.iter().map(|c| column_def(catalog, c)).collect();
    for c in &entity.columns {
        let Some(rule) = entity.validation.get(&c.name) else { continue };
        for (i, expr) in check_exprs(&c.name, rule).into_iter().enumerate() {
            let name = format!("{}_{}_check{}", entity.table_name, c.name, i + 1);
            defs.push(format!("CONSTRAINT {} CHECK ({})", quote(&name), expr));
        }
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quote(&entity.table_name),
        defs.join(",\n  ")
    )
}

/// Indexes on FK columns used by per-customer joins. Unique FKs already have one.
pub fn index_sql(entity: &EntityDef) -> Vec<String> {
    entity
        .columns
        .iter()
        .filter(|c| c.references.is_some() && !c.unique)
        .map(|c| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quote(&format!("idx_{}_{}", entity.table_name, c.name)),
                quote(&entity.table_name),
                quote(&c.name)
            )
        })
        .collect()
}

pub async fn apply_migrations(pool: &PgPool, catalog: &Catalog) -> Result<(), AppError> {
    for entity in catalog.ordered() {
        let sql = create_table_sql(catalog, entity);
        tracing::debug!(%sql, "migration");
        sqlx::query(&sql).execute(pool).await?;
        for sql in index_sql(entity) {
            sqlx::query(&sql).execute(pool).await?;
        }
    }
    tracing::info!(tables = catalog.ordered().count(), "schema up to date");
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url).map_err(|e| ConfigError::Invalid {
        key: "DATABASE_URL",
        value: e.to_string(),
    })?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Split `postgres://host/db?opts` into (`postgres://host/postgres?opts`, `db`).
fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let invalid = || ConfigError::Invalid {
        key: "DATABASE_URL",
        value: url.to_string(),
    };
    let authority_start = url.find("://").ok_or_else(invalid)? + 3;
    let Some(slash) = url[authority_start..].find('/') else {
        return Ok((url.to_string(), String::new()));
    };
    let path_start = authority_start + slash + 1;
    let rest = &url[path_start..];
    let (db_name, query) = match rest.split_once('?') {
        Some((db, q)) => (db.trim(), Some(q)),
        None => (rest.trim(), None),
    };
    let mut admin_url = format!("{}postgres", &url[..path_start]);
    if let Some(q) = query {
        admin_url.push('?');
        admin_url.push_str(q);
    }
    Ok((admin_url, db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{build_catalog, EntityKind};

    #[test]
    fn payments_table_has_fk_and_checks() {
        let catalog = build_catalog();
        let sql = create_table_sql(&catalog, catalog.entity(EntityKind::Payments));
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"payments\""));
        assert!(sql.contains("\"id\" SERIAL PRIMARY KEY"));
        assert!(sql.contains("\"order_id\" INTEGER NOT NULL REFERENCES \"orders\" (\"id\") ON DELETE CASCADE"));
        assert!(sql.contains("\"amount\" > 0"));
        assert!(sql.contains("\"amount\" <= 9999999999.99"));
        assert!(sql.contains("\"order_id\" <= 2147483647"));
        assert!(sql.contains("\"payment_method\" IN ('credit_card', 'pix', 'boleto', 'bank_transfer')"));
        assert!(sql.contains("\"status\" TEXT NOT NULL DEFAULT 'pending'"));
        assert!(sql.contains("\"updated_at\" TIMESTAMPTZ NOT NULL DEFAULT NOW()"));
    }

    #[test]
    fn unique_columns_and_nullable_pdf() {
        let catalog = build_catalog();
        let sql = create_table_sql(&catalog, catalog.entity(EntityKind::Invoices));
        assert!(sql.contains("\"invoice_number\" TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("\"order_id\" INTEGER NOT NULL UNIQUE REFERENCES"));
        assert!(sql.contains("\"pdf_file\" TEXT,") || sql.contains("\"pdf_file\" TEXT\n"));
        assert!(sql.contains("length(trim(\"invoice_number\")) > 0"));
    }

    #[test]
    fn indexes_only_for_non_unique_fks() {
        let catalog = build_catalog();
        assert_eq!(
            index_sql(catalog.entity(EntityKind::OrderItems)),
            vec![
                "CREATE INDEX IF NOT EXISTS \"idx_order_items_order_id\" ON \"order_items\" (\"order_id\")".to_string(),
                "CREATE INDEX IF NOT EXISTS \"idx_order_items_product_id\" ON \"order_items\" (\"product_id\")".to_string(),
            ]
        );
        assert!(index_sql(catalog.entity(EntityKind::Contracts)).is_empty());
        assert!(index_sql(catalog.entity(EntityKind::Customers)).is_empty());
    }

    #[test]
    fn parses_database_name() {
        let (admin, db) = parse_db_name_from_url("postgres://u:p@localhost:5432/catering").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(db, "catering");

        let (admin, db) = parse_db_name_from_url("postgres://localhost/catering?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://localhost/postgres?sslmode=disable");
        assert_eq!(db, "catering");

        let (_, db) = parse_db_name_from_url("postgres://localhost").unwrap();
        assert!(db.is_empty());
        assert!(parse_db_name_from_url("not a url").is_err());
    }
}
