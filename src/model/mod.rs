//! Entity catalog: tables, columns, SQL types, declarative validation rules and ownership links.
//! Identifiers used in generated SQL come only from here.

mod catalog;

pub use catalog::build_catalog;

use std::collections::{HashMap, HashSet};

/// Every table the API manages, in foreign-key dependency order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Customers,
    Products,
    Events,
    Orders,
    OrderItems,
    Payments,
    Invoices,
    Contracts,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Customers,
        EntityKind::Products,
        EntityKind::Events,
        EntityKind::Orders,
        EntityKind::OrderItems,
        EntityKind::Payments,
        EntityKind::Invoices,
        EntityKind::Contracts,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            EntityKind::Customers => "customers",
            EntityKind::Products => "products",
            EntityKind::Events => "events",
            EntityKind::Orders => "orders",
            EntityKind::OrderItems => "order_items",
            EntityKind::Payments => "payments",
            EntityKind::Invoices => "invoices",
            EntityKind::Contracts => "contracts",
        }
    }

    /// Human label used in messages ("No order items found for this customer.").
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::OrderItems => "order items",
            other => other.table_name(),
        }
    }

    /// Singular label for "<X> not found" messages.
    pub fn singular(self) -> &'static str {
        match self {
            EntityKind::Customers => "Customer",
            EntityKind::Products => "Product",
            EntityKind::Events => "Event",
            EntityKind::Orders => "Order",
            EntityKind::OrderItems => "Order item",
            EntityKind::Payments => "Payment",
            EntityKind::Invoices => "Invoice",
            EntityKind::Contracts => "Contract",
        }
    }

    pub fn from_table_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.table_name() == s)
    }
}

/// Column storage type. Drives DDL, placeholder casts and select expressions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlType {
    Serial,
    Integer,
    Text,
    Numeric,
    Boolean,
    Timestamptz,
}

impl SqlType {
    pub fn ddl(self) -> &'static str {
        match self {
            SqlType::Serial => "SERIAL",
            SqlType::Integer => "INTEGER",
            SqlType::Text => "TEXT",
            SqlType::Numeric => "NUMERIC(12, 2)",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Timestamptz => "TIMESTAMPTZ",
        }
    }

    /// Type name for `$n::type` placeholder casts.
    pub fn cast(self) -> &'static str {
        match self {
            SqlType::Serial | SqlType::Integer => "integer",
            SqlType::Text => "text",
            SqlType::Numeric => "numeric",
            SqlType::Boolean => "boolean",
            SqlType::Timestamptz => "timestamptz",
        }
    }
}

/// Expected JSON shape of a request field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldFormat {
    Integer,
    /// JSON number or numeric string ("3500.00").
    Number,
    Boolean,
    /// RFC 3339 or ISO date/datetime without offset.
    Timestamp,
    /// `name@domain.com` or `name@domain.br`.
    Email,
    /// Formatted CPF (`000.000.000-00`) or CNPJ (`00.000.000/0000-00`).
    CpfCnpj,
}

#[derive(Clone, Debug, Default)]
pub struct ValidationRule {
    pub required: bool,
    pub format: Option<FieldFormat>,
    pub max_length: Option<usize>,
    pub min_length: Option<usize>,
    pub allowed: Option<Vec<String>>,
    /// Value must be strictly greater than this.
    pub exclusive_minimum: Option<f64>,
    /// Inclusive upper bound; keeps values inside the column's storage range.
    pub maximum: Option<f64>,
}

impl ValidationRule {
    pub fn required() -> Self {
        ValidationRule {
            required: true,
            ..Default::default()
        }
    }

    pub fn optional() -> Self {
        ValidationRule::default()
    }

    /// Required string that may not be blank.
    pub fn non_empty() -> Self {
        ValidationRule {
            required: true,
            min_length: Some(1),
            ..Default::default()
        }
    }

    pub fn format(mut self, format: FieldFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn allowed(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn positive(mut self) -> Self {
        self.exclusive_minimum = Some(0.0);
        self
    }

    pub fn at_most(mut self, max: f64) -> Self {
        self.maximum = Some(max);
        self
    }
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub sql_type: SqlType,
    pub is_pk: bool,
    pub nullable: bool,
    /// SQL default expression; insert omits the column when the body has no value.
    pub default: Option<String>,
    pub unique: bool,
    /// Foreign key target (always the target's primary key).
    pub references: Option<EntityKind>,
}

impl ColumnInfo {
    pub fn new(name: &str, sql_type: SqlType) -> Self {
        ColumnInfo {
            name: name.to_string(),
            sql_type,
            is_pk: false,
            nullable: false,
            default: None,
            unique: false,
            references: None,
        }
    }

    pub fn primary_key(name: &str) -> Self {
        ColumnInfo {
            is_pk: true,
            ..ColumnInfo::new(name, SqlType::Serial)
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default(mut self, expr: &str) -> Self {
        self.default = Some(expr.to_string());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn references(mut self, kind: EntityKind) -> Self {
        self.references = Some(kind);
        self
    }

    pub fn has_default(&self) -> bool {
        self.is_pk || self.default.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct EntityDef {
    pub kind: EntityKind,
    pub table_name: String,
    pub pk_column: String,
    pub columns: Vec<ColumnInfo>,
    /// Column names never returned by the API (password hashes).
    pub sensitive_columns: HashSet<String>,
    /// FK column that leads towards the owning customer.
    pub owner_column: Option<String>,
    pub validation: HashMap<String, ValidationRule>,
}

impl EntityDef {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.sensitive_columns.contains(name)
    }
}

/// One hop in a join chain: `entity.fk_column` references the next link's primary key.
#[derive(Clone, Copy, Debug)]
pub struct OwnerLink<'a> {
    pub entity: &'a EntityDef,
    pub fk_column: &'a str,
}

#[derive(Clone, Debug)]
pub struct Catalog {
    entities: HashMap<EntityKind, EntityDef>,
}

impl Catalog {
    pub fn new(entities: Vec<EntityDef>) -> Self {
        Catalog {
            entities: entities.into_iter().map(|e| (e.kind, e)).collect(),
        }
    }

    pub fn entity(&self, kind: EntityKind) -> &EntityDef {
        &self.entities[&kind]
    }

    /// Entities in foreign-key dependency order (parents first).
    pub fn ordered(&self) -> impl Iterator<Item = &EntityDef> {
        EntityKind::ALL.into_iter().filter_map(|k| self.entities.get(&k))
    }

    /// Join chain from `kind` up to the table whose FK references `owner`.
    /// Returns None when `kind` is not owned (directly or transitively) by `owner`.
    pub fn owner_path(&self, kind: EntityKind, owner: EntityKind) -> Option<Vec<OwnerLink<'_>>> {
        let mut path = Vec::new();
        let mut current = kind;
        for _ in 0..EntityKind::ALL.len() {
            let entity = self.entities.get(&current)?;
            let fk = entity.owner_column.as_deref()?;
            let target = entity.column(fk)?.references?;
            path.push(OwnerLink { entity, fk_column: fk });
            if target == owner {
                return Some(path);
            }
            current = target;
        }
        None
    }
}
