//! Table definitions for the catering domain.

use super::{Catalog, ColumnInfo, EntityDef, EntityKind, FieldFormat, SqlType, ValidationRule};
use std::collections::{HashMap, HashSet};

pub const ROLES: &[&str] = &["customer", "admin"];
pub const EVENT_TYPES: &[&str] = &["wedding", "corporate", "debutante", "other"];
pub const ORDER_STATUSES: &[&str] = &["pending", "paid", "canceled"];
pub const PAYMENT_METHODS: &[&str] = &["credit_card", "pix", "boleto", "bank_transfer"];
pub const PAYMENT_STATUSES: &[&str] = &["pending", "approved", "rejected"];
pub const PRODUCT_CATEGORIES: &[&str] = &["drink", "structure", "service"];

/// Largest value an `INTEGER` column holds.
pub const MAX_INTEGER: f64 = i32::MAX as f64;
/// Largest value a `NUMERIC(12, 2)` column holds.
pub const MAX_AMOUNT: f64 = 9_999_999_999.99;

struct EntityBuilder {
    kind: EntityKind,
    columns: Vec<ColumnInfo>,
    validation: HashMap<String, ValidationRule>,
    sensitive: HashSet<String>,
    owner_column: Option<String>,
}

impl EntityBuilder {
    fn new(kind: EntityKind) -> Self {
        EntityBuilder {
            kind,
            columns: vec![ColumnInfo::primary_key("id")],
            validation: HashMap::new(),
            sensitive: HashSet::new(),
            owner_column: None,
        }
    }

    fn column(mut self, column: ColumnInfo, rule: ValidationRule) -> Self {
        self.validation.insert(column.name.clone(), rule);
        self.columns.push(column);
        self
    }

    fn sensitive(mut self, name: &str) -> Self {
        self.sensitive.insert(name.to_string());
        self
    }

    fn owned_through(mut self, fk: &str) -> Self {
        self.owner_column = Some(fk.to_string());
        self
    }

    fn build(mut self) -> EntityDef {
        self.columns.push(ColumnInfo::new("created_at", SqlType::Timestamptz).default("NOW()"));
        self.columns.push(ColumnInfo::new("updated_at", SqlType::Timestamptz).default("NOW()"));
        EntityDef {
            kind: self.kind,
            table_name: self.kind.table_name().to_string(),
            pk_column: "id".to_string(),
            columns: self.columns,
            sensitive_columns: self.sensitive,
            owner_column: self.owner_column,
            validation: self.validation,
        }
    }
}

fn fk(name: &str, target: EntityKind) -> ColumnInfo {
    ColumnInfo::new(name, SqlType::Integer).references(target)
}

fn fk_rule() -> ValidationRule {
    count_rule()
}

fn count_rule() -> ValidationRule {
    ValidationRule::required()
        .format(FieldFormat::Integer)
        .positive()
        .at_most(MAX_INTEGER)
}

fn money_rule() -> ValidationRule {
    ValidationRule::required()
        .format(FieldFormat::Number)
        .positive()
        .at_most(MAX_AMOUNT)
}

fn customers() -> EntityDef {
    EntityBuilder::new(EntityKind::Customers)
        .column(ColumnInfo::new("full_name", SqlType::Text), ValidationRule::non_empty().max_length(200))
        .column(
            ColumnInfo::new("email", SqlType::Text).unique(),
            ValidationRule::non_empty().format(FieldFormat::Email).max_length(254),
        )
        .column(ColumnInfo::new("phone", SqlType::Text), ValidationRule::non_empty().max_length(40))
        .column(ColumnInfo::new("address", SqlType::Text), ValidationRule::non_empty())
        .column(
            ColumnInfo::new("cpf_cnpj", SqlType::Text),
            ValidationRule::non_empty().format(FieldFormat::CpfCnpj),
        )
        .column(ColumnInfo::new("password_hash", SqlType::Text), ValidationRule::non_empty())
        .column(
            ColumnInfo::new("role", SqlType::Text).default("'customer'"),
            ValidationRule::optional().allowed(ROLES),
        )
        .sensitive("password_hash")
        .build()
}

fn products() -> EntityDef {
    EntityBuilder::new(EntityKind::Products)
        .column(ColumnInfo::new("name", SqlType::Text), ValidationRule::non_empty().max_length(200))
        .column(ColumnInfo::new("description", SqlType::Text).nullable(), ValidationRule::optional())
        .column(ColumnInfo::new("base_price", SqlType::Numeric), money_rule())
        .column(
            ColumnInfo::new("category", SqlType::Text),
            ValidationRule::required().allowed(PRODUCT_CATEGORIES),
        )
        .column(
            ColumnInfo::new("active", SqlType::Boolean).default("TRUE"),
            ValidationRule::optional().format(FieldFormat::Boolean),
        )
        .build()
}

fn events() -> EntityDef {
    EntityBuilder::new(EntityKind::Events)
        .column(fk("customer_id", EntityKind::Customers), fk_rule())
        .column(
            ColumnInfo::new("event_type", SqlType::Text),
            ValidationRule::required().allowed(EVENT_TYPES),
        )
        .column(
            ColumnInfo::new("event_date", SqlType::Timestamptz),
            ValidationRule::required().format(FieldFormat::Timestamp),
        )
        .column(ColumnInfo::new("location", SqlType::Text), ValidationRule::non_empty())
        .column(
            ColumnInfo::new("guest_count", SqlType::Integer),
            count_rule(),
        )
        .column(
            ColumnInfo::new("duration_hours", SqlType::Integer),
            count_rule(),
        )
        .column(
            ColumnInfo::new("budget_approved", SqlType::Boolean).default("FALSE"),
            ValidationRule::optional().format(FieldFormat::Boolean),
        )
        .owned_through("customer_id")
        .build()
}

fn orders() -> EntityDef {
    EntityBuilder::new(EntityKind::Orders)
        .column(fk("event_id", EntityKind::Events), fk_rule())
        .column(
            ColumnInfo::new("order_date", SqlType::Timestamptz).default("NOW()"),
            ValidationRule::optional().format(FieldFormat::Timestamp),
        )
        .column(ColumnInfo::new("total_amount", SqlType::Numeric), money_rule())
        .column(
            ColumnInfo::new("status", SqlType::Text).default("'pending'"),
            ValidationRule::optional().allowed(ORDER_STATUSES),
        )
        .owned_through("event_id")
        .build()
}

fn order_items() -> EntityDef {
    EntityBuilder::new(EntityKind::OrderItems)
        .column(fk("order_id", EntityKind::Orders), fk_rule())
        .column(fk("product_id", EntityKind::Products), fk_rule())
        .column(
            ColumnInfo::new("quantity", SqlType::Integer),
            count_rule(),
        )
        .column(ColumnInfo::new("unit_price", SqlType::Numeric), money_rule())
        .column(ColumnInfo::new("total_price", SqlType::Numeric), money_rule())
        .owned_through("order_id")
        .build()
}

fn payments() -> EntityDef {
    EntityBuilder::new(EntityKind::Payments)
        .column(fk("order_id", EntityKind::Orders), fk_rule())
        .column(ColumnInfo::new("amount", SqlType::Numeric), money_rule())
        .column(
            ColumnInfo::new("payment_method", SqlType::Text),
            ValidationRule::required().allowed(PAYMENT_METHODS),
        )
        .column(
            ColumnInfo::new("status", SqlType::Text).default("'pending'"),
            ValidationRule::optional().allowed(PAYMENT_STATUSES),
        )
        .column(
            ColumnInfo::new("payment_date", SqlType::Timestamptz).default("NOW()"),
            ValidationRule::optional().format(FieldFormat::Timestamp),
        )
        .owned_through("order_id")
        .build()
}

fn invoices() -> EntityDef {
    EntityBuilder::new(EntityKind::Invoices)
        .column(fk("order_id", EntityKind::Orders).unique(), fk_rule())
        .column(
            ColumnInfo::new("invoice_number", SqlType::Text).unique(),
            ValidationRule::non_empty().max_length(64),
        )
        .column(
            ColumnInfo::new("issue_date", SqlType::Timestamptz).default("NOW()"),
            ValidationRule::optional().format(FieldFormat::Timestamp),
        )
        .column(ColumnInfo::new("total_amount", SqlType::Numeric), money_rule())
        .column(ColumnInfo::new("pdf_file", SqlType::Text).nullable(), ValidationRule::optional())
        .owned_through("order_id")
        .build()
}

fn contracts() -> EntityDef {
    EntityBuilder::new(EntityKind::Contracts)
        .column(fk("event_id", EntityKind::Events).unique(), fk_rule())
        .column(ColumnInfo::new("pdf_file", SqlType::Text), ValidationRule::non_empty())
        .owned_through("event_id")
        .build()
}

pub fn build_catalog() -> Catalog {
    Catalog::new(vec![
        customers(),
        products(),
        events(),
        orders(),
        order_items(),
        payments(),
        invoices(),
        contracts(),
    ])
}
