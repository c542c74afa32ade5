//! HTTP handlers, one module per resource.

pub mod auth;
pub mod common;
pub mod contracts;
pub mod customers;
pub mod events;
pub mod invoices;
pub mod order_items;
pub mod orders;
pub mod payments;
pub mod products;
