//! CrudService: generic CRUD over catalog entities using the safe SQL builder.

mod crud;
mod validation;
pub use crud::{CrudService, DEFAULT_LIMIT};
pub use validation::{as_number, RequestValidator, EMAIL_FORMAT_MESSAGE};
