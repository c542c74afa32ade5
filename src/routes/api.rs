//! Resource routes. Identifiers travel as query parameters, so each prefix is a single route
//! registered both with and without the trailing slash.

use crate::handlers::{auth, contracts, customers, events, invoices, order_items, orders, payments, products};
use crate::state::AppState;
use axum::{
    routing::{get, post, MethodRouter},
    Router,
};

fn both(router: Router<AppState>, path: &str, method_router: MethodRouter<AppState>) -> Router<AppState> {
    router
        .route(path, method_router.clone())
        .route(&format!("{}/", path), method_router)
}

pub fn api_routes() -> Router<AppState> {
    let mut r = Router::new();
    r = both(r, "/auth/register", post(auth::register));
    r = both(r, "/auth/login", post(auth::login));

    r = both(
        r,
        "/customers",
        get(customers::get)
            .post(auth::register)
            .put(customers::update)
            .delete(customers::delete),
    );
    r = both(r, "/customers/me", get(customers::me));
    r = both(r, "/customers/:customer_id/:related", get(customers::related));

    r = both(
        r,
        "/events",
        get(events::get).post(events::create).put(events::update).delete(events::delete),
    );
    r = both(
        r,
        "/orders",
        get(orders::get).post(orders::create).put(orders::update).delete(orders::delete),
    );
    r = both(
        r,
        "/order_items",
        get(order_items::get)
            .post(order_items::create)
            .put(order_items::update)
            .delete(order_items::delete),
    );
    r = both(
        r,
        "/payments",
        get(payments::get).post(payments::create).put(payments::update),
    );
    r = both(
        r,
        "/products",
        get(products::get)
            .post(products::create)
            .put(products::update)
            .delete(products::delete),
    );
    r = both(r, "/invoices", get(invoices::get).post(invoices::create));
    r = both(r, "/invoices/download", get(invoices::download));
    r = both(r, "/contracts", get(contracts::get).post(contracts::create));
    r = both(r, "/contracts/download", get(contracts::download));
    r
}
