//! Key Registry
//!
//! Builds the cache keys shared by the data-access layer and the warmer.
//!
//! Keys are `:`-separated segments. Identifier segments are escaped
//! (`%` as `%25`, `:` as `%3A`), so an identifier can never reproduce the
//! shape of a different key and distinct scopes never collide.

use std::borrow::Cow;
use std::fmt::Display;

fn escape(id: &str) -> Cow<'_, str> {
    if !id.contains(['%', ':']) {
        return Cow::Borrowed(id);
    }
    let mut out = String::with_capacity(id.len() + 4);
    for c in id.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn scoped(prefix: &str, id: impl Display) -> String {
    let id = id.to_string();
    format!("{prefix}:{}", escape(&id))
}

// == Stalls ==
pub fn stall(id: impl Display) -> String {
    scoped("stall", id)
}

pub fn stalls_by_business(business_id: impl Display) -> String {
    scoped("stalls:business", business_id)
}

pub fn active_stalls() -> String {
    "stalls:active".to_string()
}

// == Products ==
pub fn product(id: impl Display) -> String {
    scoped("product", id)
}

pub fn products_by_stall(stall_id: impl Display) -> String {
    scoped("products:stall", stall_id)
}

pub fn active_products() -> String {
    "products:active".to_string()
}

// == Businesses ==
pub fn business(id: impl Display) -> String {
    scoped("business", id)
}

pub fn active_businesses() -> String {
    "businesses:active".to_string()
}

// == Orders ==
pub fn order(id: impl Display) -> String {
    scoped("order", id)
}

pub fn order_items(order_id: impl Display) -> String {
    scoped("order_items", order_id)
}

pub fn customer_orders(customer_id: impl Display) -> String {
    scoped("orders:customer", customer_id)
}

pub fn customer_order_stats(customer_id: impl Display) -> String {
    scoped("order_stats:customer", customer_id)
}

pub fn cart(customer_id: impl Display) -> String {
    scoped("cart", customer_id)
}

// == Users ==
pub fn user(id: impl Display) -> String {
    scoped("user", id)
}

/// Emails are matched case-insensitively.
pub fn user_by_email(email: &str) -> String {
    scoped("user:email", email.trim().to_lowercase())
}
