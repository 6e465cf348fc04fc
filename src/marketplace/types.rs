//! Marketplace records as the backing store returns them, and the value
//! shapes each partition caches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keys;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub id: u64,
    pub name: String,
    pub owner_id: u64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stall {
    pub id: u64,
    pub business_id: u64,
    pub name: String,
    pub cuisine: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub stall_id: u64,
    pub name: String,
    pub price_cents: u64,
    pub is_available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Business,
    Customer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub customer_id: u64,
    pub stall_id: u64,
    pub total_cents: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: u64,
    pub product_id: u64,
    pub quantity: u32,
    pub unit_price_cents: u64,
}

/// Aggregate order figures for one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerOrderStats {
    pub customer_id: u64,
    pub total_orders: u64,
    pub total_spent_cents: u64,
    pub last_order_at: Option<DateTime<Utc>>,
}

// == Cached value shapes ==

/// Value stored in the stall, product and business partitions: either one
/// record under its own key, or a list under an aggregate key.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Entity<T> {
    pub fn into_one(self) -> Option<T> {
        match self {
            Entity::One(value) => Some(value),
            Entity::Many(_) => None,
        }
    }

    pub fn into_many(self) -> Option<Vec<T>> {
        match self {
            Entity::One(_) => None,
            Entity::Many(values) => Some(values),
        }
    }
}

/// Value stored in the orders partition.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderData {
    Items(Vec<OrderItem>),
    CustomerStats(CustomerOrderStats),
}

impl OrderData {
    pub fn into_items(self) -> Option<Vec<OrderItem>> {
        match self {
            OrderData::Items(items) => Some(items),
            OrderData::CustomerStats(_) => None,
        }
    }

    pub fn into_customer_stats(self) -> Option<CustomerOrderStats> {
        match self {
            OrderData::CustomerStats(stats) => Some(stats),
            OrderData::Items(_) => None,
        }
    }
}

// == Keyed ==
/// Records that live under their own key in a partition.
pub trait Keyed {
    fn cache_key(&self) -> String;
}

impl Keyed for Stall {
    fn cache_key(&self) -> String {
        keys::stall(self.id)
    }
}

impl Keyed for Product {
    fn cache_key(&self) -> String {
        keys::product(self.id)
    }
}

impl Keyed for Business {
    fn cache_key(&self) -> String {
        keys::business(self.id)
    }
}
