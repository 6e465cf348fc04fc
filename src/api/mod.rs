//! API Module
//!
//! HTTP handlers and routing for the cache admin API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Statistics for every partition
//! - `GET /stats/:partition` - Statistics for one partition
//! - `GET /keys/:partition` - Resident keys of one partition
//! - `POST /warm` - Run a warm pass now
//! - `POST /cleanup` - Sweep expired entries
//! - `DELETE /cache/:partition` - Clear one partition

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
