//! Response models for the admin API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing HTTP response bodies.

pub mod responses;

// Re-export commonly used types
pub use responses::{
    AllStatsResponse, CleanupResponse, ClearResponse, ErrorResponse, HealthResponse,
    KeysResponse, PartitionStatsResponse, WarmResponse,
};
