//! Request and response models for the admin HTTP API
//!
//! DTOs serialized to and from JSON bodies. Values cross the wire as UTF-8
//! strings and are stored as their bytes.

pub mod requests;
pub mod responses;

pub use requests::SetRequest;
pub use responses::{
    DeleteResponse, GetResponse, HealthResponse, SetResponse, StatsResponse, WarmingResponse,
};
