//! API Module
//!
//! Admin HTTP surface over the configured cache.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `GET /stats` - Aggregate statistics
//! - `GET /stats/:namespace` - Statistics for one key namespace
//! - `GET /warming` - Registered warming jobs
//! - `POST /warming/:key/refresh` - Refresh a warmed key now
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
