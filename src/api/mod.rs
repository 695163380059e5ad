//! API Module
//!
//! HTTP handlers and routing for the dataset REST API.
//!
//! # Endpoints
//! - `PUT /datasets/:key?ttl=N` - Store a JSON document
//! - `GET /datasets/:key` - Retrieve a document
//! - `DELETE /datasets/:key` - Delete a document and its chunks
//! - `GET /datasets/:key/exists` - Presence check
//! - `GET /stats` - Store statistics
//! - `GET /health` - Backend health check

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
