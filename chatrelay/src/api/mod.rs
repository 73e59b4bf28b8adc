//! HTTP surface of the relay.
//!
//! - **[`handlers`]**: Axum route handlers for `/api/health`, `/api/chat` and `/api/upload`
//! - **[`models`]**: Request/response bodies exchanged with the chat client
//!
//! All endpoints are documented with `utoipa`; the rendered reference is served at `/api/docs`.

pub mod handlers;
pub mod models;
