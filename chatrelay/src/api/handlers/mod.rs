//! HTTP request handlers.
//!
//! - [`health`]: liveness probe
//! - [`chat`]: forwards a single user message to the provider
//! - [`upload`]: stores an uploaded file, asks the provider to analyse it, then removes it
//!
//! Handlers return [`crate::errors::Error`], which renders as `{"error": "..."}` with the
//! matching status code.

pub mod chat;
pub mod health;
pub mod upload;
