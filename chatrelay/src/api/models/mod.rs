//! Request and response bodies of the relay API.
//!
//! Field names follow the JSON contract the browser client already speaks, which is why
//! [`upload::UploadResponse`] serializes `fileName` in camelCase while everything else is a
//! single word.

pub mod chat;
pub mod health;
pub mod upload;
