/// Planning board wire projection.
pub mod board;
/// Health check payloads.
pub mod health;
/// Session endpoint payloads.
pub mod session;
/// Server-sent event payloads.
pub mod sse;
/// Validation helpers for request payloads.
pub mod validation;
