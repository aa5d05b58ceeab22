//! Library crate for the planning poker backend, exposing modules for binaries and integration tests.

/// Runtime configuration loading.
pub mod config;
/// Session store abstraction, backends and stored models.
pub mod dao;
/// Request and response payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Business operations on planning sessions.
pub mod services;
/// Shared application state and board derivation.
pub mod state;
