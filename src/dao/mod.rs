/// Stored session and participant models.
pub mod models;
/// Key-path state tree holding sessions.
pub mod session_store;
/// Storage abstraction layer errors.
pub mod storage;
