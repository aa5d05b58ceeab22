/// Planning board derivation over store subscriptions.
pub mod board_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Join link rewriting.
pub mod join_link;
/// Session lifecycle writes (create, join, vote, reveal, new round).
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events forwarding service.
pub mod sse_service;
/// Session store connection supervisor.
pub mod storage_supervisor;
