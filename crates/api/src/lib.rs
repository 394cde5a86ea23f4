//! HTTP and WebSocket layer for peerlink.
//!
//! This crate provides the external surface of the relay:
//!
//! - **Endpoints**: stateless control-plane operations mounted under `/api`
//! - **Session**: the per-connection WebSocket lifecycle
//! - **State**: the service wiring shared by both
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod session;
pub mod state;

pub use endpoints::router;
pub use session::session_handler;
pub use state::AppState;
