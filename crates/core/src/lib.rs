//! Core relay logic for peerlink.
//!
//! This crate contains the in-process machinery shared by the WebSocket
//! sessions and the control plane:
//!
//! - **Envelope codec**: the tagged JSON frames spoken on every session
//! - **Connection registry**: the process-wide endpoint-to-session map
//! - **Routing**: direct messages, receipts, offline persistence, reconnect sync
//! - **Groups**: membership, moderation, fan-out, notifications
//! - **Signaling**: verbatim peer-to-peer envelope relay

pub mod envelope;
pub mod registry;
pub mod services;

pub use registry::ConnectionRegistry;
pub use services::{GroupService, RoutingService, SignalingRelay};
