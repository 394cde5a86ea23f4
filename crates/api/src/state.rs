//! Shared application state.

use peerlink_common::IdGenerator;
use peerlink_core::{ConnectionRegistry, GroupService, RoutingService, SignalingRelay};

/// State shared by the control plane and the session lifecycle.
#[derive(Clone)]
pub struct AppState {
    pub registry: ConnectionRegistry,
    pub routing: RoutingService,
    pub groups: GroupService,
    pub signaling: SignalingRelay,
    pub id_gen: IdGenerator,
}
