//! Relay services.

pub mod group;
pub mod routing;
pub mod signaling;

pub use group::{AddMembersInput, AdminAction, AdminActionKind, CreateGroupInput, GroupService};
pub use routing::RoutingService;
pub use signaling::SignalingRelay;
