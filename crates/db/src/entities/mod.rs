//! Database entities.

pub mod group;
pub mod group_member;
pub mod group_message;
pub mod message;

pub use group::Entity as Group;
pub use group_member::Entity as GroupMember;
pub use group_message::Entity as GroupMessage;
pub use message::Entity as Message;
