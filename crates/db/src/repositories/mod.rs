//! Data access repositories.

mod group;
mod group_message;
mod message;

pub use group::GroupRepository;
pub use group_message::GroupMessageRepository;
pub use message::MessageRepository;
