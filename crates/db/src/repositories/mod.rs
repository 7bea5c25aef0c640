//! Database repositories.

mod idea;
mod jar;
mod notification;
mod user;
mod vote;

pub use idea::IdeaRepository;
pub use jar::JarRepository;
pub use notification::NotificationRepository;
pub use user::UserRepository;
pub use vote::VoteRepository;
