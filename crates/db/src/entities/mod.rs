//! Database entities.

pub mod idea;
pub mod jar;
pub mod jar_member;
pub mod notification;
pub mod user;
pub mod vote;
pub mod vote_session;

pub use idea::Entity as Idea;
pub use jar::Entity as Jar;
pub use jar_member::Entity as JarMember;
pub use notification::Entity as Notification;
pub use user::Entity as User;
pub use vote::Entity as Vote;
pub use vote_session::Entity as VoteSession;
