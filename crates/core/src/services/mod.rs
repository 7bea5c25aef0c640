//! Business logic services.

pub mod idea;
pub mod jar;
pub mod notification;
pub mod user;
pub mod vote;

pub use idea::{CreateIdeaInput, IdeaResponse, IdeaService, UpdateIdeaInput};
pub use jar::{CreateJarInput, JarMemberResponse, JarResponse, JarService, UpdateJarInput};
pub use notification::NotificationService;
pub use user::{
    RegisterInput, UpdateProfileInput, UserResponse, UserService, XP_IDEA_ADDED, XP_IDEA_SELECTED,
    XP_VOTE_CAST, level_for_xp,
};
pub use vote::{
    LastResult, ResolveOutcome, SessionResponse, StartVoteInput, VoteService, VoteStateResponse,
    leading_ideas,
};
