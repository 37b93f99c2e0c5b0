//! Database repositories.

pub mod following;
pub mod notification;
pub mod post;
pub mod user;

pub use following::FollowingRepository;
pub use notification::NotificationRepository;
pub use post::PostRepository;
pub use user::UserRepository;
