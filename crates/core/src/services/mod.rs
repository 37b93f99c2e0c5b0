//! Business logic services.

#![allow(missing_docs)]

pub mod engagement;
pub mod feed;
pub mod following;
pub mod notification;
pub mod post;
pub mod user;

pub use engagement::EngagementService;
pub use feed::{FeedService, PostView, UserSummary};
pub use following::{FollowStats, FollowingService};
pub use notification::{NotificationService, NotificationView};
pub use post::{CreateCommentInput, CreatePostInput, MediaInput, PostService};
pub use user::{CreateUserInput, LoginInput, UserService};
