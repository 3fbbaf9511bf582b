//! Operations over the repositories, one service per aggregate.

mod accounts;
mod content;
mod likes;
mod social_graph;

pub use accounts::{Accounts, INVALID_LOGIN, Session};
pub use content::{AuthoredPost, Content};
pub use likes::Likes;
pub use social_graph::{Connection, FollowOutcome, SocialGraph, UnfollowOutcome};
