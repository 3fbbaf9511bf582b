//! Storage interfaces, one per aggregate.
//!
//! Unique pairs ((follower, followee) and (user, post)) are enforced by the
//! store itself. A create that hits an existing row reports
//! [`Inserted::AlreadyExists`] rather than an error, so callers can treat
//! duplicate requests as idempotent.

mod memory;

pub use memory::MemoryStore;

use crate::models::{Follow, Post, User};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    Created,
    AlreadyExists,
}

pub trait UserRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the username is taken.
    fn insert_user(&self, user: User) -> Inserted;
    fn find_user(&self, id: Uuid) -> Option<User>;
    fn find_by_username(&self, username: &str) -> Option<User>;
    /// Removes the user with their posts, likes and follow edges.
    fn delete_user(&self, id: Uuid) -> bool;
}

pub trait FollowRepository: Send + Sync {
    fn insert_follow(&self, follower: Uuid, followee: Uuid, at: DateTime<Utc>) -> Inserted;
    fn delete_follow(&self, follower: Uuid, followee: Uuid) -> bool;
    fn follow_exists(&self, follower: Uuid, followee: Uuid) -> bool;
    /// Edges where `user` is the follower, newest first.
    fn following_of(&self, user: Uuid) -> Vec<Follow>;
    /// Edges where `user` is the followee, newest first.
    fn followers_of(&self, user: Uuid) -> Vec<Follow>;
    fn count_following(&self, user: Uuid) -> usize;
    fn count_followers(&self, user: Uuid) -> usize;
}

pub trait PostRepository: Send + Sync {
    fn insert_post(&self, user_id: Uuid, content: String, at: DateTime<Utc>) -> Post;
    fn find_post(&self, id: i64) -> Option<Post>;
    /// All posts, newest first.
    fn list_posts(&self) -> Vec<Post>;
    fn posts_by(&self, user_id: Uuid) -> Vec<Post>;
    /// Removes the post and every like on it.
    fn delete_post(&self, id: i64) -> bool;
}

pub trait LikeRepository: Send + Sync {
    fn insert_like(&self, user_id: Uuid, post_id: i64) -> Inserted;
    fn delete_like(&self, user_id: Uuid, post_id: i64) -> bool;
    fn has_liked(&self, user_id: Uuid, post_id: i64) -> bool;
    fn like_count(&self, post_id: i64) -> usize;
}
