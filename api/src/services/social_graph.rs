use crate::{
    errors::ApiError,
    models::User,
    repository::{FollowRepository, Inserted, UserRepository},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Unfollowed,
    NotFollowing,
}

/// The other end of a follow edge.
#[derive(Debug, Clone)]
pub struct Connection {
    pub user: User,
    pub since: DateTime<Utc>,
}

pub struct SocialGraph {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
}

impl SocialGraph {
    pub fn new(users: Arc<dyn UserRepository>, follows: Arc<dyn FollowRepository>) -> Self {
        Self { users, follows }
    }

    /// Checks run in order: unknown target, then self-follow, then an
    /// existing edge. Only the first two are errors.
    pub fn follow(&self, actor: &User, target: &str) -> Result<FollowOutcome, ApiError> {
        let target = self.resolve(target)?;
        if actor.id == target.id {
            warn!("{} tried to follow themselves", actor.username);
            return Err(ApiError::InvalidRequest("You can't follow yourself".into()));
        }

        match self.follows.insert_follow(actor.id, target.id, Utc::now()) {
            Inserted::Created => {
                info!("{} followed {}", actor.username, target.username);
                Ok(FollowOutcome::Followed)
            }
            Inserted::AlreadyExists => Ok(FollowOutcome::AlreadyFollowing),
        }
    }

    pub fn unfollow(&self, actor: &User, target: &str) -> Result<UnfollowOutcome, ApiError> {
        let target = self.resolve(target)?;
        if actor.id == target.id {
            warn!("{} tried to unfollow themselves", actor.username);
            return Err(ApiError::InvalidRequest("You can't unfollow yourself".into()));
        }

        if self.follows.delete_follow(actor.id, target.id) {
            info!("{} unfollowed {}", actor.username, target.username);
            Ok(UnfollowOutcome::Unfollowed)
        } else {
            Ok(UnfollowOutcome::NotFollowing)
        }
    }

    /// Users that `username` follows, newest edge first.
    pub fn list_following(&self, username: &str) -> Result<(User, Vec<Connection>), ApiError> {
        let user = self.resolve(username)?;
        let edges = self.follows.following_of(user.id);
        let connections = self.connect(edges.iter().map(|e| (e.followee_id, e.created_at)));
        Ok((user, connections))
    }

    /// Users following `username`, newest edge first.
    pub fn list_followers(&self, username: &str) -> Result<(User, Vec<Connection>), ApiError> {
        let user = self.resolve(username)?;
        let edges = self.follows.followers_of(user.id);
        let connections = self.connect(edges.iter().map(|e| (e.follower_id, e.created_at)));
        Ok((user, connections))
    }

    pub fn count_following(&self, user: &User) -> usize {
        self.follows.count_following(user.id)
    }

    pub fn count_followers(&self, user: &User) -> usize {
        self.follows.count_followers(user.id)
    }

    pub fn is_following(&self, follower: &User, followee: &User) -> bool {
        self.follows.follow_exists(follower.id, followee.id)
    }

    fn resolve(&self, username: &str) -> Result<User, ApiError> {
        self.users
            .find_by_username(username)
            .ok_or_else(|| ApiError::NotFound("User not found".into()))
    }

    fn connect<I>(&self, edges: I) -> Vec<Connection>
    where
        I: Iterator<Item = (uuid::Uuid, DateTime<Utc>)>,
    {
        // an edge whose user vanished mid-read is skipped
        edges
            .filter_map(|(id, since)| {
                self.users
                    .find_user(id)
                    .map(|user| Connection { user, since })
            })
            .collect()
    }
}
