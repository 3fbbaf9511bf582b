use crate::{
    errors::ApiError,
    models::User,
    repository::{Inserted, LikeRepository, PostRepository},
};
use std::sync::Arc;
use tracing::{debug, info};

pub struct Likes {
    posts: Arc<dyn PostRepository>,
    likes: Arc<dyn LikeRepository>,
}

impl Likes {
    pub fn new(posts: Arc<dyn PostRepository>, likes: Arc<dyn LikeRepository>) -> Self {
        Self { posts, likes }
    }

    /// Likes the post if not already liked. Returns the post's like count.
    pub fn like(&self, user: &User, post_id: i64) -> Result<usize, ApiError> {
        self.ensure_post(post_id)?;
        match self.likes.insert_like(user.id, post_id) {
            Inserted::Created => info!("{} liked post {}", user.username, post_id),
            Inserted::AlreadyExists => debug!("{} already likes post {}", user.username, post_id),
        }
        Ok(self.likes.like_count(post_id))
    }

    /// Removes the like if present. Returns the post's like count.
    pub fn unlike(&self, user: &User, post_id: i64) -> Result<usize, ApiError> {
        self.ensure_post(post_id)?;
        if self.likes.delete_like(user.id, post_id) {
            info!("{} unliked post {}", user.username, post_id);
        }
        Ok(self.likes.like_count(post_id))
    }

    pub fn like_count(&self, post_id: i64) -> usize {
        self.likes.like_count(post_id)
    }

    pub fn has_liked(&self, user: &User, post_id: i64) -> bool {
        self.likes.has_liked(user.id, post_id)
    }

    fn ensure_post(&self, post_id: i64) -> Result<(), ApiError> {
        self.posts
            .find_post(post_id)
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound("Post not found".into()))
    }
}
