use crate::{
    dto::REQUIRED,
    errors::{ApiError, FieldErrors},
    models::{Post, User},
    repository::{PostRepository, UserRepository},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// A post together with the user who wrote it.
#[derive(Debug, Clone)]
pub struct AuthoredPost {
    pub post: Post,
    pub author: User,
}

pub struct Content {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    max_length: usize,
}

impl Content {
    pub fn new(
        users: Arc<dyn UserRepository>,
        posts: Arc<dyn PostRepository>,
        max_length: usize,
    ) -> Self {
        Self {
            users,
            posts,
            max_length,
        }
    }

    pub fn create_post(&self, author: &User, content: &str) -> Result<Post, ApiError> {
        let content = content.trim();
        let length = content.chars().count();

        let mut errors = FieldErrors::new();
        if content.is_empty() {
            errors.add("content", REQUIRED);
        } else if length > self.max_length {
            errors.add(
                "content",
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    self.max_length, length
                ),
            );
        }
        errors.into_result()?;

        let post = self
            .posts
            .insert_post(author.id, content.to_string(), Utc::now());

        info!("Post created: {} by user {}", post.id, author.username);

        Ok(post)
    }

    /// Every post, newest first.
    pub fn list_posts(&self) -> Vec<AuthoredPost> {
        self.posts
            .list_posts()
            .into_iter()
            .filter_map(|post| self.with_author(post))
            .collect()
    }

    pub fn posts_by(&self, author: &User) -> Vec<Post> {
        self.posts.posts_by(author.id)
    }

    pub fn get_post(&self, id: i64) -> Result<AuthoredPost, ApiError> {
        self.posts
            .find_post(id)
            .and_then(|post| self.with_author(post))
            .ok_or_else(|| ApiError::NotFound("Post not found".into()))
    }

    pub fn delete_post(&self, actor: &User, id: i64) -> Result<(), ApiError> {
        let post = self
            .posts
            .find_post(id)
            .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

        // Check ownership
        if post.user_id != actor.id {
            warn!("User {} may not delete post {}", actor.username, id);
            return Err(ApiError::Forbidden);
        }

        self.posts.delete_post(id);

        info!("Post deleted: {} by user {}", id, actor.username);

        Ok(())
    }

    fn with_author(&self, post: Post) -> Option<AuthoredPost> {
        let author = self.users.find_user(post.user_id)?;
        Some(AuthoredPost { post, author })
    }
}
