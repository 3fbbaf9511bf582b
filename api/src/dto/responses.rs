use crate::models::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

/// Describes a form page: its name and the fields it accepts.
#[derive(Debug, Serialize)]
pub struct FormPage {
    pub form: &'static str,
    pub fields: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
}

/// Message carried by a redirect, shown on the next page.
#[derive(Debug, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub like_count: usize,
    pub liked: bool,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub is_following: bool,
    pub following_count: usize,
    pub follower_count: usize,
    pub posts: Vec<PostResponse>,
}

#[derive(Debug, Serialize)]
pub struct FollowEntry {
    pub username: String,
    pub followed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct FollowListResponse {
    pub user: String,
    pub entries: Vec<FollowEntry>,
}

#[derive(Debug, Serialize)]
pub struct LikeCountResponse {
    #[serde(rename = "likeCount")]
    pub like_count: usize,
}

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_page() -> usize {
    1
}
fn default_limit() -> usize {
    50
}

/// Paginated response wrapper
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

impl<T> PaginatedResponse<T> {
    /// Slices one page out of `items`. Pages are 1-based; a page past the end
    /// is empty.
    pub fn paginate(items: Vec<T>, params: &PaginationParams) -> Self {
        let total = items.len();
        let limit = params.limit.max(1);
        let start = params.page.saturating_sub(1).saturating_mul(limit);
        let data = items.into_iter().skip(start).take(limit).collect();

        Self {
            data,
            page: params.page,
            limit,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 2, vec![1, 2])]
    #[case(2, 2, vec![3, 4])]
    #[case(3, 2, vec![5])]
    #[case(4, 2, vec![])]
    #[case(0, 2, vec![1, 2])]
    fn paginates(#[case] page: usize, #[case] limit: usize, #[case] expected: Vec<i32>) {
        let params = PaginationParams { page, limit };
        let page = PaginatedResponse::paginate(vec![1, 2, 3, 4, 5], &params);
        assert_eq!(page.data, expected);
        assert_eq!(page.total, 5);
    }

    #[test]
    fn like_count_uses_camel_case() {
        let body = serde_json::to_value(LikeCountResponse { like_count: 3 }).unwrap();
        assert_eq!(body, serde_json::json!({ "likeCount": 3 }));
    }
}
