use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's like on a post. At most one per (user, post).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: i64,
    pub user_id: Uuid,
    pub post_id: i64,
}
