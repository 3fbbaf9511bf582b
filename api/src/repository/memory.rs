use super::{FollowRepository, Inserted, LikeRepository, PostRepository, UserRepository};
use crate::models::{Follow, Like, Post, User};
use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use std::{
    collections::HashSet,
    sync::atomic::{AtomicI64, Ordering},
};
use uuid::Uuid;

/// `DashMap`-backed store implementing every repository trait.
///
/// Pair relations are keyed by the pair itself, so the map's entry API is
/// the unique constraint: two racing inserts for the same key resolve to
/// one `Created` and one `AlreadyExists`.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    username_index: DashMap<String, Uuid>,
    posts: DashMap<i64, Post>,
    likes: DashMap<(Uuid, i64), Like>,
    follows: DashMap<(Uuid, Uuid), Follow>,
    post_seq: AtomicI64,
    like_seq: AtomicI64,
    follow_seq: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_follows<F>(&self, keep: F) -> Vec<Follow>
    where
        F: Fn(&Follow) -> bool,
    {
        let mut edges: Vec<Follow> = self
            .follows
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        edges.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        edges
    }

    fn sorted_posts<F>(&self, keep: F) -> Vec<Post>
    where
        F: Fn(&Post) -> bool,
    {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        posts
    }
}

fn next_id(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::Relaxed) + 1
}

impl UserRepository for MemoryStore {
    fn insert_user(&self, user: User) -> Inserted {
        match self.username_index.entry(user.username.clone()) {
            Entry::Occupied(_) => Inserted::AlreadyExists,
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user);
                Inserted::Created
            }
        }
    }

    fn find_user(&self, id: Uuid) -> Option<User> {
        self.users.get(&id).map(|user| user.clone())
    }

    fn find_by_username(&self, username: &str) -> Option<User> {
        let id = *self.username_index.get(username)?;
        self.find_user(id)
    }

    fn delete_user(&self, id: Uuid) -> bool {
        let Some((_, user)) = self.users.remove(&id) else {
            return false;
        };
        self.username_index.remove(&user.username);

        let authored: HashSet<i64> = self
            .posts
            .iter()
            .filter(|entry| entry.user_id == id)
            .map(|entry| *entry.key())
            .collect();
        self.posts.retain(|_, post| post.user_id != id);
        self.likes
            .retain(|(user_id, post_id), _| *user_id != id && !authored.contains(post_id));
        self.follows
            .retain(|(follower, followee), _| *follower != id && *followee != id);
        true
    }
}

impl FollowRepository for MemoryStore {
    fn insert_follow(&self, follower: Uuid, followee: Uuid, at: DateTime<Utc>) -> Inserted {
        match self.follows.entry((follower, followee)) {
            Entry::Occupied(_) => Inserted::AlreadyExists,
            Entry::Vacant(slot) => {
                slot.insert(Follow {
                    id: next_id(&self.follow_seq),
                    follower_id: follower,
                    followee_id: followee,
                    created_at: at,
                });
                Inserted::Created
            }
        }
    }

    fn delete_follow(&self, follower: Uuid, followee: Uuid) -> bool {
        self.follows.remove(&(follower, followee)).is_some()
    }

    fn follow_exists(&self, follower: Uuid, followee: Uuid) -> bool {
        self.follows.contains_key(&(follower, followee))
    }

    fn following_of(&self, user: Uuid) -> Vec<Follow> {
        self.sorted_follows(|edge| edge.follower_id == user)
    }

    fn followers_of(&self, user: Uuid) -> Vec<Follow> {
        self.sorted_follows(|edge| edge.followee_id == user)
    }

    fn count_following(&self, user: Uuid) -> usize {
        self.follows.iter().filter(|e| e.key().0 == user).count()
    }

    fn count_followers(&self, user: Uuid) -> usize {
        self.follows.iter().filter(|e| e.key().1 == user).count()
    }
}

impl PostRepository for MemoryStore {
    fn insert_post(&self, user_id: Uuid, content: String, at: DateTime<Utc>) -> Post {
        let post = Post {
            id: next_id(&self.post_seq),
            user_id,
            content,
            created_at: at,
        };
        self.posts.insert(post.id, post.clone());
        post
    }

    fn find_post(&self, id: i64) -> Option<Post> {
        self.posts.get(&id).map(|post| post.clone())
    }

    fn list_posts(&self) -> Vec<Post> {
        self.sorted_posts(|_| true)
    }

    fn posts_by(&self, user_id: Uuid) -> Vec<Post> {
        self.sorted_posts(|post| post.user_id == user_id)
    }

    fn delete_post(&self, id: i64) -> bool {
        if self.posts.remove(&id).is_none() {
            return false;
        }
        self.likes.retain(|(_, post_id), _| *post_id != id);
        true
    }
}

impl LikeRepository for MemoryStore {
    fn insert_like(&self, user_id: Uuid, post_id: i64) -> Inserted {
        match self.likes.entry((user_id, post_id)) {
            Entry::Occupied(_) => Inserted::AlreadyExists,
            Entry::Vacant(slot) => {
                slot.insert(Like {
                    id: next_id(&self.like_seq),
                    user_id,
                    post_id,
                });
                Inserted::Created
            }
        }
    }

    fn delete_like(&self, user_id: Uuid, post_id: i64) -> bool {
        self.likes.remove(&(user_id, post_id)).is_some()
    }

    fn has_liked(&self, user_id: Uuid, post_id: i64) -> bool {
        self.likes.contains_key(&(user_id, post_id))
    }

    fn like_count(&self, post_id: i64) -> usize {
        self.likes.iter().filter(|e| e.key().1 == post_id).count()
    }
}
