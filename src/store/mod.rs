//! Persistence seam.
//!
//! Every operation that touches more than one entity (like + notification,
//! comment + notification, follow edge + notification, conversation upsert)
//! is a single atomic call here, so handlers never run check-then-act
//! sequences against shared state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    auth::{NewUser, User},
    conversations::Conversation,
    notifications::Notification,
    posts::{Comment, NewPost, Post, PostDocument},
    stories::{NewStory, Story},
    users::ProfileUpdate,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Limit/offset window for list queries.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureSlot {
    Profile,
    Cover,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when username, email or phone is taken.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Batch lookup; unknown ids are skipped.
    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    async fn list_users_except(&self, id: Uuid) -> StoreResult<Vec<User>>;

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<User>;

    async fn set_picture(&self, id: Uuid, slot: PictureSlot, url: &str) -> StoreResult<User>;
}

#[async_trait]
pub trait SocialGraph: Send + Sync {
    /// Creates the edge `follower -> target` and notifies the target.
    /// Returns `false` (and writes nothing) when the edge already existed.
    async fn follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool>;

    /// Returns `false` when there was no edge to remove.
    async fn unfollow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool>;

    async fn followers(&self, id: Uuid) -> StoreResult<Vec<Uuid>>;

    async fn following(&self, id: Uuid) -> StoreResult<Vec<Uuid>>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert_post(&self, post: NewPost) -> StoreResult<Post>;

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<PostDocument>>;

    /// Newest first, optionally restricted to one author.
    async fn list_posts(&self, author: Option<Uuid>, page: Page)
        -> StoreResult<Vec<PostDocument>>;

    /// Batch lookup of bare posts; unknown ids are skipped.
    async fn find_posts(&self, ids: &[Uuid]) -> StoreResult<Vec<Post>>;

    /// Flips the like of `user` on `post_id`. Liking notifies the author.
    /// Returns whether the post is liked by `user` afterwards.
    async fn toggle_like(&self, post_id: Uuid, user: Uuid) -> StoreResult<bool>;

    /// Appends a comment and notifies the author.
    async fn add_comment(&self, post_id: Uuid, author: Uuid, text: &str) -> StoreResult<Comment>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Idempotent: the unordered pair maps to exactly one conversation.
    async fn get_or_create_conversation(&self, a: Uuid, b: Uuid) -> StoreResult<Conversation>;

    async fn conversations_for(&self, user: Uuid) -> StoreResult<Vec<Conversation>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Inbox of `user`, newest first.
    async fn notifications_for(&self, user: Uuid) -> StoreResult<Vec<Notification>>;
}

#[async_trait]
pub trait StoryStore: Send + Sync {
    async fn insert_story(&self, story: NewStory) -> StoreResult<Story>;

    /// Stories of `authors` created at or after `since`, newest first.
    async fn stories_by(&self, authors: &[Uuid], since: DateTime<Utc>)
        -> StoreResult<Vec<Story>>;
}

pub trait Store:
    UserStore + SocialGraph + PostStore + ConversationStore + NotificationStore + StoryStore
{
}

impl<T> Store for T where
    T: UserStore + SocialGraph + PostStore + ConversationStore + NotificationStore + StoryStore
{
}

/// Canonical (low, high) ordering of a member pair.
pub fn member_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_limit_and_offset() {
        let page = Page::new(Some(500), Some(-3));
        assert_eq!(page.limit, Page::MAX_LIMIT);
        assert_eq!(page.offset, 0);

        let page = Page::default();
        assert_eq!(page.limit, Page::DEFAULT_LIMIT);
    }

    #[test]
    fn member_pair_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(member_pair(a, b), member_pair(b, a));
        let (low, high) = member_pair(a, b);
        assert!(low <= high);
    }
}
