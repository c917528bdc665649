use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub mod handler;
pub mod view;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub image: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub content: String,
    pub image: String,
}

/// Database model for a comment. `seq` breaks ties between equal timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub is_deleted: bool,
    pub seq: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A post with its likes and comments, comments newest first.
#[derive(Debug, Clone)]
pub struct PostDocument {
    pub post: Post,
    pub likes: Vec<Uuid>,
    pub comments: Vec<Comment>,
}

impl PostDocument {
    pub fn is_liked_by(&self, user: Uuid) -> bool {
        self.likes.contains(&user)
    }
}

/// Newest-first comment order shared by every store.
pub fn sort_comments(comments: &mut [Comment]) {
    comments.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.seq.cmp(&a.seq))
    });
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateComment {
    #[validate(length(
        min = 1,
        max = 2000,
        message = "Comment must be between 1 and 2000 characters"
    ))]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct PostFilter {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub author: AuthorResponse,
    pub content: String,
    pub image: String,
    /// Presence means liked.
    pub likes: HashMap<Uuid, bool>,
    pub comments: Vec<CommentResponse>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub text: String,
    pub author: AuthorResponse,
    pub is_deleted: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Identity embedded in posts, comments and notifications.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub username: String,
    pub profile_pic: Option<String>,
}
