use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::posts::AuthorResponse;

pub mod handler;

/// How long a story stays visible after it is posted.
pub const STORY_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Story {
    pub id: Uuid,
    pub author_id: Uuid,
    pub media_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStory {
    pub author_id: Uuid,
    pub media_url: String,
}

#[derive(Debug, Serialize)]
pub struct StoryResponse {
    pub id: Uuid,
    pub author: AuthorResponse,
    pub media_url: String,
    pub created_at: DateTime<Utc>,
}

/// Oldest creation time still visible at `now`.
pub fn visible_since(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(STORY_TTL_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_covers_one_day() {
        let now = Utc::now();
        assert_eq!(now - visible_since(now), Duration::hours(24));
    }
}
