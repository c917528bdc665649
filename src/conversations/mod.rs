use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod handler;

/// Direct-message thread between two users.
/// The pair is stored canonically (`member_low < member_high`) under a unique constraint.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub member_low: Uuid,
    pub member_high: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Conversation {
    pub fn has_member(&self, user: Uuid) -> bool {
        self.member_low == user || self.member_high == user
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateConversation {
    pub friend_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub members: [Uuid; 2],
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Conversation> for ConversationResponse {
    fn from(c: Conversation) -> Self {
        ConversationResponse {
            id: c.id,
            members: [c.member_low, c.member_high],
            created_at: c.created_at,
        }
    }
}
