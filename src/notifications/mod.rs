use serde::{Deserialize, Serialize};
use sqlx::prelude::Type;
use uuid::Uuid;

use crate::posts::AuthorResponse;

pub mod handler;

/// Wire and database names are kept as clients already know them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "notification_kind")]
pub enum NotificationKind {
    #[serde(rename = "like")]
    #[sqlx(rename = "like")]
    Like,
    #[serde(rename = "Comment")]
    #[sqlx(rename = "Comment")]
    Comment,
    #[serde(rename = "follow")]
    #[sqlx(rename = "follow")]
    Follow,
}

impl NotificationKind {
    pub fn content(self) -> &'static str {
        match self {
            NotificationKind::Like => "Liked your post",
            NotificationKind::Comment => "Commented on your post",
            NotificationKind::Follow => "Started following you",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    /// Recipient.
    pub user_id: Uuid,
    /// The user whose action produced the notification.
    pub friend_id: Uuid,
    pub post_id: Option<Uuid>,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Notification {
    /// Fan-out record for `friend_id` acting on something owned by `user_id`.
    /// `None` when the actor is the owner.
    pub fn fan_out(
        kind: NotificationKind,
        user_id: Uuid,
        friend_id: Uuid,
        post_id: Option<Uuid>,
    ) -> Option<Self> {
        if user_id == friend_id {
            return None;
        }
        Some(Notification {
            id: Uuid::new_v4(),
            kind,
            user_id,
            friend_id,
            post_id,
            content: kind.content().to_string(),
            created_at: chrono::Utc::now(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub friend: AuthorResponse,
    pub post: Option<PostPreview>,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct PostPreview {
    pub id: Uuid,
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_uses_legacy_wire_names() {
        assert_eq!(
            serde_json::to_string(&NotificationKind::Like).unwrap(),
            "\"like\""
        );
        assert_eq!(
            serde_json::to_string(&NotificationKind::Comment).unwrap(),
            "\"Comment\""
        );
        assert_eq!(
            serde_json::to_string(&NotificationKind::Follow).unwrap(),
            "\"follow\""
        );
    }

    #[test]
    fn fan_out_skips_self_actions() {
        let me = Uuid::new_v4();
        assert!(Notification::fan_out(NotificationKind::Like, me, me, None).is_none());

        let other = Uuid::new_v4();
        let n = Notification::fan_out(NotificationKind::Follow, me, other, None).unwrap();
        assert_eq!(n.user_id, me);
        assert_eq!(n.friend_id, other);
        assert_eq!(n.content, "Started following you");
    }
}
