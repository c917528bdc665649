use std::collections::{HashMap, HashSet};

use axum::{extract::State, response::IntoResponse};
use uuid::Uuid;

use crate::{
    auth::jwt,
    error::AppError,
    notifications::{NotificationResponse, PostPreview},
    posts::view::{author_index, author_or_unknown},
    response::ApiResponse,
    SharedStore,
};

/// Inbox of the acting user, newest first
/// GET /notifications
pub async fn get_notifications(
    State(store): State<SharedStore>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    let notifications = store.notifications_for(claims.sub).await?;

    let friend_ids: Vec<Uuid> = notifications
        .iter()
        .map(|n| n.friend_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let post_ids: Vec<Uuid> = notifications
        .iter()
        .filter_map(|n| n.post_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let friends = author_index(store.find_users(&friend_ids).await?);
    let images: HashMap<Uuid, String> = store
        .find_posts(&post_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p.image))
        .collect();

    let response: Vec<NotificationResponse> = notifications
        .into_iter()
        .map(|n| NotificationResponse {
            id: n.id,
            kind: n.kind,
            friend: author_or_unknown(&friends, n.friend_id),
            post: n.post_id.and_then(|id| {
                images.get(&id).map(|image| PostPreview {
                    id,
                    image: image.clone(),
                })
            }),
            content: n.content,
            created_at: n.created_at,
        })
        .collect();

    Ok(ApiResponse::success(response))
}
