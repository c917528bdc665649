use serde::Deserialize;
use uuid::Uuid;

pub mod handler;

/// PUT /users/follow
#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    pub user_id_to_follow: Uuid,
}

/// PUT /users/unfollow
#[derive(Debug, Deserialize)]
pub struct UnfollowRequest {
    pub user_id_to_unfollow: Uuid,
}
