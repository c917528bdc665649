use axum::{extract::State, response::IntoResponse};
use tracing::debug;

use crate::{
    auth::jwt,
    error::AppError,
    extract::Json,
    follows::{FollowRequest, UnfollowRequest},
    response::ApiResponse,
    users::load_profile,
    SharedStore,
};

/// Follow a user. Repeating the call is a no-op.
/// PUT /users/follow
pub async fn follow_user(
    State(store): State<SharedStore>,
    claims: jwt::Claims,
    Json(payload): Json<FollowRequest>,
) -> Result<impl IntoResponse, AppError> {
    let target = payload.user_id_to_follow;

    // Can't follow yourself
    if claims.sub == target {
        return Err(AppError::ValidationFailure(
            "You cannot follow yourself".to_string(),
        ));
    }

    let created = store.follow(claims.sub, target).await?;
    debug!(follower = %claims.sub, %target, created, "follow");

    let message = if created {
        "Followed"
    } else {
        "Already following"
    };

    Ok(ApiResponse::success_with_message(
        message,
        load_profile(&*store, claims.sub).await?,
    ))
}

/// Unfollow a user. Unfollowing someone not followed is a no-op.
/// PUT /users/unfollow
pub async fn unfollow_user(
    State(store): State<SharedStore>,
    claims: jwt::Claims,
    Json(payload): Json<UnfollowRequest>,
) -> Result<impl IntoResponse, AppError> {
    let target = payload.user_id_to_unfollow;

    let removed = store.unfollow(claims.sub, target).await?;
    debug!(follower = %claims.sub, %target, removed, "unfollow");

    let message = if removed { "Unfollowed" } else { "Not following" };

    Ok(ApiResponse::success_with_message(
        message,
        load_profile(&*store, claims.sub).await?,
    ))
}
