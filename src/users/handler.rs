use axum::{extract::State, response::IntoResponse};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::jwt,
    error::AppError,
    extract::{Json, Multipart, Path},
    media::read_upload_form,
    response::ApiResponse,
    store::PictureSlot,
    users::{load_profile, profile_of, ProfileUpdate, UserSummary},
    SharedMedia, SharedStore,
};

const USERS_FOLDER: &str = "Users";

/// GET /user/:id
pub async fn get_user(
    State(store): State<SharedStore>,
    _claims: jwt::Claims,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::success(load_profile(&*store, id).await?))
}

/// Everyone except the given user
/// GET /users/:id
pub async fn get_all_users(
    State(store): State<SharedStore>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let users: Vec<UserSummary> = store
        .list_users_except(id)
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();

    Ok(ApiResponse::success(users))
}

/// PUT /user/profile
pub async fn edit_profile(
    State(store): State<SharedStore>,
    claims: jwt::Claims,
    Json(payload): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = store.update_profile(claims.sub, payload).await?;

    Ok(ApiResponse::success(profile_of(&*store, user).await?))
}

/// POST /profile-pic
pub async fn add_profile_pic(
    State(store): State<SharedStore>,
    State(media): State<SharedMedia>,
    claims: jwt::Claims,
    Multipart(multipart): Multipart,
) -> Result<impl IntoResponse, AppError> {
    set_picture(store, media, claims, multipart, PictureSlot::Profile).await
}

/// POST /cover-pic
pub async fn add_cover_pic(
    State(store): State<SharedStore>,
    State(media): State<SharedMedia>,
    claims: jwt::Claims,
    Multipart(multipart): Multipart,
) -> Result<impl IntoResponse, AppError> {
    set_picture(store, media, claims, multipart, PictureSlot::Cover).await
}

async fn set_picture(
    store: SharedStore,
    media: SharedMedia,
    claims: jwt::Claims,
    multipart: axum::extract::Multipart,
    slot: PictureSlot,
) -> Result<ApiResponse<crate::users::UserResponse>, AppError> {
    let mut form = read_upload_form(multipart, "image").await?;
    let upload = form.require_file()?;

    // Upload only once we know the user exists.
    if store.find_user(claims.sub).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let url = media.upload(USERS_FOLDER, upload).await?;
    let user = store.set_picture(claims.sub, slot, &url).await?;

    Ok(ApiResponse::success(profile_of(&*store, user).await?))
}
