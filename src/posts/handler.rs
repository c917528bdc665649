use axum::{extract::State, response::IntoResponse};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::jwt,
    error::AppError,
    extract::{Json, Multipart, Path, Query},
    media::read_upload_form,
    posts::{
        view::{compose_post, compose_posts},
        CreateComment, NewPost, PostFilter, PostResponse,
    },
    response::ApiResponse,
    store::{Page, Store},
    SharedMedia, SharedStore,
};

const POSTS_FOLDER: &str = "Posts";
const MAX_CONTENT_LEN: usize = 5000;

/// Create a post from a multipart form with a mandatory `image` part
/// POST /add-post
pub async fn create_post(
    State(store): State<SharedStore>,
    State(media): State<SharedMedia>,
    claims: jwt::Claims,
    Multipart(multipart): Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = read_upload_form(multipart, "image").await?;
    let upload = form.require_file()?;
    let content = form.fields.remove("content").unwrap_or_default();

    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(AppError::ValidationFailure(format!(
            "Content must be at most {MAX_CONTENT_LEN} characters"
        )));
    }

    let image = media.upload(POSTS_FOLDER, upload).await?;

    let post = store
        .insert_post(NewPost {
            author_id: claims.sub,
            content,
            image,
        })
        .await?;

    info!(post_id = %post.id, author = %claims.sub, "post created");

    let response = load_post(&*store, post.id).await?;
    Ok(ApiResponse::success(response).created())
}

/// All posts, newest first
/// GET /getPost
pub async fn get_posts(
    State(store): State<SharedStore>,
    _claims: jwt::Claims,
    Query(filter): Query<PostFilter>,
) -> Result<impl IntoResponse, AppError> {
    let docs = store
        .list_posts(None, Page::new(filter.limit, filter.offset))
        .await?;

    Ok(ApiResponse::success(compose_posts(&*store, docs).await?))
}

/// Posts of one author, newest first
/// GET /user-post/:id
pub async fn get_user_posts(
    State(store): State<SharedStore>,
    _claims: jwt::Claims,
    Path(author): Path<Uuid>,
    Query(filter): Query<PostFilter>,
) -> Result<impl IntoResponse, AppError> {
    let docs = store
        .list_posts(Some(author), Page::new(filter.limit, filter.offset))
        .await?;

    Ok(ApiResponse::success(compose_posts(&*store, docs).await?))
}

/// Toggle the acting user's like
/// PATCH /posts/:id/like
pub async fn like_post(
    State(store): State<SharedStore>,
    claims: jwt::Claims,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let liked = store.toggle_like(id, claims.sub).await?;
    debug!(post_id = %id, user = %claims.sub, liked, "like toggled");

    Ok(ApiResponse::success(load_post(&*store, id).await?))
}

/// Comment on a post
/// PATCH /posts/:id/comment
pub async fn comment_post(
    State(store): State<SharedStore>,
    claims: jwt::Claims,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateComment>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let comment = store.add_comment(id, claims.sub, &payload.comment).await?;
    debug!(post_id = %id, comment_id = %comment.id, "comment added");

    Ok(ApiResponse::success(load_post(&*store, id).await?).created())
}

async fn load_post(store: &dyn Store, id: Uuid) -> Result<PostResponse, AppError> {
    let doc = store
        .find_post(id)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    compose_post(store, doc).await
}
