use std::collections::HashMap;

use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::jwt,
    error::AppError,
    extract::Multipart,
    media::read_upload_form,
    posts::{
        view::{author_index, author_or_unknown},
        AuthorResponse,
    },
    response::ApiResponse,
    store::Store,
    stories::{visible_since, NewStory, Story, StoryResponse},
    SharedMedia, SharedStore,
};

const STORIES_FOLDER: &str = "Stories";

/// Post a story from a multipart form with a mandatory `file` part
/// POST /add-story
pub async fn add_story(
    State(store): State<SharedStore>,
    State(media): State<SharedMedia>,
    claims: jwt::Claims,
    Multipart(multipart): Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = read_upload_form(multipart, "file").await?;
    let upload = form
        .file
        .take()
        .ok_or(AppError::ValidationFailure("File is required".to_string()))?;

    let media_url = media.upload(STORIES_FOLDER, upload).await?;

    let story = store
        .insert_story(NewStory {
            author_id: claims.sub,
            media_url,
        })
        .await?;

    info!(story_id = %story.id, author = %claims.sub, "story posted");

    let authors = author_index(store.find_users(&[claims.sub]).await?);
    Ok(ApiResponse::success(story_view(story, &authors)).created())
}

/// The acting user's live stories
/// GET /user-stories
pub async fn get_user_stories(
    State(store): State<SharedStore>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::success(
        compose_stories(&*store, &[claims.sub]).await?,
    ))
}

/// Live stories of everyone the acting user follows
/// GET /firends-stories
pub async fn get_friends_stories(
    State(store): State<SharedStore>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    let following = store.following(claims.sub).await?;

    Ok(ApiResponse::success(
        compose_stories(&*store, &following).await?,
    ))
}

async fn compose_stories(
    store: &dyn Store,
    authors: &[Uuid],
) -> Result<Vec<StoryResponse>, AppError> {
    let stories = store.stories_by(authors, visible_since(Utc::now())).await?;
    let index = author_index(store.find_users(authors).await?);

    Ok(stories.into_iter().map(|s| story_view(s, &index)).collect())
}

fn story_view(story: Story, authors: &HashMap<Uuid, AuthorResponse>) -> StoryResponse {
    StoryResponse {
        id: story.id,
        author: author_or_unknown(authors, story.author_id),
        media_url: story.media_url,
        created_at: story.created_at,
    }
}
