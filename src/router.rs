use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth, conversations, follows, notifications, posts, response::ApiResponse, stories, users,
    AppState,
};

/// Build the axum router with every endpoint.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.settings.max_upload_bytes;

    let identity_routes = Router::new()
        .route("/signup", post(auth::handler::signup))
        .route("/login", post(auth::handler::login))
        .route("/google-signup", post(auth::handler::google_signup))
        .route("/google-login", post(auth::handler::google_login));

    let post_routes = Router::new()
        .route("/add-post", post(posts::handler::create_post))
        .route("/getPost", get(posts::handler::get_posts))
        .route("/user-post/:id", get(posts::handler::get_user_posts))
        .route("/posts/:id/like", patch(posts::handler::like_post))
        .route("/posts/:id/comment", patch(posts::handler::comment_post));

    let social_routes = Router::new()
        .route("/users/follow", put(follows::handler::follow_user))
        .route("/users/unfollow", put(follows::handler::unfollow_user))
        .route(
            "/notifications",
            get(notifications::handler::get_notifications),
        )
        .route(
            "/conversations",
            post(conversations::handler::get_or_create_conversation),
        )
        .route(
            "/conversations/:user_id",
            get(conversations::handler::get_conversations),
        );

    let story_routes = Router::new()
        .route("/add-story", post(stories::handler::add_story))
        .route("/user-stories", get(stories::handler::get_user_stories))
        .route("/firends-stories", get(stories::handler::get_friends_stories));

    let profile_routes = Router::new()
        .route("/user/:id", get(users::handler::get_user))
        .route("/users/:id", get(users::handler::get_all_users))
        .route("/user/profile", put(users::handler::edit_profile))
        .route("/profile-pic", post(users::handler::add_profile_pic))
        .route("/cover-pic", post(users::handler::add_cover_pic));

    Router::new()
        .route("/health", get(|| async { ApiResponse::ok("ok") }))
        .merge(identity_routes)
        .merge(post_routes)
        .merge(social_routes)
        .merge(story_routes)
        .merge(profile_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
