//! Social networking backend: accounts (password and Google sign-in), posts
//! with likes and comments, the follow graph, direct-message conversations
//! and the notification inbox fed by those interactions.

use std::sync::Arc;

use axum::extract::FromRef;

pub mod auth;
pub mod config;
pub mod conversations;
pub mod error;
pub mod extract;
pub mod follows;
pub mod media;
pub mod notifications;
pub mod posts;
pub mod response;
pub mod router;
pub mod store;
pub mod stories;
pub mod users;


use auth::oauth::IdentityProvider;
use config::settings::Settings;
use media::MediaUploader;
use store::Store;

pub type SharedStore = Arc<dyn Store>;
pub type SharedMedia = Arc<dyn MediaUploader>;
pub type SharedIdentity = Arc<dyn IdentityProvider>;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub settings: Settings,
    pub media: SharedMedia,
    pub identity: SharedIdentity,
}

impl FromRef<AppState> for SharedStore {
    fn from_ref(app_state: &AppState) -> SharedStore {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for Settings {
    fn from_ref(app_state: &AppState) -> Settings {
        app_state.settings.clone()
    }
}

impl FromRef<AppState> for SharedMedia {
    fn from_ref(app_state: &AppState) -> SharedMedia {
        app_state.media.clone()
    }
}

impl FromRef<AppState> for SharedIdentity {
    fn from_ref(app_state: &AppState) -> SharedIdentity {
        app_state.identity.clone()
    }
}
