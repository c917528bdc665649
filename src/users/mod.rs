use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{auth::User, error::AppError, store::Store};

pub mod handler;

/// Full profile, including both sides of the follow graph.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
    pub cover_pic: Option<String>,
    pub is_active: bool,
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl UserResponse {
    pub fn new(user: User, followers: Vec<Uuid>, following: Vec<Uuid>) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            phone: user.phone,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            profile_pic: user.profile_pic,
            cover_pic: user.cover_pic,
            is_active: user.is_active,
            followers,
            following,
            created_at: user.created_at,
        }
    }
}

/// Directory entry for user listings.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        UserSummary {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            profile_pic: user.profile_pic,
        }
    }
}

/// Partial profile edit. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 100, message = "First name cannot be empty"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "Last name is too long"))]
    pub last_name: Option<String>,
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,
    #[validate(length(min = 5, max = 20, message = "Invalid phone number"))]
    pub phone: Option<String>,
}

/// Resolves the follow sets of `user` and assembles the profile view.
pub async fn profile_of(store: &dyn Store, user: User) -> Result<UserResponse, AppError> {
    let followers = store.followers(user.id).await?;
    let following = store.following(user.id).await?;
    Ok(UserResponse::new(user, followers, following))
}

pub async fn load_profile(store: &dyn Store, id: Uuid) -> Result<UserResponse, AppError> {
    let user = store
        .find_user(id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;
    profile_of(store, user).await
}
