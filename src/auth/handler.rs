use axum::{extract::State, response::IntoResponse};
use tracing::info;
use validator::Validate;

use crate::{
    auth::{
        jwt,
        oauth::VerifiedIdentity,
        utils, AuthResponse, LoginUser, NewUser, OAuthRequest, RegisterUser, User,
    },
    config::settings::Settings,
    error::AppError,
    extract::Json,
    response::ApiResponse,
    store::{Store, StoreError},
    users, SharedIdentity, SharedStore,
};

const OAUTH_USERNAME_ATTEMPTS: usize = 5;

/// Which OAuth entry point created the account; signup also records the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OAuthFlow {
    Signup,
    Login,
}

pub async fn signup(
    State(store): State<SharedStore>,
    State(settings): State<Settings>,
    Json(payload): Json<RegisterUser>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let password_hash =
        utils::hash_password(&payload.password).map_err(|_| AppError::UpstreamFailure)?;

    let user = store
        .insert_user(NewUser {
            username: payload.username,
            email: payload.email.to_lowercase(),
            phone: payload.phone,
            first_name: Some(payload.first_name),
            last_name: payload.last_name,
            profile_pic: None,
            password_hash: Some(password_hash),
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => {
                AppError::AlreadyExists("User already exists".to_string())
            }
            other => other.into(),
        })?;

    info!(user_id = %user.id, "user registered");

    let response = session(&*store, &settings, user).await?;
    Ok(ApiResponse::success(response).created())
}

pub async fn login(
    State(store): State<SharedStore>,
    State(settings): State<Settings>,
    Json(payload): Json<LoginUser>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = store
        .find_user_by_email(&payload.email.to_lowercase())
        .await?
        .ok_or(AppError::NotFound("User does not exist".to_string()))?;

    // OAuth-only accounts have no password to check against.
    let hash = user
        .password_hash
        .as_deref()
        .ok_or(AppError::InvalidCredential)?;
    utils::verify_password(hash, &payload.password).map_err(|_| AppError::InvalidCredential)?;

    Ok(ApiResponse::success(session(&*store, &settings, user).await?))
}

pub async fn google_signup(
    State(store): State<SharedStore>,
    State(settings): State<Settings>,
    State(identity): State<SharedIdentity>,
    Json(payload): Json<OAuthRequest>,
) -> Result<impl IntoResponse, AppError> {
    authenticate_oauth(&*store, &settings, &identity, payload, OAuthFlow::Signup).await
}

pub async fn google_login(
    State(store): State<SharedStore>,
    State(settings): State<Settings>,
    State(identity): State<SharedIdentity>,
    Json(payload): Json<OAuthRequest>,
) -> Result<impl IntoResponse, AppError> {
    authenticate_oauth(&*store, &settings, &identity, payload, OAuthFlow::Login).await
}

async fn authenticate_oauth(
    store: &dyn Store,
    settings: &Settings,
    identity: &SharedIdentity,
    payload: OAuthRequest,
    flow: OAuthFlow,
) -> Result<ApiResponse<AuthResponse>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::InvalidToken)?;

    let verified = identity.verify(&payload.token).await?;
    let user = find_or_create_oauth_user(store, verified, flow).await?;

    Ok(ApiResponse::success(session(store, settings, user).await?))
}

async fn find_or_create_oauth_user(
    store: &dyn Store,
    verified: VerifiedIdentity,
    flow: OAuthFlow,
) -> Result<User, AppError> {
    let email = verified.email.to_lowercase();
    if let Some(user) = store.find_user_by_email(&email).await? {
        return Ok(user);
    }

    let base = utils::username_from_profile(verified.name.as_deref(), &email);
    let mut username = base.clone();

    for _ in 0..OAUTH_USERNAME_ATTEMPTS {
        let new_user = NewUser {
            username: username.clone(),
            email: email.clone(),
            phone: None,
            first_name: (flow == OAuthFlow::Signup)
                .then(|| verified.given_name.clone())
                .flatten(),
            last_name: (flow == OAuthFlow::Signup)
                .then(|| verified.family_name.clone())
                .flatten(),
            profile_pic: verified.picture.clone(),
            password_hash: None,
        };

        match store.insert_user(new_user).await {
            Ok(user) => {
                info!(user_id = %user.id, "user created from oauth profile");
                return Ok(user);
            }
            Err(StoreError::Conflict(_)) => {
                // A concurrent sign-in may have created the account meanwhile.
                if let Some(user) = store.find_user_by_email(&email).await? {
                    return Ok(user);
                }
                username = utils::with_random_suffix(&base);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::AlreadyExists(
        "Could not allocate a username".to_string(),
    ))
}

async fn session(
    store: &dyn Store,
    settings: &Settings,
    user: User,
) -> Result<AuthResponse, AppError> {
    let token = jwt::create_token(user.id, &settings.jwt_secret, settings.jwt_ttl_hours)
        .map_err(|_| AppError::UpstreamFailure)?;

    Ok(AuthResponse {
        token,
        user: users::profile_of(store, user).await?,
    })
}
