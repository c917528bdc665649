use async_trait::async_trait;
use serde::Deserialize;

use crate::config::settings::Settings;

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("token verification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token audience {0} does not match this client")]
    AudienceMismatch(String),

    #[error("email is not verified by the provider")]
    UnverifiedEmail,

    #[error("token rejected: {0}")]
    Rejected(String),
}

/// Profile asserted by a third-party identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub email: String,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, OAuthError>;
}

/// Verifies Google ID tokens against the tokeninfo endpoint.
pub struct GoogleIdentityProvider {
    client: reqwest::Client,
    client_id: String,
    tokeninfo_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    email: Option<String>,
    // tokeninfo reports booleans as strings
    email_verified: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

impl GoogleIdentityProvider {
    pub fn new(client: reqwest::Client, settings: &Settings) -> Self {
        Self {
            client,
            client_id: settings.google_client_id.clone(),
            tokeninfo_url: settings.google_tokeninfo_url.clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, OAuthError> {
        let info: TokenInfo = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", token)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        into_identity(info, &self.client_id)
    }
}

fn into_identity(info: TokenInfo, client_id: &str) -> Result<VerifiedIdentity, OAuthError> {
    if info.aud != client_id {
        return Err(OAuthError::AudienceMismatch(info.aud));
    }
    if info.email_verified.as_deref() != Some("true") {
        return Err(OAuthError::UnverifiedEmail);
    }
    let email = info
        .email
        .ok_or_else(|| OAuthError::Rejected("token carries no email".to_string()))?;

    Ok(VerifiedIdentity {
        email,
        name: info.name,
        given_name: info.given_name,
        family_name: info.family_name,
        picture: info.picture,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(aud: &str, verified: Option<&str>) -> TokenInfo {
        serde_json::from_value(serde_json::json!({
            "aud": aud,
            "email": "ada@x.com",
            "email_verified": verified,
            "name": "Ada Lovelace",
            "given_name": "Ada",
            "family_name": "Lovelace",
            "picture": "https://img/ada.png",
            "iss": "accounts.google.com"
        }))
        .unwrap()
    }

    #[test]
    fn accepts_matching_audience() {
        let identity = into_identity(info("client", Some("true")), "client").unwrap();
        assert_eq!(identity.email, "ada@x.com");
        assert_eq!(identity.given_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn rejects_foreign_audience() {
        assert!(matches!(
            into_identity(info("someone-else", Some("true")), "client"),
            Err(OAuthError::AudienceMismatch(_))
        ));
    }

    #[test]
    fn rejects_unverified_email() {
        assert!(matches!(
            into_identity(info("client", Some("false")), "client"),
            Err(OAuthError::UnverifiedEmail)
        ));
        assert!(matches!(
            into_identity(info("client", None), "client"),
            Err(OAuthError::UnverifiedEmail)
        ));
    }
}
