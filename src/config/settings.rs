use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const DEFAULT_CLOUDINARY_BASE_URL: &str = "https://api.cloudinary.com/v1_1";

#[derive(Clone, Debug)]
pub struct Settings {
    pub port: u16,
    pub addr: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub google_client_id: String,
    pub google_tokeninfo_url: String,
    pub cloudinary_cloud_name: String,
    pub cloudinary_upload_preset: String,
    pub cloudinary_base_url: String,
    pub http_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let port: u16 = parsed("PORT").unwrap_or(3000);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        Ok(Self {
            port,
            addr,
            database_url: required("DATABASE_URL")?,
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS").unwrap_or(5),
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl_hours: parsed("JWT_TTL_HOURS").unwrap_or(24),
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            google_tokeninfo_url: env::var("GOOGLE_TOKENINFO_URL")
                .unwrap_or_else(|_| DEFAULT_TOKENINFO_URL.to_string()),
            cloudinary_cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            cloudinary_upload_preset: required("CLOUDINARY_UPLOAD_PRESET")?,
            cloudinary_base_url: env::var("CLOUDINARY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_CLOUDINARY_BASE_URL.to_string()),
            http_timeout: Duration::from_secs(parsed("HTTP_TIMEOUT_SECS").unwrap_or(15)),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES").unwrap_or(10 * 1024 * 1024),
        })
    }

    /// Settings for tests and local demos; no external service is reachable.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: String::new(),
            database_max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            jwt_ttl_hours: 1,
            google_client_id: "test-client".to_string(),
            google_tokeninfo_url: DEFAULT_TOKENINFO_URL.to_string(),
            cloudinary_cloud_name: "test".to_string(),
            cloudinary_upload_preset: "test".to_string(),
            cloudinary_base_url: DEFAULT_CLOUDINARY_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(1),
            max_upload_bytes: 1024 * 1024,
        }
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}
