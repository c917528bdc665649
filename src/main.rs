use std::sync::Arc;

use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use socialite_backend::{
    auth::oauth::GoogleIdentityProvider, config::settings::Settings, media::CloudinaryUploader,
    router::build_router, store::PgStore, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,socialite_backend=debug")),
        )
        .init();

    let settings = Settings::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.database_max_connections)
        .connect(&settings.database_url)
        .await?;

    info!("database connected");

    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("migrations applied");

    let http = reqwest::Client::builder()
        .timeout(settings.http_timeout)
        .build()?;

    let app_state = AppState {
        store: Arc::new(PgStore::new(pool)),
        media: Arc::new(CloudinaryUploader::new(http.clone(), &settings)),
        identity: Arc::new(GoogleIdentityProvider::new(http, &settings)),
        settings: settings.clone(),
    };

    let app = build_router(app_state);

    info!("Server running on http://localhost:{}", settings.port);

    let listener = tokio::net::TcpListener::bind(settings.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
