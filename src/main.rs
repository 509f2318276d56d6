use tracing::{info, warn};

mod app;
mod auth;
mod config;
mod error;
mod mailer;
mod products;
mod session;
mod state;
mod storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "bazaar=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = state::AppState::init().await?;

    sqlx::migrate!("./migrations").run(&state.db).await?;

    // The store has no TTL index of its own, so expired sessions are swept
    // here.
    let sweep_db = state.db.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(60 * 60));
        loop {
            tick.tick().await;
            match session::SessionRecord::delete_expired(&sweep_db).await {
                Ok(0) => {}
                Ok(n) => info!(removed = n, "expired sessions swept"),
                Err(e) => warn!(error = %e, "session sweep failed"),
            }
        }
    });

    let app = app::build_app(state);
    app::serve(app).await
}
