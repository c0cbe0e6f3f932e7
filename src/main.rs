use cybak::{app, auth::bootstrap, db, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "cybak=debug,axum=info,tower_http=info".to_string());
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

    let app_state = AppState::init().await?;
    db::migrate(&app_state.db).await?;

    match &app_state.config.admin {
        Some(admin) => bootstrap::ensure_admin(&app_state.db, &app_state.passwords, admin).await?,
        None => tracing::warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set; no admin account is bootstrapped"),
    }

    app::serve(app::build_app(app_state)).await
}
