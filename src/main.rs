use std::net::SocketAddr;

use anyhow::Context;

use admin_portal::{
    config::AppConfig,
    db::connection,
    logging::init_tracing,
    routes::app,
    seed::{AdminSeed, seed_admin},
    state::AppState,
};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!("server failed: {err:?}");
        eprintln!("server failed: {err:?}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env().context("failed to load config")?;
    init_tracing(&cfg.rust_log);

    let db = connection::connect(&cfg)
        .await
        .context("failed to connect to database")?;

    let state = AppState::new(cfg.clone(), db);
    seed_admin(&state.store, AdminSeed::from_config(&cfg))
        .await
        .context("failed to seed admin user")?;

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid host/port {}:{}", cfg.host, cfg.port))?;
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
