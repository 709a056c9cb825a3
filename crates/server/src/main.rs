use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    server::telemetry::init_logging();

    server::config::load_config();
    let flags = server::config::feature_flags();
    server::telemetry::init_telemetry();
    server::health::record_start_time();

    let pool = server::db::create_pool_from_env()?;
    server::db::run_migrations(&pool).await?;

    if server::auth::bootstrap_admin(&pool).await? {
        tracing::warn!("Administrator created from ADMIN_EMAIL, change its password");
    }

    if flags.search {
        let search = server::search::init_search()?;
        match server::search::build_index(&pool, search).await {
            Ok(count) => tracing::info!(documents = count, "Search index built"),
            Err(e) => tracing::error!(error = %e, "Search index build failed, starting with an empty index"),
        }
    }

    let router = server::openapi::app(pool);

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = server::config::env_or("PORT", 8080);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "CAPCO server listening");
    axum::serve(listener, router).await?;
    Ok(())
}
