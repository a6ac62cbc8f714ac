use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{web, App, HttpServer};
use tracing_subscriber::EnvFilter;

use x402_server::{routes, ServerConfig};

fn build_cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        Cors::default()
            .allowed_origin_fn(|origin, _| {
                origin
                    .to_str()
                    .map(|o| o == "http://localhost" || o.starts_with("http://localhost:"))
                    .unwrap_or(false)
            })
            .allowed_methods(vec!["GET"])
            .allow_any_header()
            .max_age(3600)
    } else {
        let mut cors = Cors::default();
        for origin in origins {
            cors = cors.allowed_origin(origin);
        }
        cors.allowed_methods(vec!["GET"])
            .allow_any_header()
            .max_age(3600)
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env().map_err(std::io::Error::other)?;
    let paywall = config.paywall().map_err(std::io::Error::other)?;
    tracing::debug!(?config, "server configuration");

    let port = config.port;
    let cors_origins = config.allowed_origins.clone();
    let terms = paywall.terms();

    tracing::info!("x402 paywall listening at http://localhost:{port}");
    tracing::info!(
        chain_id = %terms.chain_id(),
        recipient = %terms.recipient(),
        amount = %terms.amount(),
        currency = %terms.currency(),
        "GET /article requires payment"
    );
    tracing::info!("Endpoints: GET /article, GET /health, GET /metrics");
    tracing::info!("Rate limit: {} req/min per IP", config.rate_limit_rpm);

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(config.rate_limit_rpm)
        .finish()
        .ok_or_else(|| std::io::Error::other("failed to build rate limiter config"))?;

    let paywall = web::Data::new(paywall);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors_origins))
            .wrap(Governor::new(&governor_conf))
            .app_data(paywall.clone())
            .app_data(config.clone())
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
