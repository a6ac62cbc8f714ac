use actix_web::http::header::AUTHORIZATION;
use actix_web::{get, web, HttpRequest, HttpResponse};
use x402::{Challenge, Paywall, PaymentRequiredBody};

use crate::config::ServerConfig;
use crate::metrics::{record_request, CREDENTIALS};
use crate::security::bearer_matches;

/// Register every handler. The app must provide `Data<Paywall>` and
/// `Data<ServerConfig>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(article).service(health).service(metrics_endpoint);
}

#[get("/article")]
pub async fn article(req: HttpRequest, paywall: web::Data<Paywall>) -> HttpResponse {
    let credential = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match paywall.respond(credential) {
        Challenge::Unlocked(resource) => {
            CREDENTIALS.with_label_values(&["accepted"]).inc();
            record_request("/article", 200);
            HttpResponse::Ok().json(resource)
        }
        Challenge::PaymentRequired(terms) => {
            if credential.is_some() {
                CREDENTIALS.with_label_values(&["rejected"]).inc();
                tracing::info!("rejected malformed payment credential");
            }
            record_request("/article", 402);
            HttpResponse::PaymentRequired().json(PaymentRequiredBody::new(terms))
        }
    }
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "x402-server",
    }))
}

#[get("/metrics")]
pub async fn metrics_endpoint(req: HttpRequest, config: web::Data<ServerConfig>) -> HttpResponse {
    match &config.metrics_token {
        Some(expected) => {
            let header = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            if !bearer_matches(header, expected) {
                return HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for /metrics"
                }));
            }
        }
        None => {
            // No token configured: metrics are protected unless explicitly public.
            if !config.public_metrics {
                return HttpResponse::Forbidden().json(serde_json::json!({
                    "error": "forbidden",
                    "message": "Set METRICS_TOKEN or X402_PUBLIC_METRICS=true to access /metrics"
                }));
            }
        }
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(crate::metrics::metrics_output())
}
