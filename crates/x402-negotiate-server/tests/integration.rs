use actix_web::{test, web, App};
use x402_server::{routes, ServerConfig};

const TX: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

fn app_data(config: ServerConfig) -> (web::Data<x402::Paywall>, web::Data<ServerConfig>) {
    let paywall = config.paywall().unwrap();
    (web::Data::new(paywall), web::Data::new(config))
}

macro_rules! app {
    ($config:expr) => {{
        let (paywall, config) = app_data($config);
        test::init_service(
            App::new()
                .app_data(paywall)
                .app_data(config)
                .configure(routes::configure),
        )
        .await
    }};
}

#[actix_rt::test]
async fn test_article_without_credential_returns_402_terms() {
    let app = app!(ServerConfig::default());

    let req = test::TestRequest::get().uri("/article").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 402);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["x402Version"], 1);
    assert_eq!(body["error"], "payment_required");
    assert_eq!(body["paymentRequest"]["chainId"], "0xaa36a7");
    assert_eq!(
        body["paymentRequest"]["recipient"],
        "0x000000000000000000000000000000000000dEaD"
    );
    assert_eq!(body["paymentRequest"]["amount"], "1000000000000");
    assert_eq!(body["paymentRequest"]["currency"], "ETH");
    assert_eq!(body["paymentRequest"]["reason"], "Unlock Premium Article");
}

#[actix_rt::test]
async fn test_article_with_credential_returns_resource() {
    let app = app!(ServerConfig::default());

    let req = test::TestRequest::get()
        .uri("/article")
        .insert_header(("Authorization", format!("x402 {TX}")))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], "1");
    assert_eq!(body["title"], "The Future of Decentralized Payments");
    assert_eq!(body["imageUrl"], "https://picsum.photos/800/400");
}

#[actix_rt::test]
async fn test_article_with_malformed_credential_is_challenged_again() {
    let app = app!(ServerConfig::default());

    for bad in ["x402 0xabc", "Bearer token", TX] {
        let req = test::TestRequest::get()
            .uri("/article")
            .insert_header(("Authorization", bad))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 402, "{bad} should be challenged");
    }
}

#[actix_rt::test]
async fn test_configured_price_is_served() {
    let config = ServerConfig {
        price_wei: "5000000000000000".to_string(),
        chain_id: "1".to_string(),
        reason: None,
        ..ServerConfig::default()
    };
    let app = app!(config);

    let req = test::TestRequest::get().uri("/article").to_request();
    let resp = test::call_service(&app, req).await;

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["paymentRequest"]["amount"], "5000000000000000");
    assert_eq!(body["paymentRequest"]["chainId"], "1");
    assert!(body["paymentRequest"].get("reason").is_none());
}

#[actix_rt::test]
async fn test_health() {
    let app = app!(ServerConfig::default());

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[actix_rt::test]
async fn test_metrics_forbidden_by_default() {
    let app = app!(ServerConfig::default());

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
}

#[actix_rt::test]
async fn test_metrics_requires_bearer_token() {
    let config = ServerConfig {
        metrics_token: Some("s3cret".to_string()),
        ..ServerConfig::default()
    };
    let app = app!(config);

    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("Authorization", "Bearer wrong"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    // Generate some traffic so the counters exist.
    let req = test::TestRequest::get().uri("/article").to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("Authorization", "Bearer s3cret"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body = test::read_body(resp).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("x402_server_requests_total"));
}

#[actix_rt::test]
async fn test_metrics_public_when_opted_in() {
    let config = ServerConfig {
        public_metrics: true,
        ..ServerConfig::default()
    };
    let app = app!(config);

    let req = test::TestRequest::get().uri("/metrics").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}
