use actix_web::{web, HttpResponse, Responder};

use crate::AppState;

/// Version from Cargo.toml, available at compile time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/health").route(web::get().to(health_check)));
    cfg.service(web::resource("/api/version").route(web::get().to(get_version)));
    cfg.service(web::resource("/api/health/config").route(web::get().to(get_config_status)));
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": VERSION
    }))
}

async fn get_version() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "version": VERSION
    }))
}

async fn get_config_status(state: web::Data<AppState>) -> impl Responder {
    let article_count = state.db.count_articles().unwrap_or_else(|e| {
        log::error!("Failed to count articles: {}", e);
        -1
    });
    let purchase_count = state.db.count_purchases().unwrap_or_else(|e| {
        log::error!("Failed to count purchases: {}", e);
        -1
    });

    HttpResponse::Ok().json(serde_json::json!({
        "tx_confirmer": state.verifier.confirmer_name(),
        "min_confirmations": state.config.min_confirmations,
        "auth_nonce_ttl_secs": state.nonces.ttl_secs(),
        "auth_max_clock_skew_secs": state.config.auth_max_clock_skew_secs,
        "article_count": article_count,
        "purchase_count": purchase_count
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_state;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_and_config() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .configure(crate::controllers::configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");

        let req = test::TestRequest::get().uri("/api/health/config").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["tx_confirmer"], "trust");
        assert_eq!(body["article_count"], 0);
    }
}
