use actix_web::{web, HttpResponse, Responder, ResponseError};

use crate::auth;
use crate::error::PaywallError;
use crate::models::ArticleSummary;
use crate::AppState;

async fn list_articles(data: web::Data<AppState>) -> impl Responder {
    match data.db.list_articles() {
        Ok(articles) => {
            let summaries: Vec<ArticleSummary> = articles.iter().map(ArticleSummary::from).collect();
            HttpResponse::Ok().json(summaries)
        }
        Err(e) => e.error_response(),
    }
}

async fn get_article(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    match data.db.get_article(&id) {
        Ok(Some(article)) => HttpResponse::Ok().json(ArticleSummary::from(&article)),
        Ok(None) => PaywallError::NotFound { article_id: id }.error_response(),
        Err(e) => e.error_response(),
    }
}

/// How to reach the signed content endpoint of an article.
async fn article_info(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    let article = match data.db.get_article(&id) {
        Ok(Some(article)) => article,
        Ok(None) => return PaywallError::NotFound { article_id: id }.error_response(),
        Err(e) => return e.error_response(),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "articleId": article.id,
        "title": article.title,
        "author": article.author,
        "price": article.price,
        "paymentAddress": article.author_payment_address,
        "signedRequests": {
            "enabled": true,
            "version": auth::AUTH_VERSION,
            "endpoint": format!("/api/protected/articles/{}/content", article.id),
            "method": "GET",
            "nonceEndpoint": "/.well-known/auth/nonce?identityKey=<hex>",
            "headers": [
                auth::HEADER_VERSION,
                auth::HEADER_IDENTITY_KEY,
                auth::HEADER_NONCE,
                auth::HEADER_TIMESTAMP,
                auth::HEADER_SIGNATURE,
            ],
            "canonicalMessage": "version\\nMETHOD\\npath?query\\ntimestamp\\nnonce\\nhex(sha256(body))",
            "signature": "DER-encoded ECDSA secp256k1 over SHA-256, hex",
            "maxClockSkewSecs": data.config.auth_max_clock_skew_secs,
        },
        "fallback": {
            "endpoint": format!("/api/protected/articles/{}/content", article.id),
            "method": "POST",
            "body": { "walletAddress": "<address used when purchasing>" },
        },
        "usage": {
            "description": "Full content is released to the identity recorded with a verified purchase",
            "steps": [
                "Pay the article price to paymentAddress",
                format!("POST /api/protected/articles/{}/verify-purchase with txid, walletAddress and satoshisPaid", article.id),
                "Fetch a nonce for your identity key",
                "Sign the canonical message and send it in the headers above",
            ],
        },
    }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/articles", web::get().to(list_articles))
        .route("/articles/{id}", web::get().to(get_article))
        .route("/articles/{id}/info", web::get().to(article_info));
}

#[cfg(test)]
mod tests {
    use crate::test_support::{sample_article, test_state};
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_article_endpoints_never_expose_full_content() {
        let state = test_state();
        state.db.insert_article_if_absent(&sample_article("1", 100)).unwrap();
        state.db.insert_article_if_absent(&sample_article("2", 50)).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(crate::controllers::configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/protected/articles").to_request();
        let list: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|a| a.get("fullContent").is_none()));

        let req = test::TestRequest::get().uri("/api/protected/articles/1").to_request();
        let article: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(article["id"], "1");
        assert_eq!(article["price"], 100);
        assert!(article.get("fullContent").is_none());

        let req = test::TestRequest::get().uri("/api/protected/articles/missing").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_info_describes_signed_endpoint() {
        let state = test_state();
        state.db.insert_article_if_absent(&sample_article("1", 100)).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(crate::controllers::configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/protected/articles/1/info").to_request();
        let info: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(info["signedRequests"]["endpoint"], "/api/protected/articles/1/content");
        assert_eq!(info["price"], 100);
        assert!(info.get("fullContent").is_none());
    }
}
