use actix_web::{web, HttpResponse, Responder, ResponseError};

use crate::models::VerifyPurchaseRequest;
use crate::purchase::PurchaseClaim;
use crate::AppState;

async fn verify_purchase(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<VerifyPurchaseRequest>,
) -> impl Responder {
    let article_id = path.into_inner();
    let claim = match PurchaseClaim::from_request(&article_id, body.into_inner()) {
        Ok(claim) => claim,
        Err(e) => return e.error_response(),
    };

    match data.verifier.verify(&claim).await {
        Ok(receipt) => HttpResponse::Ok().json(receipt),
        Err(e) => e.error_response(),
    }
}

/// Purchase history of one buyer identity, newest first.
async fn list_purchases(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let identity = path.into_inner();
    match data.db.list_purchases_for(&identity) {
        Ok(purchases) => HttpResponse::Ok().json(purchases),
        Err(e) => e.error_response(),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/articles/purchases/{wallet_address}", web::get().to(list_purchases))
        .route("/articles/{id}/verify-purchase", web::post().to(verify_purchase));
}

#[cfg(test)]
mod tests {
    use crate::test_support::{sample_article, test_state};
    use actix_web::{http::StatusCode, test, App};
    use serde_json::json;

    #[actix_web::test]
    async fn test_verify_purchase_flow() {
        let state = test_state();
        state.db.insert_article_if_absent(&sample_article("1", 100)).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(crate::controllers::configure),
        )
        .await;

        let body = json!({ "txid": "abc", "walletAddress": "W1", "satoshisPaid": 100 });
        let first: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/protected/articles/1/verify-purchase")
                .set_json(&body)
                .to_request(),
        )
        .await;
        let second: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/protected/articles/1/verify-purchase")
                .set_json(&body)
                .to_request(),
        )
        .await;
        assert_eq!(first, second);
        assert_eq!(first["success"], true);
        assert_eq!(first["txid"], "abc");
        assert!(first.get("fullContent").is_none());
        assert_eq!(state.db.count_purchases().unwrap(), 1);

        let req = test::TestRequest::get()
            .uri("/api/protected/articles/purchases/W1")
            .to_request();
        let purchases: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(purchases[0]["txid"], "abc");
        assert_eq!(purchases[0]["articleId"], "1");
    }

    #[actix_web::test]
    async fn test_verify_purchase_errors() {
        let state = test_state();
        state.db.insert_article_if_absent(&sample_article("1", 100)).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(crate::controllers::configure),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/protected/articles/1/verify-purchase")
                .set_json(json!({ "txid": "0a", "walletAddress": "W1", "satoshisPaid": 99 }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["required"], 100);
        assert_eq!(body["paid"], 99);
        assert_eq!(state.db.count_purchases().unwrap(), 0);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/protected/articles/1/verify-purchase")
                .set_json(json!({ "txid": "abc", "satoshisPaid": 100 }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/protected/articles/1/verify-purchase")
                .insert_header(("content-type", "application/json"))
                .set_payload("{not json")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/protected/articles/nope/verify-purchase")
                .set_json(json!({ "txid": "abc", "walletAddress": "W1", "satoshisPaid": 100 }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_verify_purchase_rejects_bad_txid_and_amount() {
        let state = test_state();
        state.db.insert_article_if_absent(&sample_article("1", 100)).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(crate::controllers::configure),
        )
        .await;

        for body in [
            json!({ "txid": "ab/../cd", "walletAddress": "W1", "satoshisPaid": 100 }),
            json!({ "txid": "abc", "walletAddress": "W1", "satoshisPaid": 9223372036854775808u64 }),
        ] {
            let resp = test::call_service(
                &app,
                test::TestRequest::post()
                    .uri("/api/protected/articles/1/verify-purchase")
                    .set_json(&body)
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(state.db.count_purchases().unwrap(), 0);

        // Same transaction in upper case is the same purchase
        let upper = "AB".repeat(32);
        let lower = "ab".repeat(32);
        for (txid, wallet) in [(&lower, "W1"), (&upper, "W2")] {
            let receipt: serde_json::Value = test::call_and_read_body_json(
                &app,
                test::TestRequest::post()
                    .uri("/api/protected/articles/1/verify-purchase")
                    .set_json(json!({ "txid": txid, "walletAddress": wallet, "satoshisPaid": 100 }))
                    .to_request(),
            )
            .await;
            assert_eq!(receipt["txid"], lower.as_str());
        }
        assert_eq!(state.db.count_purchases().unwrap(), 1);
        assert!(state.db.list_purchases_for("W2").unwrap().is_empty());
    }
}
