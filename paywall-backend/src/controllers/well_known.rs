use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::auth;
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NonceQuery {
    #[serde(default)]
    identity_key: Option<String>,
}

/// Issue a single-use nonce for the signed-request handshake.
/// Public endpoint: the nonce is useless without the matching private key.
async fn issue_nonce(state: web::Data<AppState>, query: web::Query<NonceQuery>) -> impl Responder {
    let Some(raw_key) = query.identity_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "identityKey query parameter is required"
        }));
    };

    match auth::parse_identity_key(raw_key) {
        Ok((_, identity_key)) => {
            let issued = state.nonces.issue(&identity_key);
            log::debug!("[auth] Issued nonce for {}", identity_key);
            HttpResponse::Ok().json(issued)
        }
        Err(e) => HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("Invalid identityKey: {}", e)
        })),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/.well-known").route("/auth/nonce", web::get().to(issue_nonce)));
}

#[cfg(test)]
mod tests {
    use crate::auth::{LocalKeySigner, RequestSigner};
    use crate::test_support::test_state;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_issue_nonce() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .configure(crate::controllers::configure),
        )
        .await;

        let key = LocalKeySigner::random().identity_key();
        let req = test::TestRequest::get()
            .uri(&format!("/.well-known/auth/nonce?identityKey={}", key))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["nonce"].as_str().is_some_and(|n| !n.is_empty()));
        assert_eq!(body["expiresIn"], 300);

        let req = test::TestRequest::get()
            .uri("/.well-known/auth/nonce?identityKey=nothex")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/.well-known/auth/nonce").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
