//! Gated full-content endpoints.
//!
//! GET requires the signed-request handshake; POST is the trust-based
//! fallback where the caller simply names its wallet address.

use actix_web::{web, HttpRequest, HttpResponse, Responder, ResponseError};
use chrono::Utc;
use serde::Deserialize;

use crate::access::{self, Identification};
use crate::auth;
use crate::models::{ArticleContent, ContentAccessRequest};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
struct ContentQuery {
    #[serde(default)]
    format: Option<String>,
}

impl ContentQuery {
    fn wants_html(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("html"))
    }
}

fn respond(
    data: &AppState,
    article_id: &str,
    identification: &Identification,
    query: &ContentQuery,
) -> HttpResponse {
    match access::check_access(&data.db, article_id, identification) {
        Ok(grant) => {
            let content = ArticleContent::new(grant.article, grant.purchase.txid);
            let content = if query.wants_html() { content.with_html() } else { content };
            HttpResponse::Ok().json(content)
        }
        Err(e) => e.error_response(),
    }
}

async fn get_content(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<ContentQuery>,
    body: web::Bytes,
) -> impl Responder {
    let article_id = path.into_inner();
    let identification = match auth::authenticate(
        &req,
        &body,
        &data.nonces,
        data.config.auth_max_clock_skew_secs,
        Utc::now().timestamp(),
    ) {
        Ok(Some(identity_key)) => Identification::Strong(identity_key),
        Ok(None) => Identification::Unauthenticated,
        Err(rejection) => {
            log::info!("[auth] Rejected signed request for article {}: {}", article_id, rejection);
            Identification::Unauthenticated
        }
    };

    respond(&data, &article_id, &identification, &query)
}

async fn post_content(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ContentQuery>,
    body: Option<web::Json<ContentAccessRequest>>,
) -> impl Responder {
    let article_id = path.into_inner();
    let address = body
        .and_then(|b| b.into_inner().wallet_address)
        .unwrap_or_default();

    respond(&data, &article_id, &Identification::Weak(address), &query)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/articles/{id}/content")
            .route(web::get().to(get_content))
            .route(web::post().to(post_content)),
    );
}
