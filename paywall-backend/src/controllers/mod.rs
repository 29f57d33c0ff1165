pub mod articles;
pub mod content;
pub mod health;
pub mod purchases;
pub mod well_known;

use actix_web::{error, web, HttpResponse};

/// Mount every route. Article routes share one `/api/protected` scope;
/// purchases go first so `/articles/purchases/{x}` is never read as an article id.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config());
    health::config_routes(cfg);
    well_known::config(cfg);
    cfg.service(
        web::scope("/api/protected")
            .configure(purchases::config)
            .configure(articles::config)
            .configure(content::config),
    );
}

/// Malformed JSON bodies answer 400 with the same `{error}` shape as other failures.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid request body: {}", err);
        error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(serde_json::json!({ "error": message })),
        )
        .into()
    })
}
