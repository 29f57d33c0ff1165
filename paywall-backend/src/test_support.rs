//! Fixtures shared by the unit tests.

use chrono::Utc;

use crate::db::Database;
use crate::models::Article;

/// Payment address used by every fixture article
pub const AUTHOR_ADDRESS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

pub fn test_db() -> Database {
    Database::new(":memory:").expect("in-memory database")
}

pub fn sample_article(id: &str, price: u64) -> Article {
    let now = Utc::now();
    Article {
        id: id.to_string(),
        title: format!("Article {}", id),
        author: "Test Author".to_string(),
        author_payment_address: AUTHOR_ADDRESS.to_string(),
        subject: "Testing".to_string(),
        word_count: 42,
        price,
        preview: format!("Preview of article {}", id),
        full_content: format!("# Article {}\n\nThe full body of article {}.", id, id),
        created_at: now,
        updated_at: now,
    }
}

/// App state over an in-memory database with the trust confirmer.
pub fn test_state() -> actix_web::web::Data<crate::AppState> {
    let db = std::sync::Arc::new(test_db());
    actix_web::web::Data::new(crate::AppState::new(
        db,
        crate::config::Config::default(),
        std::sync::Arc::new(crate::purchase::TrustOnWrite),
    ))
}

/// Serve the full API on an ephemeral local port. Returns the base URL and
/// the database behind it.
pub async fn spawn_server() -> (String, std::sync::Arc<Database>) {
    use actix_web::{App, HttpServer};

    let state = test_state();
    let db = state.db.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(crate::controllers::configure)
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .expect("bind test server");
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    (format!("http://{}", addr), db)
}
