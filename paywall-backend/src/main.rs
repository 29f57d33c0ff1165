use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

use paywall_backend::config::Config;
use paywall_backend::db::Database;
use paywall_backend::purchase::confirm;
use paywall_backend::{controllers, seed, AppState};

fn seed_catalogue(db: &Database, config: &Config) -> std::io::Result<usize> {
    let articles = match &config.seed_articles_path {
        Some(path) => {
            log::info!("[seed] Loading articles from {}", path);
            seed::load_articles(path).map_err(std::io::Error::other)?
        }
        None => seed::demo_articles(),
    };
    seed::seed(db, articles).map_err(std::io::Error::other)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Arc::new(Database::new(&config.database_url).map_err(std::io::Error::other)?);

    // `paywall-backend seed` loads the catalogue and exits
    if std::env::args().nth(1).as_deref() == Some("seed") {
        let inserted = seed_catalogue(&db, &config)?;
        log::info!("[seed] Inserted {} new articles", inserted);
        println!("Seeded {} new articles", inserted);
        return Ok(());
    }

    if config.seed_on_start {
        let inserted = seed_catalogue(&db, &config)?;
        log::info!("[seed] Inserted {} new articles on start", inserted);
    }

    let confirmer = confirm::from_config(&config).map_err(std::io::Error::other)?;
    let disable_cors = config.disable_cors;
    let state = web::Data::new(AppState::new(db, config, Arc::from(confirmer)));

    log::info!(
        "Starting paywall server on port {} (confirmer: {})",
        port,
        state.verifier.confirmer_name()
    );

    HttpServer::new(move || {
        let cors = if disable_cors {
            Cors::default()
        } else {
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600)
        };

        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
