//! # Quill API Server
//!
//! The main entry point for the Actix-web HTTP server.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod handlers;
mod middleware;
mod openapi;
mod state;
mod telemetry;

use config::AppConfig;
use middleware::error::json_error_handler;
use openapi::ApiDoc;
use state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    telemetry::init_telemetry(&config.telemetry);

    tracing::info!(
        "Starting {} on {}:{}",
        config.telemetry.service_name,
        config.host,
        config.port
    );

    // Build application state
    let state = AppState::new(&config).await;

    #[cfg(feature = "postgres")]
    {
        if let Some(db) = state.db.as_ref().filter(|_| config.run_migrations) {
            use migration::MigratorTrait;

            migration::Migrator::up(&db.main, None)
                .await
                .map_err(std::io::Error::other)?;
            tracing::info!("Database migrations applied");
        }
    }

    tracing::info!(storage = state.storage(), "Application state ready");

    let openapi = ApiDoc::openapi();

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .configure(handlers::configure_routes)
            .service(
                SwaggerUi::new("/api/docs/{_:.*}").url("/api/docs/openapi.json", openapi.clone()),
            )
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
