use std::path::Path;

use actix_files::Files;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use log::{error, info};

use prk_classify::routes;
use prk_classify::service::PredictionService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    let model_dir = std::env::var("MODEL_DIR").unwrap_or_else(|_| "ml_models".to_string());
    // Artifact loading is fatal: serving with a partially loaded or stale
    // model set is worse than refusing to start.
    let service = match PredictionService::load(Path::new(&model_dir)) {
        Ok(service) => {
            info!("loaded classifiers and scalers from {model_dir}/");
            web::Data::new(service)
        }
        Err(e) => {
            error!("failed to load model artifacts from {model_dir}/: {e:#}");
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "model artifacts failed to load",
            ));
        }
    };

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let workers = std::env::var("WORKERS")
        .ok()
        .and_then(|w| w.parse().ok())
        .unwrap_or_else(num_cpus::get);
    let bind_address = format!("{host}:{port}");

    info!("PAS risk prediction service listening on http://{bind_address}");
    info!("workers: {workers}");
    info!("endpoints:");
    info!("  GET /                                - input forms");
    info!("  GET /classify_prk_before_delivery/   - before-delivery prediction");
    info!("  GET /classify_prk_at_delivery/       - at-delivery prediction");
    info!("  GET /classify_prk_with_labs/         - with-labs prediction");
    info!("  GET /classify_prk_without_labs/      - without-labs prediction");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(service.clone())
            .configure(routes::configure)
            .route("/", web::get().to(routes::index))
            .service(Files::new("/static", "./static").prefer_utf8(true))
            .default_service(web::route().to(routes::not_found))
    })
    .workers(workers)
    .bind(&bind_address)?
    .run()
    .await
}
