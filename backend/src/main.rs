mod config;
mod inference;
mod routes;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};

use config::ServiceConfig;
use inference::config::InferenceConfig;
use inference::model::ModelRegistry;
use routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = std::env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    dotenv::dotenv().ok();

    let service_config = ServiceConfig::from_env();
    let inference_config = InferenceConfig::load();

    let registry = web::Data::new(ModelRegistry::load(&service_config));
    if registry.degraded() {
        log::warn!("One or more models are running as fallbacks; predictions will be degraded");
    }

    let bind_address = format!("0.0.0.0:{}", service_config.port);
    log::info!("Starting server on {}", bind_address);

    let static_dir = service_config.static_dir.clone();
    let service_config = web::Data::new(service_config);
    let inference_config = web::Data::new(inference_config);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(registry.clone())
            .app_data(service_config.clone())
            .app_data(inference_config.clone())
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
