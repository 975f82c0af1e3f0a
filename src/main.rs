use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use actix_web::middleware::Logger;

use streamfront::api;
use streamfront::auth::AuthService;
use streamfront::catalog::client::CatalogClient;
use streamfront::data_structs::app_config::AppConfig;
use streamfront::database::DatabasePool;
use streamfront::encrypted_signing::JWTSecretKey;
use streamfront::SharedResources;

const DEFAULT_CONFIG_PATH: &str = "config.yml";

fn to_io_error(err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

async fn load() -> io::Result<(AppConfig, SharedResources)> {
    log::info!("Loading configurations...");

    let config_path = std::env::var("STREAMFRONT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = AppConfig::from_file(&config_path).map_err(to_io_error)?;
    config.apply_env();

    log::info!("Connecting to the database...");

    let database = DatabasePool::new(&config.mysql).await.map_err(to_io_error)?;
    database.init().await.map_err(to_io_error)?;

    let jwt_secret = if config.auth.jwt_secret.is_empty() {
        log::warn!("No JWT secret configured, sessions will not survive a restart");
        JWTSecretKey::ephemeral()
    } else {
        JWTSecretKey::new(config.auth.jwt_secret.clone())
    };

    let catalog = CatalogClient::from_config(&config.catalog);
    log::info!("Catalog API at {} ({} channels per page)", catalog.base_url(), catalog.page_size());

    let auth = AuthService::new(Arc::new(database), jwt_secret);
    let shared_resources = SharedResources::new(auth, config.auth.secure_cookie);

    return Ok((config, shared_resources));
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (config, shared_resources) = load().await?;
    let allowed_origin = config.server.allowed_origin.clone();

    log::info!("Starting HTTP server on {}:{}", config.server.host, config.server.port);
    HttpServer::new(move || {
        let cors = match &allowed_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allowed_methods(vec!["GET", "POST"])
                .supports_credentials(),
            None => Cors::default(),
        };

        App::new()
            .app_data(web::Data::new(shared_resources.clone()))
            .wrap(cors)
            .wrap(Logger::new("%a \"%r\" %s %b \"%{User-Agent}i\" %T"))
            .configure(api::configure)
    })
        .bind((config.server.host.as_str(), config.server.port))?
        .run()
        .await
}
