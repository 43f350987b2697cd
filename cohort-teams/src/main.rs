//Third-party-dependencies
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};
use std::sync::Arc;

use cohort_teams::config::AppConfig;
use cohort_teams::models::CapacityConfig;
use cohort_teams::routes;
use cohort_teams::services::{TeamService, TeamSettings};
use cohort_teams::utils::auth_middleware::Authentication;
use cohort_teams::utils::{DocumentStore, StaticDirectory};

fn invalid_setup(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        error!("❌ Invalid configuration: {}", e);
        invalid_setup(e)
    })?;

    let default_capacity = CapacityConfig::new(config.default_team_size).map_err(invalid_setup)?;
    let store = DocumentStore::open(&config.store_file(), default_capacity).map_err(invalid_setup)?;
    let directory = StaticDirectory::load(&config.directory_file).map_err(invalid_setup)?;
    info!("Directory holds {} users", directory.user_count());

    let service = web::Data::new(TeamService::new(
        Arc::new(store),
        Arc::new(directory),
        TeamSettings::from(&config),
    ));

    let address = config.bind_address.clone();
    info!("Server started at {}", address);

    HttpServer::new(move || {
        let cors = match &config.allowed_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header(),
            None => Cors::permissive(),
        };

        App::new()
            .app_data(service.clone())
            .wrap(Authentication::new(&config.jwt_secret))
            .wrap(cors)
            .wrap(Logger::default())
            .configure(routes::init_routes)
    })
    .bind(address)?
    .run()
    .await
}
