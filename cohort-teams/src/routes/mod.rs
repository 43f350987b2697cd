// src/routes/mod.rs
use crate::models::ServiceError;
use actix_web::web;
use log::error;

pub mod admin_routes;
pub mod invitation_routes;
pub mod team_routes;

// Run a service call on the blocking pool; team operations may wait on a lease
pub async fn run_blocking<F, R>(f: F) -> Result<R, ServiceError>
where
    F: FnOnce() -> Result<R, ServiceError> + Send + 'static,
    R: Send + 'static,
{
    web::block(f).await.map_err(|e| {
        error!("❌ Blocking task failed: {:?}", e);
        ServiceError::InternalServerError
    })?
}

// Register every route of the service
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ServiceError::BadRequest(format!("Invalid request body: {}", err)).into()
    }));
    team_routes::init_routes(cfg);
    invitation_routes::init_routes(cfg);
    admin_routes::init_routes(cfg);
}
