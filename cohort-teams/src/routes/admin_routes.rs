// src/routes/admin_routes.rs
use crate::models::{ServiceError, SetCapacityRequest};
use crate::routes::run_blocking;
use crate::services::TeamService;
use crate::utils::get_user_id_from_request;
use actix_web::{get, put, web, HttpRequest, HttpResponse};
use log::info;

// Current default team size
#[get("/admin/capacity")]
async fn get_capacity(req: HttpRequest, service: web::Data<TeamService>) -> Result<HttpResponse, ServiceError> {
    get_user_id_from_request(&req)?;

    let config = run_blocking(move || service.capacity()).await?;

    Ok(HttpResponse::Ok().json(config))
}

// Change the default team size and apply it to every team (admin only)
#[put("/admin/capacity")]
async fn set_capacity(
    req: HttpRequest,
    service: web::Data<TeamService>,
    data: web::Json<SetCapacityRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let max_size = data.into_inner().max_size;

    let result = run_blocking(move || service.set_global_capacity(&user_id, max_size)).await?;

    info!("✅ Team size {} applied to {} teams", result.max_size, result.teams_updated);

    Ok(HttpResponse::Ok().json(result))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_capacity).service(set_capacity);
}
