use crate::models::{CreateTeamRequest, ServiceError};
use crate::routes::run_blocking;
use crate::services::TeamService;
use crate::utils::get_user_id_from_request;
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use log::{error, info};

// Create a new team led by the caller
#[post("/teams")]
async fn create_team(
    req: HttpRequest,
    service: web::Data<TeamService>,
    team_data: web::Json<CreateTeamRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let name = team_data.into_inner().name;

    let team = run_blocking(move || service.create_team(&user_id, &name)).await?;

    Ok(HttpResponse::Created().json(team))
}

// Get the caller's active team
#[get("/teams/mine")]
async fn get_my_team(req: HttpRequest, service: web::Data<TeamService>) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;

    info!("🔍 Fetching active team for user: {}", user_id);

    let lookup_id = user_id.clone();
    match run_blocking(move || service.team_for_student(&lookup_id)).await? {
        Some(team) => Ok(HttpResponse::Ok().json(team)),
        None => {
            error!("❌ User {} is not in an active team", user_id);
            Err(ServiceError::TeamNotFound(format!("no active team for {}", user_id)))
        }
    }
}

// Get a specific team by ID
#[get("/teams/{team_id}")]
async fn get_team(
    req: HttpRequest,
    service: web::Data<TeamService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    get_user_id_from_request(&req)?;
    let team_id = path.into_inner();

    info!("🔍 Fetching team: {}", team_id);

    let team = run_blocking(move || service.get_team(&team_id)).await?;

    Ok(HttpResponse::Ok().json(team))
}

// Leave a team (members only; the leader disbands instead)
#[post("/teams/{team_id}/leave")]
async fn leave_team(
    req: HttpRequest,
    service: web::Data<TeamService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let team_id = path.into_inner();

    let team = run_blocking(move || service.leave_team(&team_id, &user_id)).await?;

    Ok(HttpResponse::Ok().json(team))
}

// Disband a team
#[delete("/teams/{team_id}")]
async fn disband_team(
    req: HttpRequest,
    service: web::Data<TeamService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let team_id = path.into_inner();

    let team = run_blocking(move || service.disband_team(&team_id, &user_id)).await?;

    Ok(HttpResponse::Ok().json(team))
}

// Register all team routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // "/teams/mine" must win over "/teams/{team_id}"
    cfg.service(create_team)
        .service(get_my_team)
        .service(get_team)
        .service(leave_team)
        .service(disband_team);
}
