// cohort-teams/src/routes/invitation_routes.rs
use crate::models::{CreateInvitationRequest, RespondInvitationRequest, ServiceError};
use crate::routes::run_blocking;
use crate::services::TeamService;
use crate::utils::get_user_id_from_request;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use log::info;

// Invite a student to the caller's team
#[post("/teams/{team_id}/invitations")]
async fn create_invitation(
    req: HttpRequest,
    service: web::Data<TeamService>,
    path: web::Path<String>,
    data: web::Json<CreateInvitationRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let team_id = path.into_inner();
    let student_id = data.into_inner().student_id;

    let invitation =
        run_blocking(move || service.invite_member(&team_id, &user_id, &student_id)).await?;

    Ok(HttpResponse::Created().json(invitation))
}

// Get the caller's pending invitations
#[get("/invitations")]
async fn get_user_invitations(
    req: HttpRequest,
    service: web::Data<TeamService>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;

    info!("📋 Fetching invitations for user: {}", user_id);

    let invitations = run_blocking(move || service.list_pending_invites_for(&user_id)).await?;

    info!("✅ Found {} invitations for user", invitations.len());

    Ok(HttpResponse::Ok().json(invitations))
}

// Get all invitations for a team
#[get("/teams/{team_id}/invitations")]
async fn get_team_invitations(
    req: HttpRequest,
    service: web::Data<TeamService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let team_id = path.into_inner();

    info!("📋 Fetching invitations for team: {}", team_id);

    let invitations = run_blocking(move || service.list_team_invites(&team_id, &user_id)).await?;

    Ok(HttpResponse::Ok().json(invitations))
}

// Respond to an invitation (accept/reject)
#[put("/teams/{team_id}/invitations/{invitation_id}")]
async fn respond_to_invitation(
    req: HttpRequest,
    service: web::Data<TeamService>,
    path: web::Path<(String, String)>,
    data: web::Json<RespondInvitationRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let (team_id, invitation_id) = path.into_inner();
    let action = data.into_inner().action;

    let team = run_blocking(move || {
        service.respond_to_invite(&team_id, &invitation_id, &user_id, action)
    })
    .await?;

    Ok(HttpResponse::Ok().json(team))
}

// Revoke a pending invitation
#[delete("/teams/{team_id}/invitations/{invitation_id}")]
async fn revoke_invitation(
    req: HttpRequest,
    service: web::Data<TeamService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = get_user_id_from_request(&req)?;
    let (team_id, invitation_id) = path.into_inner();

    let invitation =
        run_blocking(move || service.revoke_invite(&team_id, &invitation_id, &user_id)).await?;

    Ok(HttpResponse::Ok().json(invitation))
}

// Register all invitation routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_invitation)
        .service(get_user_invitations)
        .service(get_team_invitations)
        .service(respond_to_invitation)
        .service(revoke_invitation);
}
