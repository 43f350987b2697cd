use super::*;
use crate::models::{InviteStatus, ServiceError, TeamStatus};

#[test]
fn create_team_snapshots_the_default_size() {
    let (service, store) = service(4);

    let team = service.create_team("s1", "  Borrow Checkers  ").unwrap();

    assert_eq!(team.name, "Borrow Checkers");
    assert_eq!(team.leader_id, "s1");
    assert_eq!(team.members, vec!["s1".to_string()]);
    assert_eq!(team.max_size, 4);
    assert_eq!(team.status, TeamStatus::Active);

    service.set_global_capacity(ADMIN, 6).unwrap();
    let later = service.create_team("s2", "Later").unwrap();
    assert_eq!(later.max_size, 6);
    assert_invariants(&store);
}

#[test]
fn leader_cannot_create_a_second_team() {
    let (service, _store) = service(4);
    service.create_team("s1", "Team1").unwrap();

    assert_eq!(service.create_team("s1", "Team2"), Err(ServiceError::AlreadyInTeam));
}

#[test]
fn member_cannot_create_a_team() {
    let (service, _store) = service(4);
    team_with_members(&service, "s1", &["s2"]);

    assert_eq!(service.create_team("s2", "Breakaway"), Err(ServiceError::AlreadyInTeam));
}

#[test]
fn only_active_students_create_teams() {
    let (service, _store) = service(4);

    assert_eq!(service.create_team(ADMIN, "Admins"), Err(ServiceError::Forbidden));
    assert_eq!(service.create_team("alum", "Alumni"), Err(ServiceError::Forbidden));
    assert_eq!(service.create_team("gone", "Ghosts"), Err(ServiceError::Forbidden));
    assert_eq!(
        service.create_team("nobody", "Nobody"),
        Err(ServiceError::StudentNotFound("nobody".to_string()))
    );
    assert!(matches!(service.create_team("s1", "   "), Err(ServiceError::BadRequest(_))));
}

#[test]
fn only_the_leader_can_invite() {
    let (service, _store) = service(4);
    let team = team_with_members(&service, "s1", &["s2"]);

    assert_eq!(service.invite_member(&team.id, "s2", "s3"), Err(ServiceError::NotLeader));
    assert_eq!(service.invite_member(&team.id, "s9", "s3"), Err(ServiceError::NotLeader));
}

#[test]
fn invite_rejects_students_already_in_a_team() {
    let (service, _store) = service(4);
    let team = team_with_members(&service, "s1", &["s2"]);
    service.create_team("s5", "Other").unwrap();

    assert_eq!(
        service.invite_member(&team.id, "s1", "s5"),
        Err(ServiceError::StudentAlreadyInTeam("s5".to_string()))
    );
    assert_eq!(
        service.invite_member(&team.id, "s1", "s2"),
        Err(ServiceError::StudentAlreadyInTeam("s2".to_string()))
    );
    assert_eq!(
        service.invite_member(&team.id, "s1", "s1"),
        Err(ServiceError::StudentAlreadyInTeam("s1".to_string()))
    );
}

#[test]
fn invite_validates_the_invitee() {
    let (service, _store) = service(4);
    let team = service.create_team("s1", "Team").unwrap();

    assert_eq!(
        service.invite_member(&team.id, "s1", "nobody"),
        Err(ServiceError::StudentNotFound("nobody".to_string()))
    );
    assert!(matches!(service.invite_member(&team.id, "s1", "alum"), Err(ServiceError::BadRequest(_))));
    assert!(matches!(service.invite_member(&team.id, "s1", "gone"), Err(ServiceError::BadRequest(_))));
    assert_eq!(
        service.invite_member("missing-team", "s1", "s2"),
        Err(ServiceError::TeamNotFound("missing-team".to_string()))
    );
}

#[test]
fn one_pending_invite_per_student_and_team() {
    let (service, store) = service(4);
    let team = service.create_team("s1", "Team").unwrap();
    let first = service.invite_member(&team.id, "s1", "s2").unwrap();

    assert_eq!(
        service.invite_member(&team.id, "s1", "s2"),
        Err(ServiceError::AlreadyInvited("s2".to_string()))
    );

    service
        .respond_to_invite(&team.id, &first.id, "s2", InviteAction::Reject)
        .unwrap();
    let second = service.invite_member(&team.id, "s1", "s2").unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(second.status, InviteStatus::Pending);
    assert_invariants(&store);
}

#[test]
fn pending_invites_hold_seats() {
    let (service, _store) = service(3);
    let team = service.create_team("s1", "Team").unwrap();
    service.invite_member(&team.id, "s1", "s2").unwrap();
    service.invite_member(&team.id, "s1", "s3").unwrap();

    assert_eq!(service.invite_member(&team.id, "s1", "s4"), Err(ServiceError::TeamFull));
}

#[test]
fn two_invitees_fill_a_team_of_three() {
    let (service, store) = service(3);
    let team = service.create_team("s1", "Team").unwrap();
    let x = service.invite_member(&team.id, "s1", "s2").unwrap();
    let y = service.invite_member(&team.id, "s1", "s3").unwrap();

    let after_x = service
        .respond_to_invite(&team.id, &x.id, "s2", InviteAction::Accept)
        .unwrap();
    assert_eq!(after_x.members.len(), 2);

    let after_y = service
        .respond_to_invite(&team.id, &y.id, "s3", InviteAction::Accept)
        .unwrap();
    assert_eq!(after_y.members.len(), 3);

    assert_eq!(service.invite_member(&team.id, "s1", "s4"), Err(ServiceError::TeamFull));
    assert_invariants(&store);
}

#[test]
fn responding_to_a_resolved_invite_changes_nothing() {
    let (service, store) = service(4);
    let team = service.create_team("s1", "Team").unwrap();
    let invite = service.invite_member(&team.id, "s1", "s2").unwrap();
    service
        .respond_to_invite(&team.id, &invite.id, "s2", InviteAction::Accept)
        .unwrap();
    let version = store.load_team(&team.id).unwrap().unwrap().version;

    for action in [InviteAction::Accept, InviteAction::Reject] {
        assert_eq!(
            service.respond_to_invite(&team.id, &invite.id, "s2", action),
            Err(ServiceError::InviteNotPending(InviteStatus::Accepted))
        );
    }

    let stored = store.load_team(&team.id).unwrap().unwrap();
    assert_eq!(stored.version, version);
    assert_eq!(stored.size(), 2);
}

#[test]
fn rejected_invites_stay_rejected() {
    let (service, _store) = service(4);
    let team = service.create_team("s1", "Team").unwrap();
    let invite = service.invite_member(&team.id, "s1", "s2").unwrap();

    let view = service
        .respond_to_invite(&team.id, &invite.id, "s2", InviteAction::Reject)
        .unwrap();
    assert_eq!(view.members.len(), 1);

    for _ in 0..2 {
        assert_eq!(
            service.respond_to_invite(&team.id, &invite.id, "s2", InviteAction::Accept),
            Err(ServiceError::InviteNotPending(InviteStatus::Rejected))
        );
    }
    assert!(service.team_for_student("s2").unwrap().is_none());
}

#[test]
fn invites_can_only_be_answered_by_their_student() {
    let (service, _store) = service(4);
    let team = service.create_team("s1", "Team").unwrap();
    let other = service.create_team("s5", "Other").unwrap();
    let invite = service.invite_member(&team.id, "s1", "s2").unwrap();

    assert_eq!(
        service.respond_to_invite(&team.id, &invite.id, "s3", InviteAction::Accept),
        Err(ServiceError::Forbidden)
    );
    assert_eq!(
        service.respond_to_invite(&team.id, "no-such-invite", "s2", InviteAction::Accept),
        Err(ServiceError::InviteNotFound("no-such-invite".to_string()))
    );
    assert_eq!(
        service.respond_to_invite(&other.id, &invite.id, "s2", InviteAction::Accept),
        Err(ServiceError::InviteNotFound(invite.id.clone()))
    );
}

#[test]
fn accept_rechecks_capacity_and_keeps_the_invite_pending() {
    let (service, store) = service(3);
    let team = service.create_team("s1", "Team").unwrap();
    let x = service.invite_member(&team.id, "s1", "s2").unwrap();
    let y = service.invite_member(&team.id, "s1", "s3").unwrap();

    service.set_global_capacity(ADMIN, 2).unwrap();
    service
        .respond_to_invite(&team.id, &x.id, "s2", InviteAction::Accept)
        .unwrap();

    assert_eq!(
        service.respond_to_invite(&team.id, &y.id, "s3", InviteAction::Accept),
        Err(ServiceError::TeamFull)
    );
    let pending = service.list_pending_invites_for("s3").unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, y.id);
    assert_invariants(&store);
}

#[test]
fn shrinking_capacity_blocks_growth_until_members_leave() {
    let (service, store) = service(6);
    let team = team_with_members(&service, "s1", &["s2", "s3", "s4", "s5"]);
    let pending = service.invite_member(&team.id, "s1", "s6").unwrap();

    let result = service.set_global_capacity(ADMIN, 4).unwrap();
    assert_eq!(result.max_size, 4);
    assert_eq!(result.teams_updated, 1);

    let shrunk = service.get_team(&team.id).unwrap();
    assert_eq!(shrunk.max_size, 4);
    assert_eq!(shrunk.members.len(), 5);

    assert_eq!(service.invite_member(&team.id, "s1", "s7"), Err(ServiceError::TeamFull));
    assert_eq!(
        service.respond_to_invite(&team.id, &pending.id, "s6", InviteAction::Accept),
        Err(ServiceError::TeamFull)
    );

    service.leave_team(&team.id, "s5").unwrap();
    assert_eq!(service.invite_member(&team.id, "s1", "s7"), Err(ServiceError::TeamFull));
    service
        .respond_to_invite(&team.id, &pending.id, "s6", InviteAction::Reject)
        .unwrap();
    assert_eq!(service.invite_member(&team.id, "s1", "s7"), Err(ServiceError::TeamFull));

    service.leave_team(&team.id, "s4").unwrap();
    service.invite_member(&team.id, "s1", "s7").unwrap();
    assert_structural_invariants(&store);
}

#[test]
fn accepting_one_team_leaves_other_invites_pending() {
    let (service, store) = service(4);
    let team1 = service.create_team("s1", "Team1").unwrap();
    let team2 = service.create_team("s2", "Team2").unwrap();
    let from_team1 = service.invite_member(&team1.id, "s1", "s9").unwrap();
    let from_team2 = service.invite_member(&team2.id, "s2", "s9").unwrap();

    service
        .respond_to_invite(&team1.id, &from_team1.id, "s9", InviteAction::Accept)
        .unwrap();

    // The other invite survives, still holds a seat, but cannot be accepted
    let pending = service.list_pending_invites_for("s9").unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, from_team2.id);
    assert_eq!(
        store.load_team(&team2.id).unwrap().unwrap().committed_seats(chrono::Utc::now()),
        2
    );
    assert_eq!(
        service.respond_to_invite(&team2.id, &from_team2.id, "s9", InviteAction::Accept),
        Err(ServiceError::StudentAlreadyInTeam("s9".to_string()))
    );

    service
        .respond_to_invite(&team2.id, &from_team2.id, "s9", InviteAction::Reject)
        .unwrap();
    assert!(service.list_pending_invites_for("s9").unwrap().is_empty());
    assert_eq!(service.team_for_student("s9").unwrap().unwrap().id, team1.id);
    assert_invariants(&store);
}

#[test]
fn expired_invites_cannot_be_answered_and_free_their_seat() {
    let settings = TeamSettings {
        invite_ttl: Some(chrono::Duration::zero()),
        ..test_settings()
    };
    let (service, store) = service_with(2, settings);
    let team = service.create_team("s1", "Team").unwrap();
    let invite = service.invite_member(&team.id, "s1", "s2").unwrap();

    assert!(service.list_pending_invites_for("s2").unwrap().is_empty());
    assert_eq!(
        service.respond_to_invite(&team.id, &invite.id, "s2", InviteAction::Accept),
        Err(ServiceError::InviteNotPending(InviteStatus::Expired))
    );

    // The expired invite no longer blocks a new one or counts against capacity
    let again = service.invite_member(&team.id, "s1", "s2").unwrap();
    let stored = store.load_team(&team.id).unwrap().unwrap();
    assert_eq!(stored.invites.find(&invite.id).unwrap().status, InviteStatus::Expired);
    assert_eq!(stored.invites.find(&again.id).unwrap().status, InviteStatus::Pending);
}

#[test]
fn invites_without_ttl_never_expire() {
    let settings = TeamSettings {
        invite_ttl: None,
        ..test_settings()
    };
    let (service, _store) = service_with(4, settings);
    let team = service.create_team("s1", "Team").unwrap();
    let invite = service.invite_member(&team.id, "s1", "s2").unwrap();

    assert_eq!(invite.expires_at, None);
    service
        .respond_to_invite(&team.id, &invite.id, "s2", InviteAction::Accept)
        .unwrap();
}

#[test]
fn leader_can_revoke_a_pending_invite() {
    let (service, _store) = service(3);
    let team = service.create_team("s1", "Team").unwrap();
    let invite = service.invite_member(&team.id, "s1", "s2").unwrap();
    service.invite_member(&team.id, "s1", "s3").unwrap();

    assert_eq!(service.revoke_invite(&team.id, &invite.id, "s2"), Err(ServiceError::NotLeader));

    let revoked = service.revoke_invite(&team.id, &invite.id, "s1").unwrap();
    assert_eq!(revoked.status, InviteStatus::Cancelled);
    assert_eq!(
        service.respond_to_invite(&team.id, &invite.id, "s2", InviteAction::Accept),
        Err(ServiceError::InviteNotPending(InviteStatus::Cancelled))
    );
    assert_eq!(
        service.revoke_invite(&team.id, &invite.id, "s1"),
        Err(ServiceError::InviteNotPending(InviteStatus::Cancelled))
    );

    // The revoked seat is free again
    service.invite_member(&team.id, "s1", "s4").unwrap();
}

#[test]
fn disbanding_releases_members_and_cancels_invites() {
    let (service, store) = service(4);
    let team = team_with_members(&service, "s1", &["s2"]);
    let invite = service.invite_member(&team.id, "s1", "s3").unwrap();

    assert_eq!(service.disband_team(&team.id, "s2"), Err(ServiceError::NotLeader));

    let disbanded = service.disband_team(&team.id, "s1").unwrap();
    assert_eq!(disbanded.status, TeamStatus::Disbanded);
    assert_eq!(disbanded.members.len(), 2);

    assert_eq!(service.disband_team(&team.id, "s1"), Err(ServiceError::TeamNotActive));
    assert_eq!(service.invite_member(&team.id, "s1", "s4"), Err(ServiceError::TeamNotActive));
    assert_eq!(
        service.respond_to_invite(&team.id, &invite.id, "s3", InviteAction::Accept),
        Err(ServiceError::InviteNotPending(InviteStatus::Cancelled))
    );
    assert!(service.list_pending_invites_for("s3").unwrap().is_empty());

    assert!(service.team_for_student("s1").unwrap().is_none());
    service.create_team("s1", "Second try").unwrap();
    service.create_team("s2", "Own team").unwrap();
    assert_invariants(&store);
}

#[test]
fn members_can_leave_but_the_leader_cannot() {
    let (service, store) = service(4);
    let team = team_with_members(&service, "s1", &["s2"]);

    assert_eq!(service.leave_team(&team.id, "s1"), Err(ServiceError::LeaderCannotLeave));
    assert_eq!(service.leave_team(&team.id, "s3"), Err(ServiceError::NotMember));

    let after = service.leave_team(&team.id, "s2").unwrap();
    assert_eq!(after.members, vec!["s1".to_string()]);
    assert!(service.team_for_student("s2").unwrap().is_none());

    let other = service.create_team("s2", "Fresh start").unwrap();
    assert_eq!(service.team_for_student("s2").unwrap().unwrap().id, other.id);
    assert_invariants(&store);
}

#[test]
fn capacity_changes_are_admin_only_and_bounded() {
    let (service, _store) = service(4);
    service.create_team("s1", "Team").unwrap();

    assert_eq!(service.set_global_capacity("s1", 6), Err(ServiceError::Forbidden));
    assert!(matches!(service.set_global_capacity(ADMIN, 1), Err(ServiceError::BadRequest(_))));
    assert!(matches!(service.set_global_capacity(ADMIN, 21), Err(ServiceError::BadRequest(_))));
    assert_eq!(service.capacity().unwrap().max_size, 4);

    let result = service.set_global_capacity(ADMIN, 20).unwrap();
    assert_eq!(result.teams_updated, 1);
    assert_eq!(service.capacity().unwrap().max_size, 20);
}

#[test]
fn team_invites_are_visible_to_members_only() {
    let (service, _store) = service(4);
    let team = team_with_members(&service, "s1", &["s2"]);
    service.invite_member(&team.id, "s1", "s3").unwrap();

    let seen_by_leader = service.list_team_invites(&team.id, "s1").unwrap();
    let seen_by_member = service.list_team_invites(&team.id, "s2").unwrap();
    assert_eq!(seen_by_leader.len(), 2);
    assert_eq!(seen_by_leader, seen_by_member);
    assert_eq!(seen_by_leader[0].status, InviteStatus::Accepted);
    assert_eq!(seen_by_leader[1].status, InviteStatus::Pending);

    assert_eq!(service.list_team_invites(&team.id, "s3"), Err(ServiceError::Forbidden));
}

#[test]
fn pending_invites_are_listed_oldest_first() {
    let (service, _store) = service(4);
    let team1 = service.create_team("s1", "Team1").unwrap();
    let team2 = service.create_team("s2", "Team2").unwrap();
    let first = service.invite_member(&team1.id, "s1", "s9").unwrap();
    let second = service.invite_member(&team2.id, "s2", "s9").unwrap();
    service.invite_member(&team2.id, "s2", "s8").unwrap();

    let ids: Vec<String> = service
        .list_pending_invites_for("s9")
        .unwrap()
        .into_iter()
        .map(|invite| invite.id)
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first.id) && ids.contains(&second.id));
    if first.invited_at < second.invited_at {
        assert_eq!(ids[0], first.id);
    }
}
