//! Borrow-request workflow: submission, terminal decisions, fulfillment,
//! and the indirect (asset-label) visibility of request listings.

mod common;

use quartermaster::audit::AuditAction;
use quartermaster::error::Error;
use quartermaster::service::{assignments, requests};
use quartermaster::store::Store;
use quartermaster::types::{AssetStatus, RequestStatus, RoleName};

use common::env;

#[test]
fn test_submit_requires_role_and_justification() {
    let env = env();
    let hr = env.label("department:HR");
    let asset = env.asset_with_labels("HR-LAP", &[&hr]);

    let requester = env.user("requester");
    env.grant(&requester, RoleName::RequestAsset, "department:HR");
    let p = env.principal(&requester);

    assert!(matches!(
        requests::submit(&env.store, &env.audit, &p, asset.id, "  "),
        Err(Error::Validation(_))
    ));

    let request =
        requests::submit(&env.store, &env.audit, &p, asset.id, "field work").unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.user_id, requester.id);

    // No grant covering the asset's labels: refused.
    let outsider = env.user("outsider");
    env.grant(&outsider, RoleName::RequestAsset, "department:IT");
    let op = env.principal(&outsider);
    assert!(matches!(
        requests::submit(&env.store, &env.audit, &op, asset.id, "please"),
        Err(Error::Forbidden(_))
    ));
}

#[test]
fn test_approve_reserves_asset_and_is_terminal() {
    let env = env();
    let admin = env.admin("admin");
    let asset = env.asset("LAP-1");
    let requester = env.user("requester");
    env.grant(&requester, RoleName::RequestAsset, "*");
    let rp = env.principal(&requester);

    let request = requests::submit(&env.store, &env.audit, &rp, asset.id, "travel").unwrap();

    let approved = requests::approve(&env.store, &env.audit, &admin, request.id).unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.approved_by, Some(admin.user.id));
    assert_eq!(
        env.store.get_asset(asset.id).unwrap().unwrap().status,
        AssetStatus::Reserved
    );

    // Approval audits both the request decision and the reservation.
    let events = env.audit.events();
    assert!(
        events
            .iter()
            .any(|e| e.action == AuditAction::Update && e.table == "requests")
    );
    assert!(
        events
            .iter()
            .any(|e| e.action == AuditAction::Update && e.table == "assets")
    );

    // A second decision on the same request conflicts.
    assert!(matches!(
        requests::reject(&env.store, &env.audit, &admin, request.id),
        Err(Error::Conflict(_))
    ));
    assert!(matches!(
        requests::approve(&env.store, &env.audit, &admin, request.id),
        Err(Error::Conflict(_))
    ));
}

#[test]
fn test_reject_leaves_asset_untouched() {
    let env = env();
    let admin = env.admin("admin");
    let asset = env.asset("LAP-2");
    let requester = env.user("requester");
    env.grant(&requester, RoleName::RequestAsset, "*");
    let rp = env.principal(&requester);

    let request = requests::submit(&env.store, &env.audit, &rp, asset.id, "travel").unwrap();
    let rejected = requests::reject(&env.store, &env.audit, &admin, request.id).unwrap();

    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(rejected.approved_by, Some(admin.user.id));
    assert_eq!(
        env.store.get_asset(asset.id).unwrap().unwrap().status,
        AssetStatus::Available
    );
}

#[test]
fn test_decided_check_precedes_authorization() {
    let env = env();
    let admin = env.admin("admin");
    let asset = env.asset("LAP-3");
    let requester = env.user("requester");
    env.grant(&requester, RoleName::RequestAsset, "*");
    let rp = env.principal(&requester);

    let request = requests::submit(&env.store, &env.audit, &rp, asset.id, "travel").unwrap();
    requests::approve(&env.store, &env.audit, &admin, request.id).unwrap();

    // A caller with no approval rights still sees Conflict, not Forbidden,
    // on an already-decided request.
    let nobody = env.user("nobody");
    let np = env.principal(&nobody);
    assert!(matches!(
        requests::approve(&env.store, &env.audit, &np, request.id),
        Err(Error::Conflict(_))
    ));
}

#[test]
fn test_check_out_by_request_fulfills() {
    let env = env();
    let admin = env.admin("admin");
    let asset = env.asset("LAP-4");
    let requester = env.user("requester");
    env.grant(&requester, RoleName::RequestAsset, "*");
    let rp = env.principal(&requester);

    let request = requests::submit(&env.store, &env.audit, &rp, asset.id, "travel").unwrap();
    requests::approve(&env.store, &env.audit, &admin, request.id).unwrap();

    let assignment =
        assignments::check_out_by_request(&env.store, &env.audit, &admin, request.id, 5).unwrap();

    assert_eq!(assignment.user_id, requester.id);
    assert_eq!(assignment.request_id, Some(request.id));
    assert_eq!(
        env.store.get_asset(asset.id).unwrap().unwrap().status,
        AssetStatus::InUse
    );
    assert_eq!(
        env.store.get_request(request.id).unwrap().unwrap().status,
        RequestStatus::Fulfilled
    );
    // Approver survives fulfillment.
    assert_eq!(
        env.store.get_request(request.id).unwrap().unwrap().approved_by,
        Some(admin.user.id)
    );
}

#[test]
fn test_check_out_by_request_conflicts_without_side_effects() {
    let env = env();
    let admin = env.admin("admin");
    let asset = env.asset("LAP-5");
    let requester = env.user("requester");
    env.grant(&requester, RoleName::RequestAsset, "*");
    let rp = env.principal(&requester);

    // Still Pending: the asset was never reserved.
    let request = requests::submit(&env.store, &env.audit, &rp, asset.id, "travel").unwrap();
    let mutations_before = env
        .audit
        .events()
        .iter()
        .filter(|e| !e.action.is_read())
        .count();

    assert!(matches!(
        assignments::check_out_by_request(&env.store, &env.audit, &admin, request.id, 5),
        Err(Error::Conflict(_))
    ));

    // No assignment, no status change, no mutation audited.
    assert!(env.store.active_assignment_for_asset(asset.id).unwrap().is_none());
    assert_eq!(
        env.store.get_asset(asset.id).unwrap().unwrap().status,
        AssetStatus::Available
    );
    assert_eq!(
        env.store.get_request(request.id).unwrap().unwrap().status,
        RequestStatus::Pending
    );
    let mutations_after = env
        .audit
        .events()
        .iter()
        .filter(|e| !e.action.is_read())
        .count();
    assert_eq!(mutations_after, mutations_before);
}

#[test]
fn test_approvable_listing_uses_asset_labels() {
    let env = env();
    let hr = env.label("department:HR");
    let it = env.label("department:IT");

    let hr_asset = env.asset_with_labels("HR-LAP", &[&hr]);
    let it_asset = env.asset_with_labels("IT-LAP", &[&it]);

    let requester = env.user("requester");
    env.grant(&requester, RoleName::RequestAsset, "*");
    let rp = env.principal(&requester);
    let hr_req = requests::submit(&env.store, &env.audit, &rp, hr_asset.id, "hr").unwrap();
    requests::submit(&env.store, &env.audit, &rp, it_asset.id, "it").unwrap();

    let approver = env.user("hr-approver");
    env.grant(&approver, RoleName::CheckInOutAsset, "department:HR");
    let ap = env.principal(&approver);

    let visible = requests::list_approvable(&env.store, &env.audit, &ap).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, hr_req.id);
}

#[test]
fn test_request_visibility_for_requester_and_others() {
    let env = env();
    let hr = env.label("department:HR");
    let asset = env.asset_with_labels("HR-LAP", &[&hr]);

    let requester = env.user("requester");
    env.grant(&requester, RoleName::RequestAsset, "*");
    let rp = env.principal(&requester);
    let request = requests::submit(&env.store, &env.audit, &rp, asset.id, "hr").unwrap();

    // Requester reads their own request with no further grants.
    assert!(requests::get_request(&env.store, &env.audit, &rp, request.id).is_ok());
    let mine = requests::my_requests(&env.store, &env.audit, &rp).unwrap();
    assert_eq!(mine.len(), 1);

    // A third party needs CheckInOutAsset over the asset's labels.
    let stranger = env.user("stranger");
    let sp = env.principal(&stranger);
    assert!(matches!(
        requests::get_request(&env.store, &env.audit, &sp, request.id),
        Err(Error::Forbidden(_))
    ));

    let approver = env.user("approver");
    env.grant(&approver, RoleName::CheckInOutAsset, "department:HR");
    let ap = env.principal(&approver);
    assert!(requests::get_request(&env.store, &env.audit, &ap, request.id).is_ok());
}
