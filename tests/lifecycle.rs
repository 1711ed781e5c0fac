//! Asset checkout lifecycle: compare-and-set transitions, assignment
//! exclusivity, and the maintenance cycle.

mod common;

use chrono::{Duration, Utc};

use quartermaster::audit::AuditAction;
use quartermaster::error::Error;
use quartermaster::service::{assignments, maintenance};
use quartermaster::store::Store;
use quartermaster::types::{AssetStatus, RoleName};

use common::env;

#[test]
fn test_check_out_sets_status_and_due_date() {
    let env = env();
    let admin = env.admin("admin");
    let asset = env.asset("LAP-1");
    let borrower = env.user("borrower");

    let assignment =
        assignments::check_out(&env.store, &env.audit, &admin, asset.id, borrower.id, 5).unwrap();

    assert_eq!(
        env.store.get_asset(asset.id).unwrap().unwrap().status,
        AssetStatus::InUse
    );
    assert_eq!(assignment.user_id, borrower.id);
    assert_eq!(assignment.assigned_by_id, admin.user.id);
    assert_eq!(
        assignment.due_date,
        Utc::now().date_naive() + chrono::Days::new(5)
    );

    // Both mutations are audited: the status change and the new record.
    let events = env.audit.events();
    assert!(
        events
            .iter()
            .any(|e| e.action == AuditAction::Update && e.table == "assets")
    );
    assert!(
        events
            .iter()
            .any(|e| e.action == AuditAction::Insert && e.table == "assignments")
    );

    // Immediate retry conflicts and creates nothing.
    assert!(matches!(
        assignments::check_out(&env.store, &env.audit, &admin, asset.id, borrower.id, 5),
        Err(Error::Conflict(_))
    ));
    assert_eq!(env.store.assignments_for_user(borrower.id).unwrap().len(), 1);
}

#[test]
fn test_check_out_rejects_non_positive_due_days() {
    let env = env();
    let admin = env.admin("admin");
    let asset = env.asset("LAP-2");
    let borrower = env.user("borrower");

    for days in [0, -3] {
        assert!(matches!(
            assignments::check_out(&env.store, &env.audit, &admin, asset.id, borrower.id, days),
            Err(Error::Validation(_))
        ));
    }
    // Nothing moved.
    assert_eq!(
        env.store.get_asset(asset.id).unwrap().unwrap().status,
        AssetStatus::Available
    );
}

#[test]
fn test_check_out_requires_role_over_asset_labels() {
    let env = env();
    let hr = env.label("department:HR");
    let asset = env.asset_with_labels("HR-LAP", &[&hr]);
    let borrower = env.user("borrower");

    let clerk = env.user("clerk");
    env.grant(&clerk, RoleName::CheckInOutAsset, "department:IT");
    let p = env.principal(&clerk);

    assert!(matches!(
        assignments::check_out(&env.store, &env.audit, &p, asset.id, borrower.id, 5),
        Err(Error::Forbidden(_))
    ));
}

#[test]
fn test_at_most_one_active_assignment_per_asset() {
    let env = env();
    let admin = env.admin("admin");
    let asset = env.asset("LAP-3");
    let alice = env.user("alice");
    let bob = env.user("bob");

    assignments::check_out(&env.store, &env.audit, &admin, asset.id, alice.id, 5).unwrap();
    assert!(
        assignments::check_out(&env.store, &env.audit, &admin, asset.id, bob.id, 5).is_err()
    );

    // After check-in, the asset can circulate again.
    assignments::check_in_by_asset(&env.store, &env.audit, &admin, asset.id).unwrap();
    assignments::check_out(&env.store, &env.audit, &admin, asset.id, bob.id, 5).unwrap();

    let active = env.store.active_assignment_for_asset(asset.id).unwrap().unwrap();
    assert_eq!(active.user_id, bob.id);
}

#[test]
fn test_status_and_assignment_stay_coherent() {
    let env = env();
    let admin = env.admin("admin");
    let asset = env.asset("LAP-4");
    let borrower = env.user("borrower");

    assert!(env.store.active_assignment_for_asset(asset.id).unwrap().is_none());

    let assignment =
        assignments::check_out(&env.store, &env.audit, &admin, asset.id, borrower.id, 7).unwrap();
    assert_eq!(
        env.store.get_asset(asset.id).unwrap().unwrap().status,
        AssetStatus::InUse
    );
    assert!(env.store.active_assignment_for_asset(asset.id).unwrap().is_some());

    assignments::check_in_by_assignment(&env.store, &env.audit, &admin, assignment.id).unwrap();
    assert_eq!(
        env.store.get_asset(asset.id).unwrap().unwrap().status,
        AssetStatus::Available
    );
    assert!(env.store.active_assignment_for_asset(asset.id).unwrap().is_none());

    // Returning twice conflicts.
    assert!(matches!(
        assignments::check_in_by_assignment(&env.store, &env.audit, &admin, assignment.id),
        Err(Error::Conflict(_))
    ));
}

#[test]
fn test_check_in_unknown_assignment_is_not_found() {
    let env = env();
    let admin = env.admin("admin");

    assert!(matches!(
        assignments::check_in_by_assignment(&env.store, &env.audit, &admin, 9999),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_check_in_by_asset_without_active_assignment_conflicts() {
    let env = env();
    let admin = env.admin("admin");
    let asset = env.asset("LAP-5");

    assert!(matches!(
        assignments::check_in_by_asset(&env.store, &env.audit, &admin, asset.id),
        Err(Error::Conflict(_))
    ));
}

#[test]
fn test_request_return_moves_due_date() {
    let env = env();
    let admin = env.admin("admin");
    let asset = env.asset("LAP-6");
    let borrower = env.user("borrower");

    let assignment =
        assignments::check_out(&env.store, &env.audit, &admin, asset.id, borrower.id, 14).unwrap();

    // Zero days is allowed: return asked for today.
    let updated =
        assignments::request_return(&env.store, &env.audit, &admin, assignment.id, 0).unwrap();
    assert_eq!(updated.due_date, Utc::now().date_naive());

    assert!(matches!(
        assignments::request_return(&env.store, &env.audit, &admin, assignment.id, -1),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_assignment_visibility_limited_to_parties() {
    let env = env();
    let admin = env.admin("admin");
    let asset = env.asset("LAP-7");
    let borrower = env.user("borrower");
    let stranger = env.user("stranger");

    let assignment =
        assignments::check_out(&env.store, &env.audit, &admin, asset.id, borrower.id, 5).unwrap();

    let borrower_p = env.principal(&borrower);
    assert!(
        assignments::get_assignment(&env.store, &env.audit, &borrower_p, assignment.id).is_ok()
    );
    assert!(assignments::get_assignment(&env.store, &env.audit, &admin, assignment.id).is_ok());

    let stranger_p = env.principal(&stranger);
    assert!(matches!(
        assignments::get_assignment(&env.store, &env.audit, &stranger_p, assignment.id),
        Err(Error::Forbidden(_))
    ));

    let mine = assignments::my_assignments(&env.store, &env.audit, &borrower_p).unwrap();
    assert_eq!(mine.len(), 1);
    assert!(
        assignments::my_assignments(&env.store, &env.audit, &stranger_p)
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_maintenance_cycle() {
    let env = env();
    let admin = env.admin("admin");
    let asset = env.asset("SRV-1");

    maintenance::begin_maintenance(&env.store, &env.audit, &admin, asset.id).unwrap();
    assert_eq!(
        env.store.get_asset(asset.id).unwrap().unwrap().status,
        AssetStatus::Maintenance
    );

    // A second begin conflicts; so does checking out a machine in service.
    assert!(matches!(
        maintenance::begin_maintenance(&env.store, &env.audit, &admin, asset.id),
        Err(Error::Conflict(_))
    ));
    let borrower = env.user("borrower");
    assert!(matches!(
        assignments::check_out(&env.store, &env.audit, &admin, asset.id, borrower.id, 5),
        Err(Error::Conflict(_))
    ));

    let before = env.store.get_asset(asset.id).unwrap().unwrap().last_maintenance;
    maintenance::complete_maintenance(&env.store, &env.audit, &admin, asset.id).unwrap();
    let after = env.store.get_asset(asset.id).unwrap().unwrap();
    assert_eq!(after.status, AssetStatus::Available);
    assert!(after.last_maintenance >= before);

    assert!(matches!(
        maintenance::complete_maintenance(&env.store, &env.audit, &admin, asset.id),
        Err(Error::Conflict(_))
    ));
}

#[test]
fn test_due_for_maintenance_window() {
    let env = env();
    let admin = env.admin("admin");

    // Both serviced 40 days ago; one is on a 30-day cycle, one on 45.
    let mut due = env.asset("OLD-30");
    due.last_maintenance = Utc::now() - Duration::days(40);
    due.maintenance_rate_days = 30;
    env.store.update_asset(&due).unwrap();

    let mut not_due = env.asset("OLD-45");
    not_due.last_maintenance = Utc::now() - Duration::days(40);
    not_due.maintenance_rate_days = 45;
    env.store.update_asset(&not_due).unwrap();

    let report = maintenance::due_for_maintenance(&env.store, &env.audit, &admin).unwrap();
    let ids: Vec<i64> = report.iter().map(|a| a.id).collect();
    assert!(ids.contains(&due.id));
    assert!(!ids.contains(&not_due.id));
}

#[test]
fn test_due_for_maintenance_respects_visibility() {
    let env = env();
    let hr = env.label("department:HR");
    let it = env.label("department:IT");

    let mut hr_asset = env.asset_with_labels("HR-SRV", &[&hr]);
    hr_asset.last_maintenance = Utc::now() - Duration::days(100);
    env.store.update_asset(&hr_asset).unwrap();

    let mut it_asset = env.asset_with_labels("IT-SRV", &[&it]);
    it_asset.last_maintenance = Utc::now() - Duration::days(100);
    env.store.update_asset(&it_asset).unwrap();

    let reader = env.user("hr-reader");
    env.grant(&reader, RoleName::ReadAsset, "department:HR");
    let p = env.principal(&reader);

    let report = maintenance::due_for_maintenance(&env.store, &env.audit, &p).unwrap();
    let ids: Vec<i64> = report.iter().map(|a| a.id).collect();
    assert!(ids.contains(&hr_asset.id));
    assert!(!ids.contains(&it_asset.id));
}

#[test]
fn test_overdue_window() {
    let env = env();
    let admin = env.admin("admin");
    let soon = env.asset("SOON");
    let later = env.asset("LATER");
    let borrower = env.user("borrower");

    assignments::check_out(&env.store, &env.audit, &admin, soon.id, borrower.id, 2).unwrap();
    assignments::check_out(&env.store, &env.audit, &admin, later.id, borrower.id, 30).unwrap();

    let p = env.principal(&borrower);
    let due = assignments::overdue(&env.store, &env.audit, &p, 7).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].asset_id, soon.id);

    assert!(matches!(
        assignments::overdue(&env.store, &env.audit, &p, -1),
        Err(Error::Validation(_))
    ));
}
