//! Package access requested through the app, and self-service scans at
//! the idle screen.

use serde_json::{json, Value};

use crate::mock_hw::Rig;
use parcelbox::access::AccessPolicy;
use parcelbox::app::events::AppEvent;
use parcelbox::backend::{ACTIVITY_COLLECTION, HARDWARE_PATH};
use parcelbox::config::SystemConfig;
use parcelbox::fsm::StateId;
use parcelbox::indicator::{LedState, Tone};

fn request_access(rig: &mut Rig, user_rfid: &str) {
    rig.backend.sim_put_record(
        HARDWARE_PATH,
        json!({
            "isInUse": true,
            "sessionType": "package_access",
            "userRfid": user_rfid,
            "deviceId": "ESP32_001",
        }),
    );
}

fn only_activity(rig: &Rig) -> (String, Value) {
    let paths = rig.backend.sim_documents_in(ACTIVITY_COLLECTION);
    assert_eq!(paths.len(), 1, "expected one activity, got {paths:?}");
    let doc = rig.backend.sim_document(&paths[0]).unwrap();
    (paths[0].clone(), doc)
}

#[test]
fn access_request_opens_session_and_grants_any_card() {
    let mut rig = Rig::online();
    request_access(&mut rig, "04A1B2C3");

    rig.run_until(2_000);
    assert_eq!(rig.controller.state(), StateId::PackageAccess);
    assert_eq!(
        rig.board.screen(),
        Some(("Package Access".to_string(), "Scan RFID Card".to_string()))
    );

    rig.board.present("DEADBEEF");
    rig.run_until(2_100);
    assert_eq!(rig.controller.state(), StateId::Idle);

    let (path, doc) = only_activity(&rig);
    assert_eq!(path, "globalActivities/activity_2100_DEADBEEF");
    assert_eq!(doc["type"], json!("package_access"));
    assert_eq!(doc["userId"], json!("unknown"));
    assert_eq!(doc["createdAt"], json!("2100"));
    assert_eq!(doc["metadata"]["rfidCode"], json!("DEADBEEF"));
    assert_eq!(doc["metadata"]["accessType"], json!("granted"));
    assert_eq!(doc["metadata"]["deviceId"], json!("ESP32_001"));

    let hw = rig.backend.sim_record(HARDWARE_PATH);
    assert_eq!(hw["isInUse"], json!(false));
    assert_eq!(hw["sessionType"], json!(""));
    assert_eq!(hw["userRfid"], json!(""));
    assert_eq!(hw["deviceId"], json!("ESP32_001"), "update leaves other keys");
}

#[test]
fn granted_hold_plays_out_without_blocking() {
    let mut rig = Rig::online();
    request_access(&mut rig, "04A1B2C3");
    rig.run_until(2_000);
    rig.board.present("DEADBEEF");

    rig.run_until(2_100);
    assert_eq!(rig.board.screen().unwrap().0, "Processing...");
    assert!(rig.controller.is_hold_active());

    rig.run_until(4_100);
    assert_eq!(rig.board.screen().unwrap().0, "Access Granted");
    assert_eq!(rig.board.led(), LedState::Green);
    assert!(rig.board.beeps().contains(&Tone::new(2_000, 1_000)));

    // The periodic screen stays away until the hold is over.
    rig.run_until(9_000);
    assert_eq!(rig.board.screen().unwrap().0, "Access Granted");

    rig.run_until(10_000);
    assert!(!rig.controller.is_hold_active());
    assert_eq!(rig.board.led(), LedState::Off);
    assert!(rig.board.screen().unwrap().0.starts_with("Cap:"));
}

#[test]
fn matching_policy_denies_a_foreign_card() {
    let config = SystemConfig {
        access_policy: AccessPolicy::MatchRequestedCard,
        ..SystemConfig::default()
    };
    let mut rig = Rig::with_config(config, true);
    request_access(&mut rig, "04A1B2C3");
    rig.run_until(2_000);

    rig.board.present("DEADBEEF");
    rig.run_until(4_100);

    let (_, doc) = only_activity(&rig);
    assert_eq!(doc["metadata"]["accessType"], json!("denied"));
    assert_eq!(rig.board.screen().unwrap().0, "Access Denied");
    assert_eq!(rig.board.led(), LedState::Red);
    assert_eq!(rig.controller.state(), StateId::Idle);
}

#[test]
fn matching_policy_grants_the_requested_card() {
    let config = SystemConfig {
        access_policy: AccessPolicy::MatchRequestedCard,
        ..SystemConfig::default()
    };
    let mut rig = Rig::with_config(config, true);
    request_access(&mut rig, "04a1b2c3");
    rig.run_until(2_000);

    rig.board.present("04A1B2C3");
    rig.run_until(2_100);

    let (_, doc) = only_activity(&rig);
    assert_eq!(doc["metadata"]["accessType"], json!("granted"));
}

#[test]
fn self_access_scan_at_idle_is_logged() {
    let mut rig = Rig::online();
    rig.run_until(3_000);

    rig.board.present("A1B2C3D4");
    rig.run_until(3_100);
    assert_eq!(rig.board.screen().unwrap().0, "Welcome!");

    let (path, doc) = only_activity(&rig);
    assert_eq!(path, "globalActivities/activity_3100_A1B2C3D4");
    assert_eq!(doc["metadata"]["accessType"], json!("self_access"));

    rig.run_until(5_100);
    assert_eq!(rig.board.screen().unwrap().0, "Package Found");
    assert_eq!(rig.board.led(), LedState::Green);
    assert_eq!(rig.controller.state(), StateId::Idle);
}

#[test]
fn short_code_is_rejected_without_logging() {
    let mut rig = Rig::online();
    rig.run_until(3_000);

    rig.board.present("ABC123");
    rig.run_until(3_100);

    assert_eq!(
        rig.board.screen(),
        Some(("Invalid RFID".to_string(), "Try again".to_string()))
    );
    assert_eq!(rig.board.led(), LedState::Red);
    assert!(rig.backend.sim_documents_in(ACTIVITY_COLLECTION).is_empty());
}

#[test]
fn scans_while_a_hold_shows_are_dropped() {
    let mut rig = Rig::online();
    rig.run_until(3_000);

    rig.board.present("A1B2C3D4");
    rig.board.present("B1B2C3D4");
    rig.run_until(3_500);

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::AccessDecided { .. })), 1);
    assert_eq!(rig.backend.sim_documents_in(ACTIVITY_COLLECTION).len(), 1);
}
