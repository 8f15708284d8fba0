//! App-initiated card pairing, end to end.

use serde_json::json;

use crate::mock_hw::Rig;
use parcelbox::app::events::AppEvent;
use parcelbox::backend::{ACTIVITY_COLLECTION, HARDWARE_PATH, PAIRING_DOC};
use parcelbox::fsm::StateId;
use parcelbox::indicator::{LedState, Tone};

fn request_pairing(rig: &mut Rig) {
    rig.backend
        .sim_put_document(PAIRING_DOC, &json!({ "isActive": true, "userId": "user-42" }));
}

#[test]
fn pairing_request_publishes_generated_code() {
    let mut rig = Rig::online();
    request_pairing(&mut rig);

    rig.run_until(1_900);
    assert_eq!(rig.controller.state(), StateId::Idle, "first status poll is at 2 s");

    rig.run_until(2_000);
    assert_eq!(rig.controller.state(), StateId::Pairing);
    assert_eq!(rig.controller.pairing().generated_code.as_str(), "1234ABCD");

    let hw = rig.backend.sim_record(HARDWARE_PATH);
    assert_eq!(hw["isInUse"], json!(true));
    assert_eq!(hw["sessionType"], json!("rfid"));
    assert_eq!(hw["rfid"], json!("1234ABCD"));

    let doc = rig.backend.sim_document(PAIRING_DOC).unwrap();
    assert_eq!(doc["rfidCode"], json!("1234ABCD"));
    assert_eq!(doc["status"], json!("generated"));
    assert_eq!(doc["userId"], json!("user-42"), "patch keeps the app's fields");

    assert_eq!(
        rig.board.screen(),
        Some(("RFID Pairing".to_string(), "1234ABCD".to_string()))
    );
    assert_eq!(rig.board.led(), LedState::Green);
    assert!(rig.board.beeps().contains(&Tone::new(1_500, 500)));
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::PairingCodeIssued { user_id, .. } if user_id == "user-42")),
        1
    );
}

#[test]
fn pairing_times_out_and_cancels() {
    let mut rig = Rig::online();
    request_pairing(&mut rig);
    rig.run_until(2_000);
    assert_eq!(rig.controller.state(), StateId::Pairing);

    // Open for exactly the timeout: not yet expired.
    rig.run_until(32_000);
    assert_eq!(rig.controller.state(), StateId::Pairing);

    rig.run_until(32_100);
    assert_eq!(rig.controller.state(), StateId::Idle);

    let hw = rig.backend.sim_record(HARDWARE_PATH);
    assert_eq!(hw["isInUse"], json!(false));
    assert_eq!(hw["rfid"], json!(""));

    let doc = rig.backend.sim_document(PAIRING_DOC).unwrap();
    assert_eq!(doc["isActive"], json!(false));
    assert_eq!(doc["status"], json!("cancelled"));
    assert_eq!(doc["cancelledTime"], json!("32100"));
    assert_eq!(rig.board.led(), LedState::Off);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::PairingClosed { elapsed_ms: 30_100, .. })),
        1
    );

    // The document is inactive now, so no new session opens.
    rig.run_for(10_000);
    assert_eq!(rig.controller.state(), StateId::Idle);
    let (line1, _) = rig.board.screen().unwrap();
    assert!(line1.starts_with("Cap:"), "idle screen is back, got {line1:?}");
}

#[test]
fn scans_during_pairing_are_ignored() {
    let mut rig = Rig::online();
    request_pairing(&mut rig);
    rig.run_until(2_000);

    rig.board.present("04A1B2C3");
    rig.run_for(500);

    assert_eq!(rig.controller.state(), StateId::Pairing);
    assert!(rig.backend.sim_documents_in(ACTIVITY_COLLECTION).is_empty());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::AccessDecided { .. })), 0);
}

#[test]
fn pairing_is_preferred_over_package_access() {
    let mut rig = Rig::online();
    request_pairing(&mut rig);
    rig.backend.sim_put_record(
        HARDWARE_PATH,
        json!({ "isInUse": true, "sessionType": "package_access", "userRfid": "04A1B2C3" }),
    );

    rig.run_until(2_000);
    assert_eq!(rig.controller.state(), StateId::Pairing);
}

#[test]
fn pairing_without_user_is_not_a_request() {
    let mut rig = Rig::online();
    rig.backend
        .sim_put_document(PAIRING_DOC, &json!({ "isActive": true, "userId": "" }));
    rig.run_until(6_000);
    assert_eq!(rig.controller.state(), StateId::Idle);
}
