//! Link loss and recovery: WiFi drops, backend faults, fixed-interval
//! reconnects.

use serde_json::json;

use crate::mock_hw::Rig;
use parcelbox::app::events::AppEvent;
use parcelbox::backend::{device_status_path, HARDWARE_PATH, PAIRING_DOC};
use parcelbox::error::BackendError;
use parcelbox::fsm::StateId;

fn backend_up(rig: &Rig) -> bool {
    rig.controller.system_state().backend_connected
}

#[test]
fn heartbeat_reports_link_state() {
    let mut rig = Rig::online();
    rig.run_until(10_000);

    let beat = rig.backend.sim_record(&device_status_path("ESP32_001"));
    assert_eq!(beat["deviceId"], json!("ESP32_001"));
    assert_eq!(beat["wifiConnected"], json!(true));
    assert_eq!(beat["firebaseConnected"], json!(true));
    assert_eq!(beat["currentSession"], json!(""));
    assert_eq!(beat["uptime"], json!(10_000));
    assert_eq!(beat["lastHeartbeat"], json!("10000"));
}

#[test]
fn timeout_takes_backend_down_until_the_retry() {
    let mut rig = Rig::online();
    rig.backend.sim_fail_with(Some(BackendError::Timeout));
    rig.run_until(2_000);
    assert!(!backend_up(&rig));
    assert!(rig.sink.events.contains(&AppEvent::ConnectivityChanged { wifi: true, backend: false }));

    rig.backend.sim_fail_with(None);
    rig.run_until(6_900);
    assert!(!backend_up(&rig), "retry waits the full backoff");

    rig.run_until(7_000);
    assert!(backend_up(&rig));
    assert!(rig.sink.events.contains(&AppEvent::ConnectivityChanged { wifi: true, backend: true }));
}

#[test]
fn failed_reconnect_is_retried_on_the_same_interval() {
    let mut rig = Rig::online();
    rig.run_until(2_000);

    rig.backend.sim_set_link(false);
    rig.run_until(2_100);
    assert!(!backend_up(&rig));

    rig.run_until(7_100);
    assert!(!backend_up(&rig), "link still down at the first retry");

    rig.backend.sim_set_link(true);
    rig.run_until(12_000);
    assert!(!backend_up(&rig));
    rig.run_until(12_100);
    assert!(backend_up(&rig));
}

#[test]
fn auth_failure_leaves_backend_online() {
    let mut rig = Rig::online();
    rig.backend.sim_fail_with(Some(BackendError::AuthFailure));
    rig.run_until(4_000);

    assert!(backend_up(&rig));
    assert!(rig.sink.count(|e| matches!(e, AppEvent::BackendFault { error: BackendError::AuthFailure, .. })) >= 2);
}

#[test]
fn wifi_loss_suspends_backend_work() {
    let mut rig = Rig::online();
    rig.run_until(1_000);

    rig.wifi_up = false;
    rig.backend.sim_set_link(false);
    let writes = rig.backend.sim_writes();
    rig.backend
        .sim_put_document(PAIRING_DOC, &json!({ "isActive": true, "userId": "user-42" }));

    rig.run_until(20_000);
    assert_eq!(rig.backend.sim_writes(), writes);
    assert_eq!(rig.controller.state(), StateId::Idle, "status is not polled offline");
    assert!(!rig.controller.system_state().wifi_connected);
}

#[test]
fn wifi_restore_reconnects_the_backend_at_once() {
    let mut rig = Rig::online();
    rig.run_until(1_000);
    rig.wifi_up = false;
    rig.backend.sim_set_link(false);
    rig.run_until(3_000);

    rig.wifi_up = true;
    rig.backend.sim_set_link(true);
    rig.run_until(3_100);
    assert!(backend_up(&rig));

    rig.backend
        .sim_put_document(PAIRING_DOC, &json!({ "isActive": true, "userId": "user-42" }));
    rig.run_until(4_000);
    assert_eq!(rig.controller.state(), StateId::Pairing);
}

#[test]
fn offline_boot_connects_when_wifi_arrives() {
    let mut rig = Rig::offline();
    rig.run_until(5_000);
    assert!(!backend_up(&rig));

    rig.wifi_up = true;
    rig.run_until(5_100);
    assert!(backend_up(&rig));
}

#[test]
fn pairing_expires_even_while_offline() {
    let mut rig = Rig::online();
    rig.backend
        .sim_put_document(PAIRING_DOC, &json!({ "isActive": true, "userId": "user-42" }));
    rig.run_until(2_000);
    assert_eq!(rig.controller.state(), StateId::Pairing);

    rig.wifi_up = false;
    rig.backend.sim_set_link(false);
    rig.run_until(32_100);
    assert_eq!(rig.controller.state(), StateId::Idle);

    // The cancel is held until the link returns.
    let doc = rig.backend.sim_document(PAIRING_DOC).unwrap();
    assert_eq!(doc["status"], json!("generated"));
    assert_eq!(rig.controller.pending_writes().len(), 2);

    rig.wifi_up = true;
    rig.backend.sim_set_link(true);
    rig.run_until(36_000);

    let doc = rig.backend.sim_document(PAIRING_DOC).unwrap();
    assert_eq!(doc["status"], json!("cancelled"));
    assert_eq!(doc["isActive"], json!(false));
    let hw = rig.backend.sim_record(HARDWARE_PATH);
    assert_eq!(hw["isInUse"], json!(false));
    assert_eq!(hw["rfid"], json!(""));
    assert_eq!(rig.controller.state(), StateId::Idle, "expired request is not reopened");
    assert!(rig.controller.pending_writes().is_empty());
}

#[test]
fn offline_boot_resets_hardware_once_connected() {
    let mut rig = Rig::offline();
    rig.backend.sim_put_record(
        HARDWARE_PATH,
        json!({ "isInUse": true, "sessionType": "rfid", "rfid": "OLDCODE1" }),
    );
    rig.run_until(1_000);
    assert_eq!(rig.backend.sim_record(HARDWARE_PATH)["isInUse"], json!(true));

    rig.wifi_up = true;
    rig.run_until(1_100);

    let hw = rig.backend.sim_record(HARDWARE_PATH);
    assert_eq!(hw["isInUse"], json!(false));
    assert_eq!(hw["deviceId"], json!("ESP32_001"));
}
