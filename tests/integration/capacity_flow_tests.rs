//! Capacity sensing: classification, the idle screen and rate-limited pushes.

use serde_json::json;

use crate::mock_hw::Rig;
use parcelbox::app::events::AppEvent;
use parcelbox::backend::CAPACITY_DOC;
use parcelbox::capacity::CapacityStatus;

fn screen(rig: &Rig) -> (String, String) {
    rig.board.screen().expect("something was shown")
}

#[test]
fn boot_pushes_an_empty_box() {
    let rig = Rig::online();
    let doc = rig.backend.sim_document(CAPACITY_DOC).unwrap();
    assert_eq!(doc["height"], json!(0.0));
    assert_eq!(doc["maxHeight"], json!(30.0));
    assert_eq!(doc["deviceId"], json!("ESP32_001"));
    assert_eq!(doc["lastUpdated"], json!("0"));
}

#[test]
fn readings_are_classified_and_shown() {
    let mut rig = Rig::online();

    rig.board.distance_cm = 30.0;
    rig.run_until(5_000);
    assert_eq!(rig.controller.capacity().percentage, 0.0);
    assert_eq!(rig.controller.capacity().status, CapacityStatus::Empty);
    assert_eq!(screen(&rig), ("Cap: 0%".into(), "Empty".into()));

    rig.board.distance_cm = 15.0;
    rig.run_until(10_000);
    assert_eq!(rig.controller.capacity().percentage, 50.0);
    assert_eq!(rig.controller.capacity().status, CapacityStatus::FairlyFull);
    assert_eq!(screen(&rig), ("Cap: 50%".into(), "Fairly Full".into()));

    rig.board.distance_cm = 3.0;
    rig.run_until(15_000);
    assert!((rig.controller.capacity().percentage - 90.0).abs() < 1e-3);
    assert_eq!(rig.controller.capacity().status, CapacityStatus::AlmostFull);
    assert_eq!(screen(&rig), ("Cap: 90%".into(), "Almost Full".into()));

    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::CapacityUpdated { .. })),
        3
    );
}

#[test]
fn pushes_are_rate_limited() {
    let mut rig = Rig::online();

    // 5 s after the boot push: measured but not pushed.
    rig.board.distance_cm = 15.0;
    rig.run_until(5_000);
    let doc = rig.backend.sim_document(CAPACITY_DOC).unwrap();
    assert_eq!(doc["height"], json!(0.0));

    // 10 s after the boot push: pushed.
    rig.run_until(10_000);
    let doc = rig.backend.sim_document(CAPACITY_DOC).unwrap();
    assert_eq!(doc["height"], json!(15.0));
    assert_eq!(doc["lastUpdated"], json!("10000"));

    rig.board.distance_cm = 3.0;
    rig.run_until(15_000);
    let doc = rig.backend.sim_document(CAPACITY_DOC).unwrap();
    assert_eq!(doc["height"], json!(15.0), "only 5 s since the last push");

    rig.run_until(20_000);
    let doc = rig.backend.sim_document(CAPACITY_DOC).unwrap();
    assert_eq!(doc["height"], json!(27.0));
}

#[test]
fn out_of_range_readings_keep_the_last_value() {
    let mut rig = Rig::online();
    rig.board.distance_cm = 15.0;
    rig.run_until(5_000);

    for bad in [0.0, -2.0, 45.0] {
        rig.board.distance_cm = bad;
        rig.run_for(5_000);
        assert_eq!(rig.controller.capacity().percentage, 50.0, "reading {bad} must be discarded");
    }
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::CapacityUpdated { .. })),
        1
    );
}

#[test]
fn capacity_keeps_running_offline() {
    let mut rig = Rig::offline();
    assert!(rig.backend.sim_document(CAPACITY_DOC).is_none());

    rig.board.distance_cm = 3.0;
    rig.run_until(10_000);
    assert_eq!(rig.controller.capacity().status, CapacityStatus::AlmostFull);
    assert_eq!(screen(&rig), ("Cap: 90%".into(), "Almost Full".into()));
    assert!(rig.backend.sim_document(CAPACITY_DOC).is_none());
    assert_eq!(rig.backend.sim_writes(), 0);
}
