//! Application service: the hexagonal core.
//!
//! [`SessionController`] owns the session FSM, the capacity monitor, the
//! interval scheduler and the indicator hold sequencer.  It exposes a
//! hardware-agnostic `start` / `tick` API; every byte of I/O flows through
//! port traits injected at call sites, so the whole controller runs on the
//! host against mock adapters.
//!
//! ```text
//!  BackendPort ◀─▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                  │       SessionController      │
//!   DevicePort ◀─▶ │  Scheduler · FSM · Capacity  │
//!                  └──────────────────────────────┘
//! ```
//!
//! One `tick` runs, in order: connectivity bookkeeping, due timers
//! (reconnect, heartbeat, capacity, status poll), card scan, one FSM step,
//! effect application, hold/tone servicing, and the idle capacity screen.
//!
//! Handler writes that cannot reach the backend are parked, one per path,
//! and replayed after reconnect before the next status poll.  A pairing
//! that expires offline therefore still ends up cancelled upstream instead
//! of being reopened from its stale request.

use log::{debug, info, warn};

use crate::backend::records::{self, CapacityReport, HardwareReset, HardwareStatus, Heartbeat, PairingDocument};
use crate::backend::{self, BackendOp, CAPACITY_DOC, HARDWARE_PATH, PAIRING_DOC};
use crate::capacity::{CapacityData, CapacityMonitor};
use crate::config::SystemConfig;
use crate::display;
use crate::error::BackendError;
use crate::fsm::context::{Effect, PackageAccess, PairingSession, SessionContext, SessionInputs};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::indicator::{self, HoldSequencer};
use crate::scheduler::{Scheduler, TimerId};

use super::events::AppEvent;
use super::ports::{BackendPort, DevicePort, EventSink, ScheduleFiredKind, SchedulerDelegate};

/// Most parked writes kept while offline; the oldest is dropped beyond this.
pub const MAX_PENDING_WRITES: usize = 16;

// ───────────────────────────────────────────────────────────────
// SystemState
// ───────────────────────────────────────────────────────────────

/// Connectivity and bookkeeping visible to the heartbeat.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemState {
    pub wifi_connected: bool,
    pub backend_connected: bool,
    pub current_session: StateId,
    pub device_id: String,
    pub last_heartbeat_ms: Option<u64>,
    pub last_capacity_check_ms: Option<u64>,
    pub last_status_check_ms: Option<u64>,
}

impl SystemState {
    fn new(device_id: String) -> Self {
        Self {
            wifi_connected: false,
            backend_connected: false,
            current_session: StateId::Idle,
            device_id,
            last_heartbeat_ms: None,
            last_capacity_check_ms: None,
            last_status_check_ms: None,
        }
    }

    /// Backend work is attempted only when both links are up.
    pub fn online(&self) -> bool {
        self.wifi_connected && self.backend_connected
    }
}

/// Collects the timers that fired during one scheduler pass.
#[derive(Default)]
struct FiredTimers(u8);

impl FiredTimers {
    fn has(&self, id: TimerId) -> bool {
        self.0 & id.mask() != 0
    }
}

impl SchedulerDelegate for FiredTimers {
    fn on_schedule_fired(&mut self, id: TimerId, _kind: ScheduleFiredKind) {
        self.0 |= id.mask();
    }
}

// ───────────────────────────────────────────────────────────────
// SessionController
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct SessionController {
    fsm: Fsm,
    ctx: SessionContext,
    state: SystemState,
    capacity: CapacityMonitor,
    scheduler: Scheduler,
    hold: HoldSequencer,
    /// Writes that missed the backend, replayed once it is back.
    pending: Vec<BackendOp>,
    tick_count: u64,
}

impl SessionController {
    /// Construct the controller.  Does **not** touch any port; call
    /// [`start`](Self::start) next.
    pub fn new(config: SystemConfig, device_id: String) -> Self {
        let capacity = CapacityMonitor::new(config.max_height_cm, config.capacity_push_interval_ms);
        let ctx = SessionContext::new(config, device_id.clone());
        let fsm = Fsm::new(build_state_table(), StateId::Idle);

        Self {
            fsm,
            ctx,
            state: SystemState::new(device_id),
            capacity,
            scheduler: Scheduler::new(),
            hold: HoldSequencer::new(),
            pending: Vec::new(),
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot sequence: arm the interval timers, publish a clean hardware
    /// record and an empty capacity reading, and play the ready chime.
    pub fn start(
        &mut self,
        now_ms: u64,
        wifi_up: bool,
        backend: &mut impl BackendPort,
        hw: &mut impl DevicePort,
        sink: &mut impl EventSink,
    ) {
        self.ctx.now_ms = now_ms;
        self.fsm.start(&mut self.ctx);
        let _ = self.ctx.take_effects();

        let cfg = &self.ctx.config;
        let timers = [
            (TimerId::Heartbeat, cfg.heartbeat_interval_ms),
            (TimerId::CapacityCheck, cfg.capacity_check_interval_ms),
            (TimerId::StatusCheck, cfg.status_check_interval_ms),
            (TimerId::DisplayRefresh, cfg.display_update_interval_ms),
        ];
        for (id, interval_ms) in timers {
            if self.scheduler.every(id, interval_ms, now_ms).is_none() {
                warn!("Scheduler: no slot for {:?}", id);
            }
        }

        self.state.wifi_connected = wifi_up;
        self.state.backend_connected = wifi_up && backend.is_ready();

        let reset = BackendOp::SetRecord {
            path: HARDWARE_PATH.into(),
            value: records::encode(&HardwareReset::new(&self.state.device_id, now_ms)),
        };
        if self.state.online() {
            self.write(now_ms, reset, backend, sink);
            self.push_capacity(now_ms, backend, sink);
        } else {
            warn!(
                "Boot without backend (wifi={}), hardware reset parked",
                self.state.wifi_connected
            );
            self.park(reset);
            if wifi_up {
                self.arm_reconnect(now_ms);
            }
        }

        self.hold.arm(indicator::SYSTEM_READY);
        self.hold.advance(now_ms, hw);

        sink.emit(&AppEvent::Started {
            device_id: self.state.device_id.clone(),
        });
        info!(
            "SessionController started as '{}' (online={})",
            self.state.device_id,
            self.state.online()
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one loop iteration.
    ///
    /// `wifi_up` is the link state reported by the WiFi adapter this tick.
    /// The `hw` parameter satisfies every device port at once, which avoids
    /// juggling several mutable borrows of the same board.
    pub fn tick(
        &mut self,
        now_ms: u64,
        wifi_up: bool,
        backend: &mut impl BackendPort,
        hw: &mut impl DevicePort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        self.ctx.now_ms = now_ms;
        let prev_state = self.fsm.current_state();

        // 1. Link bookkeeping
        self.track_connectivity(now_ms, wifi_up, backend, sink);

        // 2. Due timers
        let mut fired = FiredTimers::default();
        self.scheduler.tick(now_ms, &mut fired);

        if fired.has(TimerId::BackendReconnect) {
            self.try_reconnect(now_ms, backend, sink);
        }
        if self.state.online() && !self.pending.is_empty() {
            self.replay_pending(now_ms, backend, sink);
        }
        if fired.has(TimerId::Heartbeat) {
            self.send_heartbeat(now_ms, backend, sink);
        }
        if fired.has(TimerId::CapacityCheck) {
            self.check_capacity(now_ms, backend, hw, sink);
        }
        if fired.has(TimerId::StatusCheck) {
            self.poll_status(now_ms, backend, sink);
        }

        // 3. Card scan
        if let Some(code) = hw.poll_card() {
            if self.hold.is_active() {
                debug!("Scan {} dropped while a hold is showing", code);
            } else {
                sink.emit(&AppEvent::CardScanned {
                    code: code.clone(),
                    state: prev_state,
                });
                self.ctx.inputs.card = Some(code);
            }
        }
        if self.ctx.inputs.pairing_request.is_some() {
            self.ctx.inputs.entropy = hw.next_u32();
        }

        // 4. FSM step (pure state logic)
        self.fsm.tick(&mut self.ctx);
        if let Some(code) = self.ctx.inputs.card.take() {
            debug!("Scan {} unused: session opened on the same tick", code);
        }
        self.ctx.inputs = SessionInputs::default();

        // 5. Apply what the handlers asked for
        self.apply_effects(now_ms, backend, hw, sink);

        // 6. Time-based outputs
        self.hold.advance(now_ms, hw);
        hw.service(now_ms);

        // 7. Idle capacity screen
        if fired.has(TimerId::DisplayRefresh)
            && !self.fsm.current_state().is_session()
            && !self.hold.is_active()
        {
            let (line1, line2) = display::capacity_screen(self.capacity.data());
            hw.show(&line1, &line2);
        }

        // 8. Report a state change
        let new_state = self.fsm.current_state();
        self.state.current_session = new_state;
        if new_state != prev_state {
            sink.emit(&AppEvent::SessionChanged {
                from: prev_state,
                to: new_state,
            });
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current session state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn system_state(&self) -> &SystemState {
        &self.state
    }

    pub fn capacity(&self) -> &CapacityData {
        self.capacity.data()
    }

    pub fn pairing(&self) -> &PairingSession {
        &self.ctx.pairing
    }

    pub fn package_access(&self) -> &PackageAccess {
        &self.ctx.access
    }

    /// Writes parked while the backend was unreachable.
    pub fn pending_writes(&self) -> &[BackendOp] {
        &self.pending
    }

    /// `true` while a timed indicator program owns the display.
    pub fn is_hold_active(&self) -> bool {
        self.hold.is_active()
    }

    /// Ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &SystemConfig {
        &self.ctx.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn track_connectivity(
        &mut self,
        now_ms: u64,
        wifi_up: bool,
        backend: &mut impl BackendPort,
        sink: &mut impl EventSink,
    ) {
        let before = (self.state.wifi_connected, self.state.backend_connected);

        if wifi_up != self.state.wifi_connected {
            self.state.wifi_connected = wifi_up;
            if wifi_up {
                info!("WiFi up");
                self.state.backend_connected = backend.is_ready();
                if !self.state.backend_connected {
                    self.arm_reconnect_now(now_ms);
                }
            } else {
                warn!("WiFi lost, backend work suspended");
                self.state.backend_connected = false;
                self.scheduler.cancel(TimerId::BackendReconnect);
            }
        } else if self.state.online() && !backend.is_ready() {
            warn!("Backend reports not ready");
            self.state.backend_connected = false;
            self.arm_reconnect(now_ms);
        }

        self.report_connectivity(before, sink);
    }

    fn report_connectivity(&self, before: (bool, bool), sink: &mut impl EventSink) {
        let after = (self.state.wifi_connected, self.state.backend_connected);
        if after != before {
            sink.emit(&AppEvent::ConnectivityChanged {
                wifi: after.0,
                backend: after.1,
            });
        }
    }

    fn arm_reconnect(&mut self, now_ms: u64) {
        if !self.scheduler.is_armed(TimerId::BackendReconnect) {
            let delay = self.ctx.config.backend_retry_ms;
            debug!("Backend reconnect in {} ms", delay);
            self.scheduler.once(TimerId::BackendReconnect, delay, now_ms);
        }
    }

    fn arm_reconnect_now(&mut self, now_ms: u64) {
        self.scheduler.once(TimerId::BackendReconnect, 0, now_ms);
    }

    fn try_reconnect(&mut self, now_ms: u64, backend: &mut impl BackendPort, sink: &mut impl EventSink) {
        if !self.state.wifi_connected || self.state.backend_connected {
            return;
        }
        let before = (self.state.wifi_connected, self.state.backend_connected);
        match backend.reconnect() {
            Ok(()) if backend.is_ready() => {
                info!("Backend reconnected");
                self.state.backend_connected = true;
            }
            Ok(()) => {
                warn!("Backend reconnect returned but client not ready");
                self.arm_reconnect(now_ms);
            }
            Err(e) => {
                warn!("Backend reconnect failed: {}", e);
                self.arm_reconnect(now_ms);
            }
        }
        self.report_connectivity(before, sink);
    }

    /// Log a failed backend call and react to link loss.  Returns the
    /// success value, if any.
    fn note_backend<T>(
        &mut self,
        now_ms: u64,
        path: &str,
        result: Result<T, BackendError>,
        sink: &mut impl EventSink,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                warn!("Backend: {} failed: {}", path, error);
                sink.emit(&AppEvent::BackendFault {
                    path: path.to_string(),
                    error,
                });
                if error.is_connectivity() && self.state.backend_connected {
                    let before = (self.state.wifi_connected, true);
                    self.state.backend_connected = false;
                    self.arm_reconnect(now_ms);
                    self.report_connectivity(before, sink);
                }
                None
            }
        }
    }

    /// Apply one write; park it if the link dropped underneath it.
    fn write(&mut self, now_ms: u64, op: BackendOp, backend: &mut impl BackendPort, sink: &mut impl EventSink) {
        let result = op.apply(backend);
        let lost = matches!(result, Err(e) if e.is_connectivity());
        self.note_backend(now_ms, op.path(), result, sink);
        if lost {
            self.park(op);
        }
    }

    fn park(&mut self, op: BackendOp) {
        if let Some(queued) = self.pending.iter_mut().find(|q| q.path() == op.path()) {
            queued.merge(op);
            return;
        }
        if self.pending.len() >= MAX_PENDING_WRITES {
            let dropped = self.pending.remove(0);
            warn!("Pending writes full, dropping {}", dropped.path());
        }
        self.pending.push(op);
    }

    fn replay_pending(&mut self, now_ms: u64, backend: &mut impl BackendPort, sink: &mut impl EventSink) {
        let ops = core::mem::take(&mut self.pending);
        info!("Replaying {} parked write(s)", ops.len());
        for op in ops {
            if self.state.online() {
                self.write(now_ms, op, backend, sink);
            } else {
                self.park(op);
            }
        }
    }

    fn send_heartbeat(&mut self, now_ms: u64, backend: &mut impl BackendPort, sink: &mut impl EventSink) {
        self.state.last_heartbeat_ms = Some(now_ms);
        if !self.state.online() {
            debug!("Heartbeat skipped (offline)");
            return;
        }
        let path = backend::device_status_path(&self.state.device_id);
        let beat = records::encode(&Heartbeat {
            device_id: &self.state.device_id,
            last_heartbeat: backend::timestamp(now_ms),
            wifi_connected: self.state.wifi_connected,
            firebase_connected: self.state.backend_connected,
            current_session: self.fsm.current_state().session_tag(),
            uptime: now_ms,
        });
        let result = backend.set_record(&path, &beat);
        self.note_backend(now_ms, &path, result, sink);
    }

    fn check_capacity(
        &mut self,
        now_ms: u64,
        backend: &mut impl BackendPort,
        hw: &mut impl DevicePort,
        sink: &mut impl EventSink,
    ) {
        self.state.last_capacity_check_ms = Some(now_ms);
        let distance = hw.measure_cm();
        if !self.capacity.update(distance, now_ms) {
            return;
        }

        let data = *self.capacity.data();
        debug!(
            "Capacity: {:.1} cm → {:.1}% ({})",
            distance,
            data.percentage,
            data.status.label()
        );
        sink.emit(&AppEvent::CapacityUpdated {
            percentage: data.percentage,
            status: data.status,
        });

        if self.state.online() && self.capacity.push_due(now_ms) {
            self.push_capacity(now_ms, backend, sink);
        }
    }

    fn push_capacity(&mut self, now_ms: u64, backend: &mut impl BackendPort, sink: &mut impl EventSink) {
        let data = *self.capacity.data();
        let report = records::encode(&CapacityReport {
            height: data.current_height_cm,
            max_height: data.max_height_cm,
            last_updated: backend::timestamp(now_ms),
            device_id: &self.state.device_id,
        });
        let result = backend.patch_document(CAPACITY_DOC, &report);
        self.note_backend(now_ms, CAPACITY_DOC, result, sink);
        self.capacity.mark_pushed(now_ms);
    }

    /// Read both request records and stage them as FSM inputs.
    fn poll_status(&mut self, now_ms: u64, backend: &mut impl BackendPort, sink: &mut impl EventSink) {
        self.state.last_status_check_ms = Some(now_ms);
        if !self.state.online() {
            return;
        }

        let pairing = match backend.get_document(PAIRING_DOC) {
            Err(BackendError::NotFound) => Ok(PairingDocument::default()),
            other => other.and_then(records::decode::<PairingDocument>),
        };
        if let Some(doc) = self.note_backend(now_ms, PAIRING_DOC, pairing, sink) {
            self.ctx.inputs.pairing_request = doc.pairing_request();
        }

        if !self.state.online() {
            return;
        }

        let hardware = match backend.get_record(HARDWARE_PATH) {
            Err(BackendError::NotFound) => Ok(HardwareStatus::default()),
            other => other.and_then(records::decode::<HardwareStatus>),
        };
        if let Some(status) = self.note_backend(now_ms, HARDWARE_PATH, hardware, sink) {
            self.ctx.inputs.access_request = status.access_request();
        }
    }

    fn apply_effects(
        &mut self,
        now_ms: u64,
        backend: &mut impl BackendPort,
        hw: &mut impl DevicePort,
        sink: &mut impl EventSink,
    ) {
        for effect in self.ctx.take_effects() {
            match effect {
                Effect::Backend(op) => {
                    if self.state.online() {
                        self.write(now_ms, op, backend, sink);
                    } else {
                        debug!("Offline, parking write to {}", op.path());
                        self.park(op);
                    }
                }
                Effect::Show { line1, line2 } => hw.show(&line1, &line2),
                Effect::Led(led) => hw.set_led(led),
                Effect::Beep(tone) => hw.beep(tone, now_ms),
                Effect::Hold(program) => self.hold.arm(program),
                Effect::CancelHold => {
                    if self.hold.cancel() {
                        debug!("Hold preempted by a session");
                    }
                }
                Effect::Emit(event) => sink.emit(&event),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::RfidCode;
    use crate::app::ports::{CardReaderPort, DisplayPort, EntropyPort, IndicatorPort, RangerPort};
    use crate::indicator::{LedState, Tone};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeBackend {
        ready: bool,
        records: HashMap<String, Value>,
        documents: HashMap<String, Value>,
        fail_with: Option<BackendError>,
        writes: Vec<String>,
        reconnects: u32,
    }

    impl FakeBackend {
        fn online() -> Self {
            Self {
                ready: true,
                ..Self::default()
            }
        }

        fn check(&self) -> Result<(), BackendError> {
            self.fail_with.map_or(Ok(()), Err)
        }
    }

    impl BackendPort for FakeBackend {
        fn is_ready(&self) -> bool {
            self.ready
        }
        fn reconnect(&mut self) -> Result<(), BackendError> {
            self.reconnects += 1;
            self.check()?;
            self.ready = true;
            Ok(())
        }
        fn get_record(&mut self, path: &str) -> Result<Value, BackendError> {
            self.check()?;
            Ok(self.records.get(path).cloned().unwrap_or(Value::Null))
        }
        fn set_record(&mut self, path: &str, value: &Value) -> Result<(), BackendError> {
            self.check()?;
            self.writes.push(path.to_string());
            self.records.insert(path.to_string(), value.clone());
            Ok(())
        }
        fn update_record(&mut self, path: &str, fields: &Value) -> Result<(), BackendError> {
            self.check()?;
            self.writes.push(path.to_string());
            let entry = self.records.entry(path.to_string()).or_insert_with(|| json!({}));
            if let (Some(dst), Some(src)) = (entry.as_object_mut(), fields.as_object()) {
                for (k, v) in src {
                    dst.insert(k.clone(), v.clone());
                }
            }
            Ok(())
        }
        fn get_document(&mut self, path: &str) -> Result<Value, BackendError> {
            self.check()?;
            self.documents.get(path).cloned().ok_or(BackendError::NotFound)
        }
        fn patch_document(&mut self, path: &str, fields: &Value) -> Result<(), BackendError> {
            self.check()?;
            self.writes.push(path.to_string());
            let entry = self.documents.entry(path.to_string()).or_insert_with(|| json!({}));
            if let (Some(dst), Some(src)) = (entry.as_object_mut(), fields.as_object()) {
                for (k, v) in src {
                    dst.insert(k.clone(), v.clone());
                }
            }
            Ok(())
        }
        fn create_document(&mut self, path: &str, fields: &Value) -> Result<(), BackendError> {
            self.check()?;
            self.writes.push(path.to_string());
            self.documents.insert(path.to_string(), fields.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeBoard {
        card: Option<RfidCode>,
        distance_cm: f32,
        screen: (String, String),
        led: Option<LedState>,
        beeps: Vec<Tone>,
    }

    impl CardReaderPort for FakeBoard {
        fn poll_card(&mut self) -> Option<RfidCode> {
            self.card.take()
        }
    }
    impl RangerPort for FakeBoard {
        fn measure_cm(&mut self) -> f32 {
            self.distance_cm
        }
    }
    impl DisplayPort for FakeBoard {
        fn show(&mut self, line1: &str, line2: &str) {
            self.screen = (line1.to_string(), line2.to_string());
        }
    }
    impl IndicatorPort for FakeBoard {
        fn set_led(&mut self, led: LedState) {
            self.led = Some(led);
        }
        fn beep(&mut self, tone: Tone, _now_ms: u64) {
            self.beeps.push(tone);
        }
        fn service(&mut self, _now_ms: u64) {}
    }
    impl EntropyPort for FakeBoard {
        fn next_u32(&mut self) -> u32 {
            0xCAFE_F00D
        }
    }

    #[derive(Default)]
    struct Events(Vec<AppEvent>);

    impl EventSink for Events {
        fn emit(&mut self, event: &AppEvent) {
            self.0.push(event.clone());
        }
    }

    fn boot(backend: &mut FakeBackend) -> (SessionController, FakeBoard, Events) {
        let mut ctl = SessionController::new(SystemConfig::default(), "BOX-TEST".into());
        let mut board = FakeBoard::default();
        let mut events = Events::default();
        ctl.start(0, true, backend, &mut board, &mut events);
        (ctl, board, events)
    }

    #[test]
    fn start_publishes_reset_and_empty_capacity() {
        let mut backend = FakeBackend::online();
        let (ctl, board, events) = boot(&mut backend);

        assert_eq!(backend.records[HARDWARE_PATH]["isInUse"], false);
        assert_eq!(backend.records[HARDWARE_PATH]["deviceId"], "BOX-TEST");
        assert_eq!(backend.documents[CAPACITY_DOC]["height"], 0.0);
        assert_eq!(backend.documents[CAPACITY_DOC]["maxHeight"], 30.0);
        assert!(ctl.is_hold_active(), "ready chime holds the screen");
        assert_eq!(board.beeps.len(), 1);
        assert!(matches!(events.0[0], AppEvent::Started { .. }));
    }

    #[test]
    fn status_poll_opens_pairing_with_generated_code() {
        let mut backend = FakeBackend::online();
        backend
            .documents
            .insert(PAIRING_DOC.into(), json!({ "isActive": true, "userId": "u1" }));
        let (mut ctl, mut board, mut events) = boot(&mut backend);

        ctl.tick(2_000, true, &mut backend, &mut board, &mut events);

        assert_eq!(ctl.state(), StateId::Pairing);
        assert_eq!(ctl.pairing().generated_code.as_str(), "CAFEF00D");
        assert_eq!(backend.records[HARDWARE_PATH]["rfid"], "CAFEF00D");
        assert_eq!(backend.documents[PAIRING_DOC]["status"], "generated");
        assert_eq!(board.screen.0.trim_end(), "RFID Pairing");
        assert!(!ctl.is_hold_active(), "session preempts the ready hold");
        assert!(events.0.contains(&AppEvent::SessionChanged {
            from: StateId::Idle,
            to: StateId::Pairing,
        }));
    }

    #[test]
    fn offline_tick_skips_backend_but_keeps_capacity() {
        let mut backend = FakeBackend::online();
        let (mut ctl, mut board, mut events) = boot(&mut backend);
        let writes_after_boot = backend.writes.len();

        board.distance_cm = 15.0;
        for t in (100..=10_000).step_by(100) {
            ctl.tick(t, false, &mut backend, &mut board, &mut events);
        }

        assert_eq!(backend.writes.len(), writes_after_boot);
        assert!((ctl.capacity().percentage - 50.0).abs() < 0.01);
        assert_eq!(board.screen.0.trim_end(), "Cap: 50%");
    }

    #[test]
    fn connectivity_error_arms_fixed_backoff_reconnect() {
        let mut backend = FakeBackend::online();
        let (mut ctl, mut board, mut events) = boot(&mut backend);

        backend.fail_with = Some(BackendError::Timeout);
        ctl.tick(2_000, true, &mut backend, &mut board, &mut events);
        assert!(!ctl.system_state().backend_connected);
        assert!(events.0.iter().any(|e| matches!(e, AppEvent::BackendFault { .. })));

        // Before the backoff nothing is retried.
        ctl.tick(6_900, true, &mut backend, &mut board, &mut events);
        assert_eq!(backend.reconnects, 0);

        ctl.tick(7_000, true, &mut backend, &mut board, &mut events);
        assert_eq!(backend.reconnects, 1, "first retry 5000 ms after the failure");
        assert!(!ctl.system_state().backend_connected);

        backend.fail_with = None;
        ctl.tick(12_000, true, &mut backend, &mut board, &mut events);
        assert_eq!(backend.reconnects, 2);
        assert!(ctl.system_state().backend_connected);
    }

    #[test]
    fn non_connectivity_error_keeps_backend_online() {
        let mut backend = FakeBackend::online();
        let (mut ctl, mut board, mut events) = boot(&mut backend);

        backend.fail_with = Some(BackendError::Rejected(400));
        ctl.tick(2_000, true, &mut backend, &mut board, &mut events);
        assert!(ctl.system_state().backend_connected);
        assert!(!ctl.scheduler.is_armed(TimerId::BackendReconnect));
    }

    #[test]
    fn wifi_restore_reconnects_backend_immediately() {
        let mut backend = FakeBackend::online();
        let (mut ctl, mut board, mut events) = boot(&mut backend);

        ctl.tick(100, false, &mut backend, &mut board, &mut events);
        backend.ready = false;
        ctl.tick(200, true, &mut backend, &mut board, &mut events);
        assert_eq!(backend.reconnects, 1);
        assert!(ctl.system_state().online());
        assert!(events.0.contains(&AppEvent::ConnectivityChanged {
            wifi: false,
            backend: false,
        }));
    }

    #[test]
    fn writes_lost_to_a_timeout_are_replayed_after_reconnect() {
        let mut backend = FakeBackend::online();
        let (mut ctl, mut board, mut events) = boot(&mut backend);
        backend.records.insert(
            HARDWARE_PATH.into(),
            json!({ "isInUse": true, "sessionType": "package_access", "userRfid": "12345678" }),
        );
        ctl.tick(2_000, true, &mut backend, &mut board, &mut events);
        assert_eq!(ctl.state(), StateId::PackageAccess);

        backend.fail_with = Some(BackendError::Timeout);
        board.card = Some(RfidCode::try_from("12345678").unwrap());
        ctl.tick(2_100, true, &mut backend, &mut board, &mut events);
        assert_eq!(ctl.state(), StateId::Idle);
        assert_eq!(ctl.pending_writes().len(), 2);
        assert_eq!(backend.records[HARDWARE_PATH]["isInUse"], true);

        backend.fail_with = None;
        ctl.tick(7_100, true, &mut backend, &mut board, &mut events);
        assert!(ctl.system_state().online());
        assert!(ctl.pending_writes().is_empty());
        assert!(backend.documents.contains_key(&backend::activity_doc_path(2_100, "12345678")));
        assert_eq!(backend.records[HARDWARE_PATH]["isInUse"], false);
    }

    #[test]
    fn parked_writes_collapse_per_path() {
        let mut backend = FakeBackend::online();
        let (mut ctl, _board, _events) = boot(&mut backend);
        for i in 0..(MAX_PENDING_WRITES + 4) {
            ctl.park(BackendOp::UpdateRecord {
                path: HARDWARE_PATH.into(),
                fields: json!({ "weight": i }),
            });
        }
        assert_eq!(ctl.pending_writes().len(), 1);

        for i in 0..(MAX_PENDING_WRITES + 4) {
            ctl.park(BackendOp::CreateDocument {
                path: backend::activity_doc_path(i as u64, "12345678"),
                fields: json!({}),
            });
        }
        assert_eq!(ctl.pending_writes().len(), MAX_PENDING_WRITES);
        assert_eq!(ctl.pending_writes()[0].path(), backend::activity_doc_path(4, "12345678"));
    }

    #[test]
    fn scan_on_the_tick_a_pairing_opens_is_not_judged() {
        let mut backend = FakeBackend::online();
        backend
            .documents
            .insert(PAIRING_DOC.into(), json!({ "isActive": true, "userId": "u1" }));
        let (mut ctl, mut board, mut events) = boot(&mut backend);

        board.card = Some(RfidCode::try_from("12345678").unwrap());
        ctl.tick(2_000, true, &mut backend, &mut board, &mut events);

        assert_eq!(ctl.state(), StateId::Pairing);
        assert!(!events.0.iter().any(|e| matches!(e, AppEvent::AccessDecided { .. })));
        assert!(backend.documents.keys().all(|k| !k.starts_with("globalActivities/")));

        ctl.tick(2_100, true, &mut backend, &mut board, &mut events);
        assert_eq!(ctl.state(), StateId::Pairing);
    }

    #[test]
    fn scans_during_a_hold_are_dropped() {
        let mut backend = FakeBackend::online();
        let (mut ctl, mut board, mut events) = boot(&mut backend);
        assert!(ctl.is_hold_active());

        board.card = Some(RfidCode::try_from("12345678").unwrap());
        ctl.tick(100, true, &mut backend, &mut board, &mut events);
        assert!(!events.0.iter().any(|e| matches!(e, AppEvent::AccessDecided { .. })));
    }
}
