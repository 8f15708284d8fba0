//! Mock board and test rig for integration tests.
//!
//! `MockBoard` records every display, LED and buzzer call so tests can
//! assert on the full history without touching real peripherals.  `Rig`
//! wires it to a [`SessionController`] and the in-memory Firebase
//! simulation, and steps simulated time in loop-sized increments.

use std::collections::VecDeque;

use parcelbox::access::RfidCode;
use parcelbox::adapters::firebase::{FirebaseAdapter, FirebaseEndpoints};
use parcelbox::app::events::AppEvent;
use parcelbox::app::ports::{
    BackendPort, CardReaderPort, DisplayPort, EntropyPort, EventSink, IndicatorPort, RangerPort,
};
use parcelbox::app::service::SessionController;
use parcelbox::config::SystemConfig;
use parcelbox::indicator::{LedState, Tone};

// ── Board call record ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum BoardCall {
    Show(String, String),
    Led(LedState),
    Beep(Tone),
}

// ── MockBoard ─────────────────────────────────────────────────

pub struct MockBoard {
    pub calls: Vec<BoardCall>,
    /// Cards presented on upcoming polls, one per tick.
    pub cards: VecDeque<RfidCode>,
    /// Distance the ranger reports, in cm.
    pub distance_cm: f32,
    pub entropy: u32,
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            cards: VecDeque::new(),
            distance_cm: 30.0,
            entropy: 0x1234_ABCD,
        }
    }

    pub fn present(&mut self, code: &str) {
        let mut card = RfidCode::new();
        let _ = card.push_str(code);
        self.cards.push_back(card);
    }

    /// Most recent screen, trailing padding trimmed.
    pub fn screen(&self) -> Option<(String, String)> {
        self.calls.iter().rev().find_map(|c| match c {
            BoardCall::Show(a, b) => Some((a.trim_end().to_string(), b.trim_end().to_string())),
            _ => None,
        })
    }

    pub fn showed(&self, line1: &str) -> bool {
        self.calls
            .iter()
            .any(|c| matches!(c, BoardCall::Show(a, _) if a.trim_end() == line1))
    }

    pub fn led(&self) -> LedState {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                BoardCall::Led(led) => Some(*led),
                _ => None,
            })
            .unwrap_or(LedState::Off)
    }

    pub fn beeps(&self) -> Vec<Tone> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BoardCall::Beep(t) => Some(*t),
                _ => None,
            })
            .collect()
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl CardReaderPort for MockBoard {
    fn poll_card(&mut self) -> Option<RfidCode> {
        self.cards.pop_front()
    }
}

impl RangerPort for MockBoard {
    fn measure_cm(&mut self) -> f32 {
        self.distance_cm
    }
}

impl DisplayPort for MockBoard {
    fn show(&mut self, line1: &str, line2: &str) {
        self.calls.push(BoardCall::Show(line1.to_string(), line2.to_string()));
    }
}

impl IndicatorPort for MockBoard {
    fn set_led(&mut self, led: LedState) {
        self.calls.push(BoardCall::Led(led));
    }

    fn beep(&mut self, tone: Tone, _now_ms: u64) {
        self.calls.push(BoardCall::Beep(tone));
    }

    fn service(&mut self, _now_ms: u64) {}
}

impl EntropyPort for MockBoard {
    fn next_u32(&mut self) -> u32 {
        self.entropy
    }
}

// ── Recording sink ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub const LOOP_MS: u64 = 100;

pub fn test_endpoints() -> FirebaseEndpoints {
    FirebaseEndpoints {
        rtdb_host: "parcelbox-test-default-rtdb.firebaseio.com".into(),
        rtdb_auth: "test-token".into(),
        project_id: "parcelbox-test".into(),
        api_key: "test-key".into(),
    }
}

pub struct Rig {
    pub controller: SessionController,
    pub backend: FirebaseAdapter,
    pub board: MockBoard,
    pub sink: RecordingSink,
    pub wifi_up: bool,
    pub now_ms: u64,
}

#[allow(dead_code)]
impl Rig {
    /// Booted at t=0 with WiFi and the backend up.
    pub fn online() -> Self {
        Self::with_config(SystemConfig::default(), true)
    }

    /// Booted at t=0 with no WiFi.
    pub fn offline() -> Self {
        Self::with_config(SystemConfig::default(), false)
    }

    pub fn with_config(config: SystemConfig, wifi_up: bool) -> Self {
        let mut backend = FirebaseAdapter::new(test_endpoints());
        if wifi_up {
            backend.reconnect().expect("sim backend connects");
        }
        let mut rig = Self {
            controller: SessionController::new(config, "ESP32_001".into()),
            backend,
            board: MockBoard::new(),
            sink: RecordingSink::default(),
            wifi_up,
            now_ms: 0,
        };
        rig.controller
            .start(0, wifi_up, &mut rig.backend, &mut rig.board, &mut rig.sink);
        rig
    }

    pub fn tick(&mut self) {
        self.controller.tick(
            self.now_ms,
            self.wifi_up,
            &mut self.backend,
            &mut self.board,
            &mut self.sink,
        );
    }

    /// Step the loop until `t_ms`, inclusive.
    pub fn run_until(&mut self, t_ms: u64) {
        while self.now_ms + LOOP_MS <= t_ms {
            self.now_ms += LOOP_MS;
            self.tick();
        }
    }

    pub fn run_for(&mut self, ms: u64) {
        self.run_until(self.now_ms + ms);
    }
}
