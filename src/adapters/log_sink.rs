//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production, stderr on the host).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { device_id } => {
                info!("START | device={}", device_id);
            }
            AppEvent::SessionChanged { from, to } => {
                info!("SESSION | {:?} -> {:?}", from, to);
            }
            AppEvent::PairingCodeIssued { user_id, code } => {
                info!("PAIR | code={} user={}", code, user_id);
            }
            AppEvent::PairingClosed { code, elapsed_ms } => {
                info!("PAIR | code={} closed after {}ms", code, elapsed_ms);
            }
            AppEvent::CardScanned { code, state } => {
                info!("SCAN | card={} in {:?}", code, state);
            }
            AppEvent::AccessDecided { code, access_type } => {
                info!("ACCESS | card={} result={}", code, access_type);
            }
            AppEvent::CapacityUpdated { percentage, status } => {
                info!("CAPACITY | {:.1}% {}", percentage, status.label());
            }
            AppEvent::ConnectivityChanged { wifi, backend } => {
                info!(
                    "LINK | wifi={} backend={}",
                    if *wifi { "up" } else { "down" },
                    if *backend { "up" } else { "down" },
                );
            }
            AppEvent::BackendFault { path, error } => {
                warn!("BACKEND | {} -> {}", path, error);
            }
        }
    }
}
