//! Timer/scheduler engine.
//!
//! Drives the controller's independent poll cadences.  The scheduler
//! notifies a [`SchedulerDelegate`] when a timer fires; the controller
//! implements the delegate to collect the set of work due this tick.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Timers                                │
//! │                                                              │
//! │  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌──────────┐   │
//! │  │ Heartbeat │  │ Capacity  │  │ Status    │  │ Display  │   │
//! │  │ 10 s      │  │ 5 s       │  │ 2 s       │  │ 1 s      │   │
//! │  └─────┬─────┘  └─────┬─────┘  └─────┬─────┘  └─────┬────┘   │
//! │        │              │              │              │        │
//! │        ▼              ▼              ▼              ▼        │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              SchedulerDelegate                         │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          ▼                                   │
//! │                SessionController.tick()                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every timer is a plain `now - anchor >= interval` check against the
//! millisecond clock, so a slow tick never makes a timer fire twice.

use crate::app::ports::{ScheduleFiredKind, SchedulerDelegate};
use log::{debug, info};

// ═══════════════════════════════════════════════════════════════
//  Schedule types
// ═══════════════════════════════════════════════════════════════

/// Identity of a timer.  One live schedule per id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TimerId {
    Heartbeat = 0,
    CapacityCheck = 1,
    StatusCheck = 2,
    DisplayRefresh = 3,
    BackendReconnect = 4,
}

impl TimerId {
    /// Bit for set-style bookkeeping in delegates.
    pub const fn mask(self) -> u8 {
        1 << (self as u8)
    }
}

/// A single schedule entry.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub id: TimerId,
    pub kind: ScheduleKind,
    pub enabled: bool,
}

/// The type of schedule determines how and when it fires.
#[derive(Debug, Clone, Copy)]
pub enum ScheduleKind {
    /// Fire every `interval_ms`, re-anchored at each fire.
    Periodic { interval_ms: u32 },
    /// Fire once after `delay_ms`, then auto-disable.
    OneShot { delay_ms: u32 },
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Maximum number of concurrent schedules (stack-allocated).
const MAX_SCHEDULES: usize = 6;

/// The scheduler engine.
///
/// Decoupled from the controller: when a schedule fires it invokes the
/// [`SchedulerDelegate`] callback, which keeps the engine testable on
/// its own.
pub struct Scheduler {
    schedules: [Option<ScheduleEntry>; MAX_SCHEDULES],
}

/// Internal bookkeeping for a live schedule.
#[derive(Debug, Clone)]
struct ScheduleEntry {
    schedule: Schedule,
    /// Time of the last fire (or of registration, before the first fire).
    anchor_ms: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            schedules: [None, None, None, None, None, None],
        }
    }

    /// Add or replace the schedule for `schedule.id`, anchored at `now_ms`.
    /// Returns the slot index, or `None` if full.
    pub fn add(&mut self, schedule: Schedule, now_ms: u64) -> Option<usize> {
        let slot = self
            .position(schedule.id)
            .or_else(|| self.schedules.iter().position(Option::is_none))?;
        debug!("Scheduler: {:?} at slot {} ({:?})", schedule.id, slot, schedule.kind);
        self.schedules[slot] = Some(ScheduleEntry {
            schedule,
            anchor_ms: now_ms,
        });
        Some(slot)
    }

    /// Register a periodic timer.
    pub fn every(&mut self, id: TimerId, interval_ms: u32, now_ms: u64) -> Option<usize> {
        self.add(
            Schedule {
                id,
                kind: ScheduleKind::Periodic { interval_ms },
                enabled: true,
            },
            now_ms,
        )
    }

    /// Arm (or re-arm) a one-shot timer.
    pub fn once(&mut self, id: TimerId, delay_ms: u32, now_ms: u64) -> Option<usize> {
        self.add(
            Schedule {
                id,
                kind: ScheduleKind::OneShot { delay_ms },
                enabled: true,
            },
            now_ms,
        )
    }

    /// Remove the schedule for `id`, if present.
    pub fn cancel(&mut self, id: TimerId) {
        if let Some(slot) = self.position(id) {
            self.schedules[slot] = None;
        }
    }

    /// `true` while an enabled schedule exists for `id`.
    pub fn is_armed(&self, id: TimerId) -> bool {
        self.schedules
            .iter()
            .flatten()
            .any(|e| e.schedule.id == id && e.schedule.enabled)
    }

    /// Tick the scheduler.  Call once per loop iteration.
    ///
    /// Fires `delegate.on_schedule_fired()` for every timer whose period
    /// has elapsed at `now_ms`.
    pub fn tick(&mut self, now_ms: u64, delegate: &mut dyn SchedulerDelegate) {
        for slot in &mut self.schedules {
            let entry = match slot {
                Some(e) if e.schedule.enabled => e,
                _ => continue,
            };
            let elapsed = now_ms.saturating_sub(entry.anchor_ms);

            match entry.schedule.kind {
                ScheduleKind::Periodic { interval_ms } => {
                    if elapsed >= u64::from(interval_ms) {
                        delegate.on_schedule_fired(entry.schedule.id, ScheduleFiredKind::Periodic);
                        entry.anchor_ms = now_ms;
                    }
                }
                ScheduleKind::OneShot { delay_ms } => {
                    if elapsed >= u64::from(delay_ms) {
                        info!(
                            "Scheduler: {:?} one-shot fired (after {}ms)",
                            entry.schedule.id, delay_ms
                        );
                        delegate.on_schedule_fired(entry.schedule.id, ScheduleFiredKind::OneShot);
                        entry.schedule.enabled = false;
                    }
                }
            }
        }
    }

    /// Number of active (enabled) schedules.
    pub fn active_count(&self) -> usize {
        self.schedules
            .iter()
            .flatten()
            .filter(|e| e.schedule.enabled)
            .count()
    }

    fn position(&self, id: TimerId) -> Option<usize> {
        self.schedules
            .iter()
            .position(|s| s.as_ref().is_some_and(|e| e.schedule.id == id))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
