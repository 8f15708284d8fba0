//! Capacity classifier.
//!
//! The ultrasonic ranger is mounted in the lid, looking down.  A reading of
//! `d` cm means the parcels stack up to `max - d` cm:
//!
//! ```text
//!   ┌──── sensor ────┐  ─┬─
//!   │       │ d      │   │
//!   │  ┌────▼────┐   │   │ max_height
//!   │  │ parcels │   │   │
//!   └──┴─────────┴───┘  ─┴─
//! ```
//!
//! Readings outside `(0, max]` (no echo, or a bounce off the far wall when
//! the lid is open) are discarded without touching the last good value.

use log::debug;

/// Fill level bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityStatus {
    Empty,
    Available,
    FairlyFull,
    AlmostFull,
}

impl CapacityStatus {
    /// Bucket a fill percentage: `<10`, `<50`, `<80`, else almost full.
    pub fn from_percentage(percentage: f32) -> Self {
        if percentage < 10.0 {
            Self::Empty
        } else if percentage < 50.0 {
            Self::Available
        } else if percentage < 80.0 {
            Self::FairlyFull
        } else {
            Self::AlmostFull
        }
    }

    /// Label for the second LCD line.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Available => "Available",
            Self::FairlyFull => "Fairly Full",
            Self::AlmostFull => "Almost Full",
        }
    }
}

/// Latest accepted capacity measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityData {
    pub current_height_cm: f32,
    pub max_height_cm: f32,
    /// Always within `0.0..=100.0`.
    pub percentage: f32,
    pub status: CapacityStatus,
    pub last_update_ms: u64,
}

impl CapacityData {
    /// Empty box, never measured.
    pub fn empty(max_height_cm: f32) -> Self {
        Self {
            current_height_cm: 0.0,
            max_height_cm,
            percentage: 0.0,
            status: CapacityStatus::Empty,
            last_update_ms: 0,
        }
    }
}

/// `true` when `distance_cm` is a usable echo for a box of `max_height_cm`.
pub fn is_valid_reading(distance_cm: f32, max_height_cm: f32) -> bool {
    distance_cm > 0.0 && distance_cm <= max_height_cm
}

/// Fill percentage for a valid reading, clamped to `0..=100`.
pub fn fill_percentage(distance_cm: f32, max_height_cm: f32) -> f32 {
    let height = max_height_cm - distance_cm;
    (height / max_height_cm * 100.0).clamp(0.0, 100.0)
}

/// Owns [`CapacityData`] and the push rate limit.
pub struct CapacityMonitor {
    data: CapacityData,
    push_interval_ms: u64,
    last_push_ms: Option<u64>,
}

impl CapacityMonitor {
    pub fn new(max_height_cm: f32, push_interval_ms: u32) -> Self {
        Self {
            data: CapacityData::empty(max_height_cm),
            push_interval_ms: u64::from(push_interval_ms),
            last_push_ms: None,
        }
    }

    pub fn data(&self) -> &CapacityData {
        &self.data
    }

    /// Feed one ranger reading.  Returns `true` when the reading was accepted.
    pub fn update(&mut self, distance_cm: f32, now_ms: u64) -> bool {
        let max = self.data.max_height_cm;
        if !is_valid_reading(distance_cm, max) {
            debug!("Capacity: discarding reading {:.1} cm (max {:.1})", distance_cm, max);
            return false;
        }

        let percentage = fill_percentage(distance_cm, max);
        self.data = CapacityData {
            current_height_cm: max - distance_cm,
            max_height_cm: max,
            percentage,
            status: CapacityStatus::from_percentage(percentage),
            last_update_ms: now_ms,
        };
        true
    }

    /// `true` once a full interval has elapsed since the previous push,
    /// counting the boundary tick itself.
    pub fn push_due(&self, now_ms: u64) -> bool {
        self.last_push_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.push_interval_ms)
    }

    /// Record a push at `now_ms` (including the boot push).
    pub fn mark_pushed(&mut self, now_ms: u64) {
        self.last_push_ms = Some(now_ms);
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn percentage_matches_formula(d in 0.01f32..=30.0) {
            let mut m = CapacityMonitor::new(30.0, 10_000);
            prop_assert!(m.update(d, 1));
            let expected = (30.0 - d) / 30.0 * 100.0;
            prop_assert!((m.data().percentage - expected).abs() < 0.01);
            prop_assert!((0.0..=100.0).contains(&m.data().percentage));
            prop_assert_eq!(m.data().status, CapacityStatus::from_percentage(m.data().percentage));
        }

        #[test]
        fn out_of_range_never_changes_data(
            good in 0.01f32..=30.0,
            bad in prop_oneof![-500.0f32..=0.0, 30.001f32..500.0],
        ) {
            let mut m = CapacityMonitor::new(30.0, 10_000);
            m.update(good, 1);
            let before = *m.data();
            prop_assert!(!m.update(bad, 2));
            prop_assert_eq!(*m.data(), before);
        }
    }
}
