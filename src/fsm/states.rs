//! Concrete state handler functions and table builder.
//!
//! ```text
//!            ┌──[scan: self-access check]──┐
//!            ▼                             │
//!          IDLE ───────────────────────────┘
//!          │  ▲  ▲
//!  [pairing│  │  │[one scan handled]
//!  request]│  │  └──────────── PACKAGE_ACCESS ◀──[access request]── IDLE
//!          ▼  │[now - start > timeout]
//!        PAIRING
//! ```
//!
//! Pairing is checked before package access, so a tick that sees both
//! requests opens a pairing session.

use super::context::{Effect, PackageAccess, PairingSession, SessionContext};
use super::{StateDescriptor, StateId};
use crate::access::{self, AccessDecision, RfidCode};
use crate::app::events::AppEvent;
use crate::backend::records::{self, ActivityLog, HardwarePatch, PairingCancelled, PairingCodeIssued};
use crate::backend::{self, BackendOp, HARDWARE_PATH, PAIRING_DOC, SessionType};
use crate::indicator::{self, LedState, Tone};
use log::info;

/// Beep when a pairing code appears on the LCD.
const PAIRING_TONE: Tone = Tone::new(1_500, 500);

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: Pairing
        StateDescriptor {
            id: StateId::Pairing,
            name: "Pairing",
            on_enter: Some(pairing_enter),
            on_exit: Some(pairing_exit),
            on_update: pairing_update,
        },
        // Index 2: PackageAccess
        StateDescriptor {
            id: StateId::PackageAccess,
            name: "PackageAccess",
            on_enter: Some(package_access_enter),
            on_exit: Some(package_access_exit),
            on_update: package_access_update,
        },
    ]
}

fn hardware_update(ctx: &mut SessionContext, patch: &HardwarePatch) {
    ctx.backend(BackendOp::UpdateRecord {
        path: HARDWARE_PATH.into(),
        fields: records::encode(patch),
    });
}

fn log_activity(ctx: &mut SessionContext, code: &str, access_type: &'static str) {
    let log = ActivityLog::package_access(code, access_type, &ctx.device_id, ctx.now_ms);
    ctx.backend(BackendOp::CreateDocument {
        path: backend::activity_doc_path(ctx.now_ms, code),
        fields: records::encode(&log),
    });
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut SessionContext) {
    ctx.pairing = PairingSession::default();
    ctx.access = PackageAccess::default();
    info!("IDLE: waiting for a request or a card");
}

fn idle_update(ctx: &mut SessionContext) -> Option<StateId> {
    if let Some(request) = ctx.inputs.pairing_request.take() {
        ctx.pairing.user_id = request.user_id;
        return Some(StateId::Pairing);
    }

    if let Some(request) = ctx.inputs.access_request.take() {
        ctx.access.user_rfid = request.user_rfid;
        return Some(StateId::PackageAccess);
    }

    if let Some(code) = ctx.inputs.card.take() {
        self_access(ctx, code);
    }

    None
}

/// A card shown at the idle screen, with no session open.
fn self_access(ctx: &mut SessionContext, code: RfidCode) {
    if access::is_self_access_code(&code) {
        info!("IDLE: self-access accepted for {}", code);
        log_activity(ctx, &code, "self_access");
        ctx.push(Effect::Hold(indicator::SELF_ACCESS_OK));
        ctx.emit(AppEvent::AccessDecided {
            code,
            access_type: "self_access",
        });
    } else {
        info!("IDLE: self-access rejected for {} ({} chars)", code, code.len());
        ctx.push(Effect::Hold(indicator::SELF_ACCESS_REJECTED));
        ctx.emit(AppEvent::AccessDecided {
            code,
            access_type: "rejected",
        });
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  PAIRING state: a code is on the LCD for the app to pick up
// ═══════════════════════════════════════════════════════════════════════════

fn pairing_enter(ctx: &mut SessionContext) {
    let code = access::generate_code(ctx.inputs.entropy);
    let user_id = core::mem::take(&mut ctx.pairing.user_id);
    ctx.pairing = PairingSession {
        is_active: true,
        user_id,
        generated_code: code.clone(),
        start_ms: ctx.now_ms,
        timeout_ms: ctx.config.pairing_timeout_ms,
    };
    info!(
        "PAIRING: code {} for user '{}' (open {} ms)",
        code, ctx.pairing.user_id, ctx.pairing.timeout_ms
    );

    ctx.push(Effect::CancelHold);
    let stamp = backend::timestamp(ctx.now_ms);
    hardware_update(
        ctx,
        &HardwarePatch {
            is_in_use: Some(true),
            session_type: Some(SessionType::Rfid.as_wire()),
            rfid: Some(code.to_string()),
            last_activity: Some(stamp.clone()),
            ..HardwarePatch::default()
        },
    );
    ctx.backend(BackendOp::PatchDocument {
        path: PAIRING_DOC.into(),
        fields: records::encode(&PairingCodeIssued {
            rfid_code: &code,
            status: "generated",
            received_time: stamp,
        }),
    });
    ctx.show("RFID Pairing", &code);
    ctx.push(Effect::Led(LedState::Green));
    ctx.push(Effect::Beep(PAIRING_TONE));
    ctx.emit(AppEvent::PairingCodeIssued {
        user_id: ctx.pairing.user_id.clone(),
        code,
    });
}

fn pairing_update(ctx: &mut SessionContext) -> Option<StateId> {
    if let Some(code) = ctx.inputs.card.take() {
        info!("PAIRING: card {} ignored while a pairing code is shown", code);
    }

    if ctx.pairing.is_expired(ctx.now_ms) {
        info!(
            "PAIRING: timed out after {} ms",
            ctx.pairing.elapsed_ms(ctx.now_ms)
        );
        return Some(StateId::Idle);
    }

    None
}

fn pairing_exit(ctx: &mut SessionContext) {
    let stamp = backend::timestamp(ctx.now_ms);
    hardware_update(
        ctx,
        &HardwarePatch {
            is_in_use: Some(false),
            session_type: Some(SessionType::None.as_wire()),
            rfid: Some(String::new()),
            ..HardwarePatch::default()
        },
    );
    ctx.backend(BackendOp::PatchDocument {
        path: PAIRING_DOC.into(),
        fields: records::encode(&PairingCancelled {
            is_active: false,
            status: "cancelled",
            cancelled_time: stamp,
        }),
    });
    ctx.push(Effect::Led(LedState::Off));
    ctx.emit(AppEvent::PairingClosed {
        code: ctx.pairing.generated_code.clone(),
        elapsed_ms: ctx.pairing.elapsed_ms(ctx.now_ms),
    });
    ctx.pairing = PairingSession::default();
}

// ═══════════════════════════════════════════════════════════════════════════
//  PACKAGE_ACCESS state: waiting for the recipient's card
// ═══════════════════════════════════════════════════════════════════════════

fn package_access_enter(ctx: &mut SessionContext) {
    ctx.access.is_processing = true;
    ctx.access.access_ms = ctx.now_ms;
    info!("PACKAGE_ACCESS: requested for card {}", ctx.access.user_rfid);

    ctx.push(Effect::CancelHold);
    ctx.push(Effect::Led(LedState::Off));
    ctx.show("Package Access", "Scan RFID Card");
}

fn package_access_update(ctx: &mut SessionContext) -> Option<StateId> {
    let code = ctx.inputs.card.take()?;
    ctx.access.scanned_code = code.clone();

    let decision = ctx.config.access_policy.decide(&code, &ctx.access.user_rfid);
    info!("PACKAGE_ACCESS: card {} {}", code, decision.as_str());

    log_activity(ctx, &code, decision.as_str());
    ctx.push(Effect::Hold(match decision {
        AccessDecision::Granted => indicator::ACCESS_GRANTED,
        AccessDecision::Denied => indicator::ACCESS_DENIED,
    }));
    ctx.emit(AppEvent::AccessDecided {
        code,
        access_type: decision.as_str(),
    });

    Some(StateId::Idle)
}

fn package_access_exit(ctx: &mut SessionContext) {
    hardware_update(
        ctx,
        &HardwarePatch {
            is_in_use: Some(false),
            session_type: Some(SessionType::None.as_wire()),
            user_rfid: Some(String::new()),
            ..HardwarePatch::default()
        },
    );
    ctx.access = PackageAccess::default();
}
