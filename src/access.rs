//! RFID codes and access decisions.
//!
//! Codes travel as uppercase hex strings: a scanned 4-byte UID becomes
//! `"04A1B2C3"`, a freshly generated pairing code is eight hex digits
//! drawn from the hardware RNG.

use core::fmt::Write;

use serde::{Deserialize, Serialize};

/// An RFID code as uppercase hex.  Ten-byte UIDs (the longest ISO 14443
/// cascade) fit.
pub type RfidCode = heapless::String<20>;

/// Length of a code accepted by the self-service check at the idle screen.
pub const SELF_ACCESS_CODE_LEN: usize = 8;

/// Render raw UID bytes as zero-padded uppercase hex.
pub fn code_from_uid(uid: &[u8]) -> RfidCode {
    let mut code = RfidCode::new();
    for byte in uid.iter().take(10) {
        let _ = write!(code, "{:02X}", byte);
    }
    code
}

/// Eight uppercase hex digits from a 32-bit random word.
pub fn generate_code(entropy: u32) -> RfidCode {
    let mut code = RfidCode::new();
    let _ = write!(code, "{:08X}", entropy);
    code
}

/// Self-service check run when a card is scanned with no session open.
pub fn is_self_access_code(code: &str) -> bool {
    code.len() == SELF_ACCESS_CODE_LEN
}

// ───────────────────────────────────────────────────────────────
// Package-access policy
// ───────────────────────────────────────────────────────────────

/// How a scan during a package-access session is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccessPolicy {
    /// Every scan opens the box.  Matches the deployed locker behaviour.
    #[default]
    GrantAll,
    /// Only the card named in the access request (`userRfid`) opens the box.
    MatchRequestedCard,
}

/// Outcome of one package-access scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied,
}

impl AccessDecision {
    /// Activity-log tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }
}

impl AccessPolicy {
    pub fn decide(self, scanned: &str, requested: &str) -> AccessDecision {
        match self {
            Self::GrantAll => AccessDecision::Granted,
            Self::MatchRequestedCard => {
                if !requested.is_empty() && scanned.eq_ignore_ascii_case(requested) {
                    AccessDecision::Granted
                } else {
                    AccessDecision::Denied
                }
            }
        }
    }
}
