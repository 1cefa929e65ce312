//! Referral and event code handling
//!
//! Codes are short unique tokens shared in `/start` deep links. A composite
//! code `"<referral_code>_<event_code>"` attributes a new user to a referrer
//! within an event; the split happens here, at the boundary, so the rest of
//! the engine never touches delimiter-joined strings.

use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

use crate::utils::errors::{GroupWardenError, Result};

/// Length of generated referral and event codes
pub const CODE_LENGTH: usize = 8;

/// Code alphabet. Excludes 0/O/1/I so codes survive being read aloud.
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

fn code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z0-9]{4,16}$").unwrap())
}

fn group_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(https://t\.me/(joinchat/|\+)?[A-Za-z0-9_\-]+|@[A-Za-z0-9_]{5,})$").unwrap()
    })
}

/// Generate a new random code
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// Check that a single (non-composite) code is well formed
pub fn is_valid_code(code: &str) -> bool {
    code_regex().is_match(code)
}

/// Check a Telegram group link (https://t.me/... or @username)
pub fn is_valid_group_link(link: &str) -> bool {
    group_link_regex().is_match(link)
}

/// A parsed `/start` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartArg {
    /// `"<referral_code>_<event_code>"` — referred into an event
    Composite { referral: String, event: String },
    /// A single code; resolved as an event code first, then as a personal code
    Bare(String),
}

/// Parse a raw `/start` argument into its addressing form.
///
/// Splits on the *last* underscore, since generated codes themselves never
/// contain one. Malformed input (empty parts, illegal characters) is rejected
/// before any lookup happens.
pub fn parse_start_arg(raw: &str) -> Result<StartArg> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(GroupWardenError::Validation("empty start argument".to_string()));
    }

    if let Some((referral, event)) = raw.rsplit_once('_') {
        if !is_valid_code(referral) || !is_valid_code(event) {
            return Err(GroupWardenError::Validation(format!(
                "malformed composite code: {raw}"
            )));
        }
        return Ok(StartArg::Composite {
            referral: referral.to_string(),
            event: event.to_string(),
        });
    }

    if !is_valid_code(raw) {
        return Err(GroupWardenError::Validation(format!("malformed code: {raw}")));
    }
    Ok(StartArg::Bare(raw.to_string()))
}

/// Compose the shareable link for a bare referral or event code
pub fn deep_link(bot_username: &str, code: &str) -> String {
    format!("https://t.me/{bot_username}?start={code}")
}

/// Compose the event-scoped referral code `"<referral_code>_<event_code>"`
pub fn composite_code(referral_code: &str, event_code: &str) -> String {
    format!("{referral_code}_{event_code}")
}
