//! Failure taxonomy for barcode lookups and the classifier that decides what
//! the dispatcher does with each failed attempt.
//!
//! ```text
//!   LookupError ──classify──► Disposition
//!                               ├─ Fatal      whitelist rejection, surfaced to the caller
//!                               ├─ Absent     404 / 400, resolved as "not found"
//!                               └─ Transient  everything else, retried while budget remains
//! ```
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;

/// Error raised by a single lookup attempt.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("backend returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("failed to reach backend: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid backend response: {0}")]
    Decode(String),

    #[error("failed to obtain session token: {0}")]
    Auth(String),

    /// The backend reported the provider's whitelist rejection in a
    /// structured way.
    #[error("provider rejected server address: {0}")]
    ProviderWhitelist(String),

    #[error("invalid search query: {0}")]
    InvalidQuery(String),

    #[error("{0}")]
    Other(String),
}

impl LookupError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            LookupError::Status { status, .. } => Some(*status),
            LookupError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

/// The nutrition provider refuses requests from the backend's IP address.
/// This is a deployment problem, so it is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("IP address {} not whitelisted in the nutrition provider API. Please add this IP to the provider whitelist.", .ip.as_deref().unwrap_or("unknown"))]
pub struct ProviderWhitelistError {
    pub ip: Option<String>,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Fatal(ProviderWhitelistError),
    Absent,
    Transient,
}

const WHITELIST_MARKERS: [&str; 2] = ["not whitelisted", "invalid ip address detected"];

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']+)'").expect("static regex"));
static IPV4: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,3}(?:\.\d{1,3}){3})\b").expect("static regex"));

/// Decide how the dispatcher treats a failed attempt. Whitelist detection
/// takes precedence over the HTTP status.
pub fn classify(err: &LookupError) -> Disposition {
    if let Some(fatal) = whitelist_rejection(err) {
        return Disposition::Fatal(fatal);
    }
    match err.status() {
        Some(StatusCode::NOT_FOUND) | Some(StatusCode::BAD_REQUEST) => Disposition::Absent,
        _ => Disposition::Transient,
    }
}

fn whitelist_rejection(err: &LookupError) -> Option<ProviderWhitelistError> {
    let message = err.to_string();
    let structured = matches!(err, LookupError::ProviderWhitelist(_));
    let lowered = message.to_lowercase();
    if !structured && !WHITELIST_MARKERS.iter().any(|m| lowered.contains(m)) {
        return None;
    }
    Some(ProviderWhitelistError {
        ip: extract_ip(&message),
        detail: message,
    })
}

fn extract_ip(message: &str) -> Option<String> {
    if let Some(ip) = IPV4.captures(message).and_then(|c| c.get(1)) {
        return Some(ip.as_str().to_string());
    }
    QUOTED
        .captures_iter(message)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .find(|s| looks_like_ip(s))
        .map(str::to_string)
}

fn looks_like_ip(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok() || s.parse::<Ipv6Addr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16, message: &str) -> LookupError {
        LookupError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            message: message.into(),
        }
    }

    #[test]
    fn not_found_and_bad_request_are_absent() {
        assert_eq!(classify(&status(404, "Product not found")), Disposition::Absent);
        assert_eq!(classify(&status(400, "Barcode too short")), Disposition::Absent);
    }

    #[test]
    fn other_failures_are_transient() {
        assert_eq!(classify(&status(500, "boom")), Disposition::Transient);
        assert_eq!(classify(&status(503, "down")), Disposition::Transient);
        assert_eq!(classify(&status(401, "expired")), Disposition::Transient);
        assert_eq!(
            classify(&LookupError::Auth("no session".into())),
            Disposition::Transient
        );
        assert_eq!(
            classify(&LookupError::Decode("eof".into())),
            Disposition::Transient
        );
        assert_eq!(
            classify(&LookupError::Other("timeout".into())),
            Disposition::Transient
        );
    }

    #[test]
    fn whitelist_message_is_fatal_with_ip() {
        let err = status(
            500,
            "Failed to search by barcode: IP address 203.0.113.7 not whitelisted in FatSecret API. Please add this IP to your whitelist.",
        );
        match classify(&err) {
            Disposition::Fatal(fatal) => {
                assert_eq!(fatal.ip.as_deref(), Some("203.0.113.7"));
                assert!(fatal.to_string().contains("not whitelisted"));
                assert!(fatal.detail.contains("FatSecret"));
            }
            other => panic!("unexpected disposition {:?}", other),
        }
    }

    #[test]
    fn provider_phrase_with_quoted_address() {
        let err = LookupError::Other("Invalid IP address detected: '2001:db8::1'".into());
        match classify(&err) {
            Disposition::Fatal(fatal) => assert_eq!(fatal.ip.as_deref(), Some("2001:db8::1")),
            other => panic!("unexpected disposition {:?}", other),
        }
    }

    #[test]
    fn quoted_non_address_is_not_taken_as_ip() {
        let err = LookupError::Other("Key 'PlateMate-prod' not whitelisted".into());
        match classify(&err) {
            Disposition::Fatal(fatal) => {
                assert_eq!(fatal.ip, None);
                assert!(fatal.to_string().starts_with("IP address unknown not whitelisted"));
            }
            other => panic!("unexpected disposition {:?}", other),
        }

        let err = LookupError::Other(
            "Key 'PlateMate-prod' rejected: Invalid IP address detected: '2001:db8::2'".into(),
        );
        match classify(&err) {
            Disposition::Fatal(fatal) => assert_eq!(fatal.ip.as_deref(), Some("2001:db8::2")),
            other => panic!("unexpected disposition {:?}", other),
        }
    }

    #[test]
    fn whitelist_beats_status() {
        let err = status(400, "IP address 10.0.0.1 not whitelisted");
        assert!(matches!(classify(&err), Disposition::Fatal(_)));
    }

    #[test]
    fn structured_variant_is_fatal_without_phrase() {
        let err = LookupError::ProviderWhitelist("code 21".into());
        match classify(&err) {
            Disposition::Fatal(fatal) => {
                assert_eq!(fatal.ip, None);
                assert!(fatal.to_string().contains("unknown"));
            }
            other => panic!("unexpected disposition {:?}", other),
        }
    }
}
