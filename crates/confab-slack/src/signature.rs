//! Request signing verification for the Slack Events API.
//!
//! Slack signs every delivery with HMAC-SHA256 over `v0:{timestamp}:{body}`
//! and ships the result in the `x-slack-signature` header as `v0={hex}`.
//! Verification must run over the raw body bytes exactly as received;
//! re-serializing parsed JSON changes the bytes and breaks the MAC.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Maximum accepted distance between the request timestamp and our clock,
/// in seconds. Anything older is treated as a possible replay.
pub const REPLAY_WINDOW_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("missing signature headers")]
    MissingHeaders,

    #[error("request timestamp outside the replay window")]
    StaleTimestamp,

    #[error("signature mismatch")]
    Mismatch,
}

/// Check one request against the signing secret.
///
/// `now` is epoch seconds, injected by the caller so the replay window is
/// testable. The MAC comparison is constant-time via `verify_slice`.
pub fn verify(
    secret: &str,
    body: &[u8],
    timestamp: Option<&str>,
    signature: Option<&str>,
    now: i64,
) -> Result<(), SignatureError> {
    let (timestamp, signature) = match (timestamp, signature) {
        (Some(t), Some(s)) => (t, s),
        _ => return Err(SignatureError::MissingHeaders),
    };

    // A timestamp we cannot parse cannot prove freshness.
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::StaleTimestamp)?;
    // abs_diff rather than subtraction: extreme timestamps must not overflow.
    if now.abs_diff(ts) > REPLAY_WINDOW_SECS {
        return Err(SignatureError::StaleTimestamp);
    }

    let presented = signature
        .strip_prefix("v0=")
        .ok_or(SignatureError::Mismatch)?;
    let presented = hex::decode(presented).map_err(|_| SignatureError::Mismatch)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::Mismatch)?;
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);

    mac.verify_slice(&presented)
        .map_err(|_| SignatureError::Mismatch)
}
