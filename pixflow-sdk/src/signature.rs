//! Signature algorithm and verification for pixflow.
//!
//! Inbound webhooks may carry an HMAC-SHA256 signature produced with a
//! secret shared with the relay in front of the gateway. The wire format
//! for the header is:
//!
//! ```text
//! Pixflow-Signature: {unix_timestamp}.{base64_signature}
//! ```
//!
//! and the signed data is `"{timestamp}.{raw_body}"`.

/// Header name for the HMAC signature.
pub const SIGNATURE_HEADER: &str = "Pixflow-Signature";

/// Header name for admin API authentication (plaintext secret).
pub const ADMIN_AUTH_HEADER: &str = "Pixflow-Admin-Authorization";

/// Maximum allowed age of a signature (in seconds).
pub const MAX_SIGNATURE_AGE: i64 = 5 * 60;

/// How far ahead of our clock a signature timestamp may be (in seconds).
pub const MAX_CLOCK_SKEW: i64 = 60;

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid header format")]
    InvalidFormat,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("signature expired")]
    Expired,
    #[error("signature timestamp is in the future")]
    FromFuture,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

fn signing_input(timestamp: i64, body: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(body.len() + 21);
    data.extend_from_slice(timestamp.to_string().as_bytes());
    data.push(b'.');
    data.extend_from_slice(body);
    data
}

// ---------------------------------------------------------------------------
// Body signing
// ---------------------------------------------------------------------------

/// Sign a raw request body at the given timestamp.
///
/// Returns the formatted `Pixflow-Signature` header value.
pub fn sign_body_at(body: &[u8], timestamp: i64, key: &[u8]) -> String {
    let sig = ring::hmac::sign(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        &signing_input(timestamp, body),
    );
    format_signature_header(timestamp, sig.as_ref())
}

/// Sign a raw request body with the current time.
pub fn sign_body(body: &[u8], key: &[u8]) -> String {
    sign_body_at(body, time::OffsetDateTime::now_utc().unix_timestamp(), key)
}

/// Verify a raw request body against a `Pixflow-Signature` header value.
///
/// Checks `HMAC-SHA256("{timestamp}.{body}", key)` and timestamp freshness.
pub fn verify_body(header_value: &str, body: &[u8], key: &[u8]) -> Result<(), SignatureError> {
    let (timestamp, signature) = parse_signature_header(header_value)?;
    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        &signing_input(timestamp, body),
        signature.as_ref(),
    )?;
    check_timestamp(timestamp)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Header parsing / formatting
// ---------------------------------------------------------------------------

/// Parse a `Pixflow-Signature` header value (`{timestamp}.{base64}`) into
/// `(timestamp, raw_signature_bytes)`.
pub fn parse_signature_header(value: &str) -> Result<(i64, Box<[u8]>), SignatureError> {
    let dot_pos = value.find('.').ok_or(SignatureError::InvalidFormat)?;
    let timestamp: i64 = value[..dot_pos]
        .parse()
        .map_err(|_| SignatureError::InvalidFormat)?;
    let signature_bytes = fast32::base64::RFC4648_NOPAD
        .decode_str(&value[dot_pos + 1..])
        .map_err(|_| SignatureError::InvalidBase64)?
        .into_boxed_slice();
    Ok((timestamp, signature_bytes))
}

/// Format a `{timestamp}.{base64}` header value from its parts.
pub fn format_signature_header(timestamp: i64, signature: &[u8]) -> String {
    format!(
        "{}.{}",
        timestamp,
        fast32::base64::RFC4648_NOPAD.encode(signature)
    )
}

// ---------------------------------------------------------------------------
// Timestamp validation
// ---------------------------------------------------------------------------

/// Check that a signature timestamp is no older than [`MAX_SIGNATURE_AGE`]
/// and no further ahead than [`MAX_CLOCK_SKEW`].
pub fn check_timestamp(timestamp: i64) -> Result<(), SignatureError> {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    if now.saturating_sub(timestamp) > MAX_SIGNATURE_AGE {
        return Err(SignatureError::Expired);
    }
    if timestamp.saturating_sub(now) > MAX_CLOCK_SKEW {
        return Err(SignatureError::FromFuture);
    }
    Ok(())
}
