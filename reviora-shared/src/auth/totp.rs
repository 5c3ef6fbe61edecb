/// Time-based one-time passwords (RFC 6238) for admin two-factor auth
///
/// Standard authenticator-app TOTP: 6-digit codes over 30-second steps,
/// HMAC-SHA1, shared secret in base32. Verification accepts one step of
/// clock skew in either direction.
///
/// # Enrollment Flow
///
/// 1. Generate a secret with [`generate_secret`] and store it on the admin
///    user (never shown again after setup)
/// 2. Hand the [`provisioning_uri`] to the client as a QR code
/// 3. The admin's authenticator app produces codes; [`verify_code`] checks
///    them at login
///
/// # Example
///
/// ```
/// use reviora_shared::auth::totp;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = totp::generate_secret();
///
/// let code = totp::current_code(&secret)?;
/// assert!(totp::verify_code(&secret, &code)?);
/// # Ok(())
/// # }
/// ```

use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha1 = Hmac<Sha1>;

/// Code length in digits
pub const DIGITS: u32 = 6;

/// Time step in seconds
pub const STEP_SECONDS: u64 = 30;

/// Accepted clock skew, in steps, on either side of now
const SKEW_STEPS: u64 = 1;

/// Secret length in bytes before base32 encoding (160 bits, per RFC 4226)
const SECRET_BYTES: usize = 20;

/// Error type for TOTP operations
#[derive(Debug, thiserror::Error)]
pub enum TotpError {
    /// Secret is not valid base32
    #[error("Invalid TOTP secret: {0}")]
    InvalidSecret(String),
}

/// Generates a new base32-encoded shared secret
///
/// # Example
///
/// ```
/// use reviora_shared::auth::totp::generate_secret;
///
/// let secret = generate_secret();
/// assert_eq!(secret.len(), 32); // 20 bytes -> 32 base32 chars
/// ```
pub fn generate_secret() -> String {
    use rand::RngCore;

    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    base32::encode(base32::Alphabet::RFC4648 { padding: false }, &bytes)
}

/// The current code for a secret
///
/// # Errors
///
/// Returns `TotpError::InvalidSecret` if the secret does not decode
pub fn current_code(secret: &str) -> Result<String, TotpError> {
    code_at(secret, unix_now())
}

/// The code for a secret at a given Unix timestamp
///
/// Exposed separately so verification logic is testable against the
/// RFC 6238 reference vectors.
///
/// # Errors
///
/// Returns `TotpError::InvalidSecret` if the secret does not decode
pub fn code_at(secret: &str, unix_time: u64) -> Result<String, TotpError> {
    let key = decode_secret(secret)?;
    let value = hotp(&key, unix_time / STEP_SECONDS);
    Ok(format!("{:06}", value))
}

/// Verifies a submitted code against the current time
///
/// Accepts the previous, current and next step, so codes survive up to
/// 30 seconds of clock skew between server and authenticator.
///
/// # Errors
///
/// Returns `TotpError::InvalidSecret` if the secret does not decode
pub fn verify_code(secret: &str, code: &str) -> Result<bool, TotpError> {
    verify_code_at(secret, code, unix_now())
}

/// Verifies a submitted code at a given Unix timestamp
///
/// # Errors
///
/// Returns `TotpError::InvalidSecret` if the secret does not decode
pub fn verify_code_at(secret: &str, code: &str, unix_time: u64) -> Result<bool, TotpError> {
    let key = decode_secret(secret)?;

    let trimmed = code.trim();
    if trimmed.len() != DIGITS as usize {
        return Ok(false);
    }

    // Codes are compared numerically, which also strips leading-zero
    // formatting concerns from the submitted string
    let submitted: u32 = match trimmed.parse() {
        Ok(value) => value,
        Err(_) => return Ok(false),
    };

    let step = unix_time / STEP_SECONDS;
    let start = step.saturating_sub(SKEW_STEPS);

    for candidate_step in start..=step + SKEW_STEPS {
        if hotp(&key, candidate_step) == submitted {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Builds an otpauth:// provisioning URI for authenticator apps
///
/// # Example
///
/// ```
/// use reviora_shared::auth::totp::provisioning_uri;
///
/// let uri = provisioning_uri("JBSWY3DPEHPK3PXP", "admin@example.com");
/// assert!(uri.starts_with("otpauth://totp/Reviora:"));
/// assert!(uri.contains("secret=JBSWY3DPEHPK3PXP"));
/// ```
pub fn provisioning_uri(secret: &str, account: &str) -> String {
    format!(
        "otpauth://totp/Reviora:{}?secret={}&issuer=Reviora&algorithm=SHA1&digits={}&period={}",
        encode_label(account),
        secret,
        DIGITS,
        STEP_SECONDS
    )
}

/// HOTP value for one counter (RFC 4226 dynamic truncation)
fn hotp(key: &[u8], counter: u64) -> u32 {
    let mut mac = match HmacSha1::new_from_slice(key) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length
        Err(_) => unreachable!("HMAC key length is unrestricted"),
    };
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);

    binary % 10u32.pow(DIGITS)
}

fn decode_secret(secret: &str) -> Result<Vec<u8>, TotpError> {
    // Authenticator apps display secrets grouped and lowercased
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    base32::decode(base32::Alphabet::RFC4648 { padding: false }, &normalized)
        .ok_or_else(|| TotpError::InvalidSecret("not valid base32".to_string()))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn encode_label(account: &str) -> String {
    let mut encoded = String::with_capacity(account.len());
    for c in account.chars() {
        match c {
            '@' => encoded.push_str("%40"),
            ' ' => encoded.push_str("%20"),
            '?' => encoded.push_str("%3F"),
            '#' => encoded.push_str("%23"),
            '&' => encoded.push_str("%26"),
            '%' => encoded.push_str("%25"),
            other => encoded.push(other),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    /// RFC 6238 Appendix B reference secret ("12345678901234567890" in ASCII)
    fn rfc_secret() -> String {
        base32::encode(
            base32::Alphabet::RFC4648 { padding: false },
            b"12345678901234567890",
        )
    }

    #[test]
    fn test_rfc6238_reference_vectors() {
        // Last six digits of the RFC's 8-digit SHA1 results
        let vectors: [(u64, &str); 6] = [
            (59, "287082"),
            (1_111_111_109, "081804"),
            (1_111_111_111, "050471"),
            (1_234_567_890, "005924"),
            (2_000_000_000, "279037"),
            (20_000_000_000, "353130"),
        ];

        let secret = rfc_secret();
        for (time, expected) in vectors {
            let code = code_at(&secret, time).expect("secret should decode");
            assert_eq!(code, expected, "wrong code at T={}", time);
        }
    }

    #[test]
    fn test_verify_accepts_skew() {
        let secret = rfc_secret();
        let now = 1_111_111_111u64;

        let current = code_at(&secret, now).unwrap();
        let previous = code_at(&secret, now - STEP_SECONDS).unwrap();
        let next = code_at(&secret, now + STEP_SECONDS).unwrap();

        assert!(verify_code_at(&secret, &current, now).unwrap());
        assert!(verify_code_at(&secret, &previous, now).unwrap());
        assert!(verify_code_at(&secret, &next, now).unwrap());

        // Two steps away is outside the window
        let stale = code_at(&secret, now - 2 * STEP_SECONDS).unwrap();
        assert_ne!(stale, current);
        assert!(!verify_code_at(&secret, &stale, now).unwrap());
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let secret = rfc_secret();
        let now = 1_111_111_111u64;

        assert!(!verify_code_at(&secret, "abc123", now).unwrap());
        assert!(!verify_code_at(&secret, "", now).unwrap());
        assert!(!verify_code_at(&secret, "12345", now).unwrap());
        assert!(!verify_code_at(&secret, "1234567", now).unwrap());
    }

    #[test]
    fn test_invalid_secret() {
        assert!(current_code("not base32 at all!!!").is_err());
    }

    #[test]
    fn test_generate_secret_roundtrip() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 32);

        // Generated secrets must decode and produce codes
        let code = code_at(&secret, 59).expect("generated secret should decode");
        assert_eq!(code.len(), 6);
    }

    #[test]
    fn test_secret_normalization() {
        let secret = rfc_secret();
        let spaced = secret
            .chars()
            .enumerate()
            .flat_map(|(i, c)| {
                if i > 0 && i % 4 == 0 {
                    vec![' ', c]
                } else {
                    vec![c]
                }
            })
            .collect::<String>()
            .to_lowercase();

        assert_eq!(
            code_at(&secret, 59).unwrap(),
            code_at(&spaced, 59).unwrap()
        );
    }

    #[test]
    fn test_provisioning_uri_encodes_account() {
        let uri = provisioning_uri("JBSWY3DPEHPK3PXP", "ops admin@example.com");

        assert!(uri.starts_with("otpauth://totp/Reviora:ops%20admin%40example.com"));
        assert!(uri.contains("algorithm=SHA1"));
        assert!(uri.contains("digits=6"));
        assert!(uri.contains("period=30"));
    }
}
