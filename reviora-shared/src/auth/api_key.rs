/// API key authentication utilities
///
/// Generation, hashing, and scope checks for integration API keys. Database
/// operations live in `models::api_key`; this module holds the pure pieces.
///
/// # Security
///
/// - **Format**: `rk_{32_chars}` (prefix + 32 random alphanumeric chars)
/// - **Storage**: keys are hashed with SHA-256 before storage
/// - **Validation**: constant-time comparison to prevent timing attacks
/// - **Scopes**: fine-grained permissions (e.g. "questionnaires:read")
///
/// # Example
///
/// ```
/// use reviora_shared::auth::api_key::{generate_api_key, hash_api_key, validate_api_key_format};
///
/// let (key, hash) = generate_api_key();
/// assert!(key.starts_with("rk_"));
/// assert_eq!(key.len(), 35);
///
/// assert!(validate_api_key_format(&key));
/// assert_eq!(hash, hash_api_key(&key));
/// ```
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of the random part of the API key (characters)
const KEY_RANDOM_LENGTH: usize = 32;

/// API key prefix
const KEY_PREFIX: &str = "rk_";

/// Total length of an API key (prefix + random)
pub const API_KEY_LENGTH: usize = KEY_PREFIX.len() + KEY_RANDOM_LENGTH;

/// Generates a new API key
///
/// Creates a cryptographically random key with the format `rk_{32_chars}`
/// and returns it together with the SHA-256 hash stored in the database.
///
/// # Returns
///
/// Tuple of (plaintext_key, sha256_hash)
///
/// # Example
///
/// ```
/// use reviora_shared::auth::api_key::generate_api_key;
///
/// let (key, hash) = generate_api_key();
/// assert!(key.starts_with("rk_"));
/// assert_eq!(hash.len(), 64); // SHA-256 hex is 64 chars
/// ```
pub fn generate_api_key() -> (String, String) {
    let random_part = generate_random_string(KEY_RANDOM_LENGTH);
    let key = format!("{}{}", KEY_PREFIX, random_part);
    let hash = hash_api_key(&key);

    (key, hash)
}

/// Generates a random alphanumeric string
///
/// Uses base62 (A-Z, a-z, 0-9) so keys stay URL-safe.
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    std::iter::repeat_with(|| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .take(length)
        .collect()
}

/// Hashes an API key using SHA-256
///
/// # Returns
///
/// Hex-encoded SHA-256 hash (64 characters)
pub fn hash_api_key(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

/// Validates API key format
///
/// Checks the `rk_` prefix, total length, and that the random part is
/// alphanumeric. A cheap pre-filter before touching the database.
///
/// # Example
///
/// ```
/// use reviora_shared::auth::api_key::validate_api_key_format;
///
/// assert!(validate_api_key_format("rk_abcdefghijklmnopqrstuvwxyz123456"));
/// assert!(!validate_api_key_format("sk_abcdefghijklmnopqrstuvwxyz123456"));
/// assert!(!validate_api_key_format("rk_short"));
/// ```
pub fn validate_api_key_format(key: &str) -> bool {
    if key.len() != API_KEY_LENGTH {
        return false;
    }

    if !key.starts_with(KEY_PREFIX) {
        return false;
    }

    let random_part = &key[KEY_PREFIX.len()..];
    random_part.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Validates an API key against a stored hash
///
/// Uses constant-time comparison so the match time does not leak which
/// characters differ.
pub fn verify_api_key(key: &str, stored_hash: &str) -> bool {
    let computed_hash = hash_api_key(key);
    constant_time_compare(&computed_hash, stored_hash)
}

/// Constant-time string comparison
///
/// Always compares the full length, accumulating differences with bitwise
/// OR instead of short-circuiting.
///
/// # Example
///
/// ```
/// use reviora_shared::auth::api_key::constant_time_compare;
///
/// assert!(constant_time_compare("deadbeef", "deadbeef"));
/// assert!(!constant_time_compare("deadbeef", "deadbee0"));
/// ```
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let diff = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));

    diff == 0
}

/// Parses scopes from a comma-separated string
///
/// # Example
///
/// ```
/// use reviora_shared::auth::api_key::parse_scopes;
///
/// let scopes = parse_scopes("questionnaires:read, responses:read");
/// assert_eq!(scopes, vec!["questionnaires:read", "responses:read"]);
/// ```
pub fn parse_scopes(scopes_str: &str) -> Vec<String> {
    scopes_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Checks if a scope list contains a required scope
///
/// Supports wildcard matching with `*`:
/// - `responses:*` matches `responses:read`, `responses:export`, etc.
/// - `*` matches everything
///
/// # Example
///
/// ```
/// use reviora_shared::auth::api_key::has_scope;
///
/// let scopes = vec!["questionnaires:read".to_string(), "responses:*".to_string()];
///
/// assert!(has_scope(&scopes, "questionnaires:read"));
/// assert!(has_scope(&scopes, "responses:export"));
/// assert!(!has_scope(&scopes, "questionnaires:write"));
/// ```
pub fn has_scope(scopes: &[String], required: &str) -> bool {
    for scope in scopes {
        if scope == "*" {
            return true;
        }

        if scope == required {
            return true;
        }

        // Resource wildcard, e.g. "responses:*" matches "responses:read"
        if let Some(prefix) = scope.strip_suffix(":*") {
            if required
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with(':'))
            {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_api_key() {
        let (key1, hash1) = generate_api_key();
        let (key2, hash2) = generate_api_key();

        assert!(key1.starts_with("rk_"));
        assert_eq!(key1.len(), 35);

        assert_ne!(key1, key2);
        assert_ne!(hash1, hash2);

        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_hash_api_key_is_deterministic() {
        let key = "rk_test123";
        let hash = hash_api_key(key);

        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_api_key(key));
        assert_ne!(hash, hash_api_key("rk_different"));
    }

    #[test]
    fn test_validate_api_key_format() {
        assert!(validate_api_key_format("rk_abcdefghijklmnopqrstuvwxyz123456"));
        assert!(validate_api_key_format("rk_ABCDEFGHIJKLMNOPQRSTUVWXYZ123456"));

        // Wrong prefix
        assert!(!validate_api_key_format("sk_abcdefghijklmnopqrstuvwxyz123456"));

        // Wrong length
        assert!(!validate_api_key_format("rk_short"));
        assert!(!validate_api_key_format("rk_abcdefghijklmnopqrstuvwxyz1234567890"));

        // Special characters
        assert!(!validate_api_key_format("rk_abc!@#defghijklmnopqrstuvwxyz12"));

        // No prefix at all
        assert!(!validate_api_key_format("abcdefghijklmnopqrstuvwxyz123456789"));
    }

    #[test]
    fn test_verify_api_key() {
        let (key, hash) = generate_api_key();

        assert!(verify_api_key(&key, &hash));
        assert!(!verify_api_key("rk_wrongkey1234567890123456789012", &hash));
        assert!(!verify_api_key("", &hash));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("deadbeef", "deadbeef"));
        assert!(constant_time_compare("", ""));

        assert!(!constant_time_compare("deadbeef", "deadbee0"));
        assert!(!constant_time_compare("deadbeef", "deadbeefff"));
        assert!(!constant_time_compare("a", "b"));
    }

    #[test]
    fn test_parse_scopes() {
        assert_eq!(
            parse_scopes("questionnaires:read,responses:read"),
            vec!["questionnaires:read", "responses:read"]
        );

        // Spaces and stray commas
        assert_eq!(
            parse_scopes("questionnaires:read, responses:read,,"),
            vec!["questionnaires:read", "responses:read"]
        );

        assert_eq!(parse_scopes(""), Vec::<String>::new());
    }

    #[test]
    fn test_has_scope_exact() {
        let scopes = vec![
            "questionnaires:read".to_string(),
            "responses:read".to_string(),
        ];

        assert!(has_scope(&scopes, "questionnaires:read"));
        assert!(has_scope(&scopes, "responses:read"));
        assert!(!has_scope(&scopes, "responses:export"));
        assert!(!has_scope(&scopes, "reviews:read"));
    }

    #[test]
    fn test_has_scope_resource_wildcard() {
        let scopes = vec!["responses:*".to_string()];

        assert!(has_scope(&scopes, "responses:read"));
        assert!(has_scope(&scopes, "responses:export"));
        assert!(!has_scope(&scopes, "questionnaires:read"));

        // Prefix must match the whole resource segment
        assert!(!has_scope(&scopes, "responsesextra:read"));
    }

    #[test]
    fn test_has_scope_global_wildcard() {
        let scopes = vec!["*".to_string()];

        assert!(has_scope(&scopes, "questionnaires:read"));
        assert!(has_scope(&scopes, "anything"));
    }

    #[test]
    fn test_has_scope_empty() {
        let scopes: Vec<String> = vec![];
        assert!(!has_scope(&scopes, "questionnaires:read"));
    }

    #[test]
    fn test_full_key_workflow() {
        let (plaintext, hash) = generate_api_key();

        assert!(validate_api_key_format(&plaintext));
        assert!(verify_api_key(&plaintext, &hash));

        let (other_key, _) = generate_api_key();
        assert!(!verify_api_key(&other_key, &hash));
    }
}
