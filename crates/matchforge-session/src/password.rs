//! Password hashing: PBKDF2-HMAC-SHA256.
//!
//! Credentials are stored as `<iterations>:<base64 salt>:<base64 key>`
//! with 65536 iterations, a 16-byte random salt, and a 128-bit derived
//! key. The format is self-describing, so `verify` honors whatever
//! iteration count and key length a stored credential carries.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;

/// PBKDF2 iteration count for newly derived credentials.
pub const ITERATIONS: u32 = 65_536;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 16; // 128-bit derived key

/// Derives a storable credential from a plaintext password.
pub fn hash(password: &str) -> String {
    let mut rng = rand::rng();
    let salt: [u8; SALT_LEN] = rng.random();

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, ITERATIONS, &mut key);

    format!(
        "{}:{}:{}",
        ITERATIONS,
        STANDARD.encode(salt),
        STANDARD.encode(key)
    )
}

/// Checks a plaintext password against a stored credential.
///
/// A malformed credential verifies as `false` rather than erroring —
/// to a client, a corrupt row and a wrong password look the same.
pub fn verify(password: &str, credential: &str) -> bool {
    let mut parts = credential.splitn(3, ':');
    let (Some(iterations), Some(salt), Some(key)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let Ok(salt) = STANDARD.decode(salt) else {
        return false;
    };
    let Ok(key) = STANDARD.decode(key) else {
        return false;
    };
    if key.is_empty() || iterations == 0 {
        return false;
    }

    let mut derived = vec![0u8; key.len()];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut derived);
    derived == key
}
