//! Registration token generation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};

/// Registration token prefix.
pub const TOKEN_PREFIX: &str = "reg_";

/// Number of random bytes in a token (160 bits of entropy).
const TOKEN_RANDOM_BYTES: usize = 20;

/// Generate a new single-use registration token.
///
/// Tokens are drawn from the operating system CSPRNG. They act as bearer
/// secrets during activation, so a general-purpose PRNG is not acceptable
/// here.
pub fn generate_registration_token() -> String {
    let mut bytes = [0u8; TOKEN_RANDOM_BYTES];
    OsRng.fill_bytes(&mut bytes);
    format!("{}{}", TOKEN_PREFIX, URL_SAFE_NO_PAD.encode(bytes))
}
