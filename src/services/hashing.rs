use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};

// 64 MiB memory cost, 4 lanes, 32-byte tag for both credential classes.
// PINs get a higher time cost: the search space is only 10^6.
const MEMORY_KIB: u32 = 64 * 1024;
const PARALLELISM: u32 = 4;
const OUTPUT_LEN: usize = 32;
const PASSWORD_TIME_COST: u32 = 3;
const PIN_TIME_COST: u32 = 5;

fn password_kdf() -> Argon2<'static> {
    let params = Params::new(MEMORY_KIB, PASSWORD_TIME_COST, PARALLELISM, Some(OUTPUT_LEN)).unwrap();
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

fn pin_kdf() -> Argon2<'static> {
    let params = Params::new(MEMORY_KIB, PIN_TIME_COST, PARALLELISM, Some(OUTPUT_LEN)).unwrap();
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = password_kdf().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn hash_pin(pin: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = pin_kdf().hash_password(pin.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Any verification failure, including a malformed stored hash, is `false`.
pub fn verify_secret(secret: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    // Cost parameters come from the stored hash string, so one verifier
    // covers passwords and PINs alike.
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

/// Six decimal digits, uniform over [100000, 999999].
pub fn generate_pin() -> String {
    let pin: u32 = rand::rng().random_range(100_000..=999_999);
    pin.to_string()
}

/// 32 random bytes, hex encoded. Used for refresh tokens and for the opaque
/// verify/reset tokens stored on the principal row.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Server-side identity of a refresh token.
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
