use totp_rs::{Algorithm, Secret, TOTP};

use crate::services::hashing;

const ISSUER: &str = "Courtpass";
const DIGITS: usize = 6;
const SKEW: u8 = 1;
const STEP: u64 = 30;
const BACKUP_CODE_COUNT: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum TotpError {
    #[error("invalid TOTP secret: {0}")]
    Secret(String),
    #[error("QR rendering failed: {0}")]
    Qr(String),
}

/// Fresh random secret, base32-encoded for manual entry.
pub fn generate_secret() -> Result<String, TotpError> {
    let secret = Secret::generate_secret();
    let bytes = secret.to_bytes().map_err(|e| TotpError::Secret(format!("{e:?}")))?;
    Ok(build(bytes, "setup")?.get_secret_base32())
}

fn build(secret_bytes: Vec<u8>, account: &str) -> Result<TOTP, TotpError> {
    TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        SKEW,
        STEP,
        secret_bytes,
        Some(ISSUER.to_string()),
        account.to_string(),
    )
    .map_err(|e| TotpError::Secret(e.to_string()))
}

fn from_base32(secret_base32: &str, account: &str) -> Result<TOTP, TotpError> {
    let bytes = Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .map_err(|e| TotpError::Secret(format!("{e:?}")))?;
    build(bytes, account)
}

/// Checks a 6-digit code against the stored secret within the step window.
/// Malformed secrets and clock errors verify as `false`.
pub fn verify_code(secret_base32: &str, code: &str) -> bool {
    let Ok(totp) = from_base32(secret_base32, "verify") else {
        return false;
    };
    totp.check_current(code).unwrap_or(false)
}

/// Renders the otpauth URI as a PNG data URI for the enrolment QR code.
pub fn qr_code_data_uri(secret_base32: &str, account: &str) -> Result<String, TotpError> {
    let totp = from_base32(secret_base32, account)?;
    let qr = totp.get_qr_base64().map_err(TotpError::Qr)?;
    Ok(format!("data:image/png;base64,{qr}"))
}

/// Ten single-use substitutes for a TOTP code, returned in plaintext exactly
/// once; only their hashes are persisted.
pub fn generate_backup_codes() -> Vec<String> {
    (0..BACKUP_CODE_COUNT)
        .map(|_| hashing::generate_token()[..8].to_string())
        .collect()
}

pub fn hash_backup_codes(codes: &[String]) -> Result<Vec<String>, argon2::password_hash::Error> {
    codes.iter().map(|c| hashing::hash_password(c)).collect()
}
