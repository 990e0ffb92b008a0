use reqwest::Client;
use sha1::{Digest, Sha1};

const MIN_LEN: usize = 8;
const MAX_LEN: usize = 128;

/// Character-class rules for admin passwords. Returns every violated rule so
/// the client can render them all at once.
pub fn validate_password_strength(password: &str) -> Result<(), Vec<String>> {
    let mut problems = Vec::new();

    if password.len() < MIN_LEN {
        problems.push(format!("Password must be at least {MIN_LEN} characters"));
    }
    if password.len() > MAX_LEN {
        problems.push(format!("Password must be at most {MAX_LEN} characters"));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        problems.push("Password must contain a lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        problems.push("Password must contain an uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        problems.push("Password must contain a digit".to_string());
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        problems.push("Password must contain a special character".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

/// Exactly six decimal digits.
pub fn validate_pin_format(pin: &str) -> Result<(), String> {
    if pin.len() == 6 && pin.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err("PIN must be exactly 6 digits".to_string())
    }
}

/// k-anonymity lookup against a hash-prefix breach service. The password's
/// SHA-1 never leaves the process beyond its first five hex characters.
#[derive(Clone)]
pub struct BreachChecker {
    client: Client,
    base_url: Option<String>,
}

impl BreachChecker {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self { client, base_url }
    }

    pub fn disabled(client: Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Number of known breaches for this password, or 0 when clean. A
    /// transport or parse failure is treated as clean (fail-open) and logged.
    pub async fn breach_count(&self, password: &str) -> u64 {
        let Some(base_url) = &self.base_url else {
            return 0;
        };

        let digest = hex::encode_upper(Sha1::digest(password.as_bytes()));
        let (prefix, suffix) = digest.split_at(5);

        let url = format!("{}/range/{prefix}", base_url.trim_end_matches('/'));
        let body = match self.fetch(&url).await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "breach check unavailable, treating password as clean");
                return 0;
            }
        };

        for line in body.lines() {
            let Some((candidate, count)) = line.trim().split_once(':') else {
                continue;
            };
            if candidate.eq_ignore_ascii_case(suffix) {
                return count.trim().parse().unwrap_or(1);
            }
        }
        0
    }

    async fn fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}
