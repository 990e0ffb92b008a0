use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::model::TenantConfig;
use super::store::{TenantStore, TenantStoreError};

/// Subdomains that can never be claimed by a tenant.
pub const RESERVED_SUBDOMAINS: [&str; 8] = [
    "www", "demo", "api", "admin", "mail", "ftp", "localhost", "marketing",
];

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 63;

static SUBDOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").unwrap());

/// Lowercases, transliterates Danish letters and strips other diacritics,
/// then folds everything outside `[a-z0-9]` into hyphens:
/// "Brønshøj Padel Klub" -> "broenshoej-padel-klub".
pub fn name_to_subdomain(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        match c {
            'a'..='z' | '0'..='9' => out.push(c),
            'æ' => out.push_str("ae"),
            'ø' => out.push_str("oe"),
            'å' => out.push_str("aa"),
            'à' | 'á' | 'â' | 'ã' | 'ä' => out.push('a'),
            'è' | 'é' | 'ê' | 'ë' => out.push('e'),
            'ì' | 'í' | 'î' | 'ï' => out.push('i'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => out.push('o'),
            'ù' | 'ú' | 'û' | 'ü' => out.push('u'),
            'ý' | 'ÿ' => out.push('y'),
            'ñ' => out.push('n'),
            'ç' => out.push('c'),
            'ß' => out.push_str("ss"),
            _ => out.push('-'),
        }
    }

    // Collapse hyphen runs and trim the edges.
    let mut collapsed = String::with_capacity(out.len());
    let mut last_was_hyphen = true;
    for c in out.chars() {
        if c == '-' {
            if !last_was_hyphen {
                collapsed.push('-');
            }
            last_was_hyphen = true;
        } else {
            collapsed.push(c);
            last_was_hyphen = false;
        }
    }
    collapsed.trim_end_matches('-').to_string()
}

pub fn validate_subdomain(subdomain: &str) -> Result<(), String> {
    if subdomain.is_empty() {
        return Err("Subdomain cannot be empty".to_string());
    }
    if subdomain.len() < MIN_LEN {
        return Err(format!("Subdomain must be at least {MIN_LEN} characters"));
    }
    if subdomain.len() > MAX_LEN {
        return Err(format!("Subdomain must be at most {MAX_LEN} characters"));
    }
    if !SUBDOMAIN_RE.is_match(subdomain) {
        return Err(
            "Subdomain may only contain lowercase letters, digits and hyphens, and cannot start or end with a hyphen"
                .to_string(),
        );
    }
    if RESERVED_SUBDOMAINS.contains(&subdomain) {
        return Err(format!("\"{subdomain}\" is a reserved subdomain"));
    }
    Ok(())
}

/// Tenant provisioning and lookup on top of the external object store.
#[derive(Clone)]
pub struct TenantRegistry {
    store: Arc<dyn TenantStore>,
}

impl TenantRegistry {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self { store }
    }

    /// A subdomain conflicts if any stored config claims it, either as its
    /// key or in its `subdomain` field.
    pub async fn is_available(&self, subdomain: &str) -> Result<bool, TenantStoreError> {
        if self.store.get(subdomain).await?.is_some() {
            return Ok(false);
        }
        let taken = self
            .store
            .list()
            .await?
            .iter()
            .any(|cfg| cfg.id == subdomain || cfg.subdomain == subdomain);
        Ok(!taken)
    }

    pub async fn create(&self, config: &TenantConfig) -> Result<(), TenantStoreError> {
        self.store.put(config).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<TenantConfig>, TenantStoreError> {
        self.store.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<TenantConfig>, TenantStoreError> {
        self.store.list().await
    }
}
