use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::modules::auth::model::Role;

pub const ISSUER: &str = "courtpass";
const ACCESS_TOKEN_TYPE: &str = "access";

/// Claims carried by a short-lived access token. The role is a hint only;
/// guards re-read the role from the principal row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub club_id: String,
    pub tenant_id: String,
    pub role: String,
    pub email: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_duration: Duration,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_duration: Duration::minutes(15),
        }
    }

    pub fn mint_access_token(
        &self,
        club_id: &str,
        tenant_id: &str,
        role: Role,
        email: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = AccessClaims {
            club_id: club_id.to_string(),
            tenant_id: tenant_id.to_string(),
            role: role.as_str().to_string(),
            email: email.to_string(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_token_duration).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Returns the claims iff signature, issuer, expiry and token type all
    /// hold. Never errors: a bad token is simply `None`.
    pub fn verify_access_token(&self, token: &str) -> Option<AccessClaims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);

        let data = decode::<AccessClaims>(token, &self.decoding_key, &validation).ok()?;
        if data.claims.token_type != ACCESS_TOKEN_TYPE {
            return None;
        }
        Some(data.claims)
    }

    pub fn access_token_duration_secs(&self) -> i64 {
        self.access_token_duration.num_seconds()
    }
}
