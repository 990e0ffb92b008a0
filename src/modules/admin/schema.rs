use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::auth::schema::ClubSnapshot;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCoachRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 2, max = 32, message = "Username must be 2-32 characters"))]
    pub username: String,
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub send_email: Option<bool>,
}

/// The plaintext PIN appears exactly once: either in the welcome email or in
/// this response, never both.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCoachResponse {
    pub success: bool,
    pub coach: ClubSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CoachListResponse {
    pub success: bool,
    pub coaches: Vec<ClubSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct CoachResponse {
    pub success: bool,
    pub coach: ClubSnapshot,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCoachRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(min = 2, max = 32, message = "Username must be 2-32 characters"))]
    pub username: Option<String>,
    #[serde(default)]
    pub pin: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoachActionRequest {
    pub action: String,
}
