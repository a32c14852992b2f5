use serde::{Deserialize, Serialize};

use warden_auth::{IssuedToken, PolicyRule};
use warden_infra::UserRecord;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub header_img: String,
    /// Active role; defaults to the first of `authority_ids`.
    pub authority_id: Option<String>,
    #[serde(default)]
    pub authority_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub nick_name: Option<String>,
    pub header_img: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAuthorityRequest {
    pub authority_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAuthoritiesRequest {
    pub authority_ids: Vec<String>,
}

/// One rule in a `PUT /policy/:role` body; the role comes from the path.
#[derive(Debug, Deserialize)]
pub struct RuleRequest {
    pub path: String,
    pub method: String,
}

#[derive(Debug, Deserialize)]
pub struct PolicyUpdateRequest {
    pub rules: Vec<RuleRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub role: String,
    pub path: String,
    pub method: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserRecord,
    pub token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

impl LoginResponse {
    pub fn new(user: UserRecord, issued: IssuedToken) -> Self {
        let expires_at = issued.expires_at();
        Self {
            user,
            token: issued.token,
            expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub list: Vec<UserRecord>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
pub struct RoleRules {
    pub role: String,
    pub version: u64,
    pub rules: Vec<PolicyRule>,
}
