use std::sync::LazyLock;

use axum::{Extension, Json};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::auth::{jwt, middleware::AuthUser, password};
use crate::config::Config;
use crate::db::accounts::{Account, AccountStore};
use crate::error::AppError;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("valid username regex"));

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

impl From<&Account> for UserResponse {
    fn from(a: &Account) -> Self {
        UserResponse {
            id: a.id,
            username: a.username.clone(),
            display_name: a
                .display_name
                .clone()
                .unwrap_or_else(|| a.username.clone()),
            email: a.email.clone(),
            created_at: a.created_at.to_rfc3339(),
        }
    }
}

fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    if req.username.len() < 3 {
        return Err(AppError::BadRequest(
            "Username must be at least 3 characters".into(),
        ));
    }
    if req.username.len() > 20 {
        return Err(AppError::BadRequest(
            "Username must be at most 20 characters".into(),
        ));
    }
    if !USERNAME_RE.is_match(&req.username) {
        return Err(AppError::BadRequest(
            "Username can only contain letters, numbers, and underscores".into(),
        ));
    }
    if !req.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".into()));
    }
    if req.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

fn issue_token(account: &Account, config: &Config) -> Result<String, AppError> {
    jwt::create_token(account.id, &config.jwt_secret, config.jwt_expire_hours)
        .map_err(|e| AppError::Internal(format!("Token creation error: {e}")))
}

pub async fn register(
    Extension(store): Extension<AccountStore>,
    Extension(config): Extension<Config>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    validate_registration(&req)?;

    let hash = password::hash_password(&req.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {e}")))?;

    let account = store.create_account(&req.username, &req.email, &hash)?;
    tracing::info!(user_id = account.id, username = %account.username, "Account registered");

    Ok(Json(AuthResponse {
        token: issue_token(&account, &config)?,
        user: UserResponse::from(&account),
    }))
}

pub async fn login(
    Extension(store): Extension<AccountStore>,
    Extension(config): Extension<Config>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let account = store
        .get_account_by_email(&req.email)
        .ok_or(AppError::BadRequest("Invalid email or password".into()))?;

    let valid = password::verify_password(&req.password, &account.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verify error: {e}")))?;

    if !valid {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    Ok(Json(AuthResponse {
        token: issue_token(&account, &config)?,
        user: UserResponse::from(&account),
    }))
}

pub async fn me(AuthUser(account): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(&account))
}
