// web-server/src/api/auth.rs
use actix_web::{post, web, HttpResponse};
use forum_common::models::{NewUserAccount, Principal, Role};
use forum_common::password::{hash_password, verify_decoy, verify_password};
use forum_common::{with_timeout, LoginRequest, LoginResponse, RegisterRequest, ServiceError};
use serde_json::json;

use crate::state::AppState;

#[post("/auth/login")]
pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> Result<HttpResponse, ServiceError> {
    let LoginRequest { email, password } = body.into_inner();
    let email = email.trim().to_string();

    let account = with_timeout(state.store_timeout, state.credentials.find_by_email(&email)).await?;

    // unknown accounts cost the same hashing work as a wrong password
    let stored_hash = account.as_ref().map(|account| account.password_hash.clone());
    let matches = web::block(move || match stored_hash {
        Some(hash) => verify_password(&password, &hash),
        None => verify_decoy(&password),
    })
    .await
    .map_err(|e| ServiceError::Storage(e.to_string()))?;

    let account = match account {
        Some(account) if matches => account,
        Some(_) => {
            tracing::warn!("Login failed for {}: wrong password", email);
            return Err(ServiceError::InvalidCredentials);
        }
        None => {
            tracing::warn!("Login failed for unknown account {}", email);
            return Err(ServiceError::InvalidCredentials);
        }
    };

    let principal = Principal::from(&account);
    let token = state.codec.issue(&principal).map_err(|e| {
        tracing::error!("Failed to issue token for {}: {}", email, e);
        ServiceError::Storage(e.to_string())
    })?;

    tracing::info!("User {} logged in", account.email);
    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        username: account.username,
        email: account.email,
    }))
}

#[post("/auth/register")]
pub async fn register(state: web::Data<AppState>, body: web::Json<RegisterRequest>) -> Result<HttpResponse, ServiceError> {
    let RegisterRequest {
        username,
        email,
        password,
    } = body.into_inner();
    let (username, email) = (username.trim().to_string(), email.trim().to_string());

    if username.is_empty() {
        return Err(ServiceError::invalid("username must not be blank"));
    }
    if !email.contains('@') {
        return Err(ServiceError::invalid("email is not valid"));
    }
    if password.is_empty() {
        return Err(ServiceError::invalid("password must not be blank"));
    }

    let password_hash = web::block(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Storage(e.to_string()))?
        .map_err(|e| ServiceError::Storage(e.to_string()))?;

    // self-registration never grants more than USER
    let account = with_timeout(
        state.store_timeout,
        state.credentials.insert(NewUserAccount {
            username,
            email,
            password_hash,
            roles: [Role::User].into_iter().collect(),
        }),
    )
    .await?;

    tracing::info!("Registered user {} ({})", account.username, account.email);
    Ok(HttpResponse::Created().json(json!({
        "id": account.id,
        "username": account.username,
        "email": account.email,
    })))
}
