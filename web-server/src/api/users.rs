// web-server/src/api/users.rs
use actix_web::{delete, get, put, web, HttpResponse};
use forum_common::models::{Principal, Role, UserAccount, UserUpdate};
use forum_common::{with_timeout, ServiceError, UserResponse, UserUpdateRequest};

use crate::middleware::AuthenticatedPrincipal;
use crate::state::AppState;

async fn find_user(state: &AppState, user_id: i64) -> Result<UserAccount, ServiceError> {
    with_timeout(state.store_timeout, state.credentials.find_by_id(user_id))
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("user {}", user_id)))
}

fn owner_or_admin(caller: &Principal, account: &UserAccount) -> Result<(), ServiceError> {
    if caller.id() == account.id || caller.has_role(Role::Admin) {
        return Ok(());
    }
    tracing::warn!("{} may not modify user {}", caller.identity_handle(), account.id);
    Err(ServiceError::Forbidden)
}

/// Trimmed value, or an error when the field was given but left blank
fn present(field: &str, value: Option<String>) -> Result<Option<String>, ServiceError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Err(ServiceError::invalid(format!("{} must not be blank", field))),
        other => Ok(other),
    }
}

#[get("/users")]
pub async fn list_users(state: web::Data<AppState>, _caller: AuthenticatedPrincipal) -> Result<HttpResponse, ServiceError> {
    let accounts = with_timeout(state.store_timeout, state.credentials.list()).await?;
    let body: Vec<UserResponse> = accounts.iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[get("/users/{id}")]
pub async fn get_user(
    state: web::Data<AppState>,
    _caller: AuthenticatedPrincipal,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let account = find_user(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&account)))
}

/// Changing the email changes the identity handle; tokens issued for the
/// old one stop resolving.
#[put("/users/{id}")]
pub async fn update_user(
    state: web::Data<AppState>,
    caller: AuthenticatedPrincipal,
    path: web::Path<i64>,
    body: web::Json<UserUpdateRequest>,
) -> Result<HttpResponse, ServiceError> {
    let account = find_user(&state, path.into_inner()).await?;
    owner_or_admin(&caller.0, &account)?;

    let UserUpdateRequest { username, email } = body.into_inner();
    let changes = UserUpdate {
        username: present("username", username)?,
        email: present("email", email)?,
    };
    if changes.email.as_deref().map_or(false, |email| !email.contains('@')) {
        return Err(ServiceError::invalid("email is not valid"));
    }

    let updated = with_timeout(state.store_timeout, state.credentials.update(account.id, changes))
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("user {}", account.id)))?;

    tracing::info!("User {} updated by {}", updated.id, caller.0.identity_handle());
    Ok(HttpResponse::Ok().json(UserResponse::from(&updated)))
}

#[delete("/users/{id}")]
pub async fn delete_user(
    state: web::Data<AppState>,
    caller: AuthenticatedPrincipal,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let account = find_user(&state, path.into_inner()).await?;
    owner_or_admin(&caller.0, &account)?;

    if !with_timeout(state.store_timeout, state.credentials.delete(account.id)).await? {
        return Err(ServiceError::not_found(format!("user {}", account.id)));
    }

    tracing::info!("User {} deleted by {}", account.id, caller.0.identity_handle());
    Ok(HttpResponse::NoContent().finish())
}
