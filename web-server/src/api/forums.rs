// web-server/src/api/forums.rs
use actix_web::{delete, get, post, web, HttpResponse};
use forum_common::models::{Forum, NewForum, Role};
use forum_common::{with_timeout, ChatRequest, ForumRequest, ForumResponse, MessageRequest, ServiceError};

use crate::middleware::AuthenticatedPrincipal;
use crate::state::AppState;

pub(crate) async fn find_forum(state: &AppState, forum_id: i64) -> Result<Forum, ServiceError> {
    with_timeout(state.store_timeout, state.forums.find(forum_id))
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("forum {}", forum_id)))
}

#[get("/forums")]
pub async fn list_forums(state: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let forums = with_timeout(state.store_timeout, state.forums.list()).await?;
    let body: Vec<ForumResponse> = forums.iter().map(ForumResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[get("/forums/{id}")]
pub async fn get_forum(state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let forum = find_forum(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ForumResponse::from(&forum)))
}

#[post("/forums")]
pub async fn create_forum(
    state: web::Data<AppState>,
    caller: AuthenticatedPrincipal,
    body: web::Json<ForumRequest>,
) -> Result<HttpResponse, ServiceError> {
    let ForumRequest { title, description } = body.into_inner();
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(ServiceError::invalid("title must not be blank"));
    }

    let forum = with_timeout(
        state.store_timeout,
        state.forums.create(NewForum {
            title,
            description,
            creator_id: caller.0.id(),
        }),
    )
    .await?;

    tracing::info!("Forum {} '{}' created by {}", forum.id, forum.title, caller.0.identity_handle());
    Ok(HttpResponse::Created().json(ForumResponse::from(&forum)))
}

#[delete("/forums/{id}")]
pub async fn delete_forum(
    state: web::Data<AppState>,
    caller: AuthenticatedPrincipal,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let forum = find_forum(&state, path.into_inner()).await?;
    let caller = caller.0;

    if forum.creator_id != caller.id() && !caller.has_role(Role::Admin) {
        tracing::warn!("{} may not delete forum {}", caller.identity_handle(), forum.id);
        return Err(ServiceError::Forbidden);
    }

    if !with_timeout(state.store_timeout, state.forums.delete(forum.id)).await? {
        return Err(ServiceError::not_found(format!("forum {}", forum.id)));
    }

    tracing::info!("Forum {} deleted by {}", forum.id, caller.identity_handle());
    Ok(HttpResponse::NoContent().finish())
}

/// Public history: private messages are never listed here.
#[get("/forums/{id}/messages")]
pub async fn forum_messages(state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let forum = find_forum(&state, path.into_inner()).await?;
    let messages = with_timeout(state.store_timeout, state.messages.history(forum.id)).await?;

    let public: Vec<_> = messages.into_iter().filter(|m| !m.is_private()).collect();
    Ok(HttpResponse::Ok().json(public))
}

#[post("/forums/{id}/messages")]
pub async fn post_message(
    state: web::Data<AppState>,
    caller: AuthenticatedPrincipal,
    path: web::Path<i64>,
    body: web::Json<MessageRequest>,
) -> Result<HttpResponse, ServiceError> {
    let request = ChatRequest::public(path.into_inner(), body.into_inner().content);
    let message = state.router.route(&caller.0, request).await?;
    Ok(HttpResponse::Created().json(message))
}
