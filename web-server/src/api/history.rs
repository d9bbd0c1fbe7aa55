// web-server/src/api/history.rs
use actix_web::{get, web, HttpResponse};
use forum_common::{with_timeout, ServiceError};

use super::forums::find_forum;
use crate::middleware::AuthenticatedPrincipal;
use crate::state::AppState;

/// Forum history as seen by the caller: every public message plus the
/// private ones the caller sent or received, oldest first.
#[get("/history/forum/{id}")]
pub async fn forum_history(
    state: web::Data<AppState>,
    caller: AuthenticatedPrincipal,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let forum = find_forum(&state, path.into_inner()).await?;
    let caller_id = caller.0.id();

    let visible: Vec<_> = with_timeout(state.store_timeout, state.messages.history(forum.id))
        .await?
        .into_iter()
        .filter(|m| !m.is_private() || m.involves(caller_id))
        .collect();

    tracing::debug!("{} messages of forum {} visible to {}", visible.len(), forum.id, caller.0.identity_handle());
    Ok(HttpResponse::Ok().json(visible))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::TestHarness;
    use actix_web::{http::StatusCode, test};
    use forum_common::models::ChatMessage;

    #[actix_web::test]
    async fn private_messages_are_visible_only_to_their_parties() {
        let harness = TestHarness::new();
        let alice = harness.register("alice", "a@x.com", "pw1").await;
        let bob = harness.register("bob", "b@x.com", "pw2").await;
        let carol = harness.register("carol", "c@x.com", "pw3").await;
        let forum = harness.forum("general", &alice).await;
        harness.public_message(&carol, forum.id, "hello").await;
        harness.private_message(&alice, forum.id, "b@x.com", "psst").await;
        let app = test::init_service(harness.app()).await;
        let uri = format!("/api/history/forum/{}", forum.id);

        for (who, expected) in [(&alice, 2), (&bob, 2), (&carol, 1)] {
            let req = test::TestRequest::get().uri(&uri).insert_header(harness.bearer(who)).to_request();
            let history: Vec<ChatMessage> = test::call_and_read_body_json(&app, req).await;
            assert_eq!(history.len(), expected, "history seen by {}", who.identity_handle());
            assert_eq!(history[0].content(), "hello");
        }
    }

    #[actix_web::test]
    async fn history_requires_authentication() {
        let harness = TestHarness::new();
        let alice = harness.register("alice", "a@x.com", "pw1").await;
        let forum = harness.forum("general", &alice).await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/history/forum/{}", forum.id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let unknown = test::TestRequest::get()
            .uri("/api/history/forum/99")
            .insert_header(harness.bearer(&alice))
            .to_request();
        assert_eq!(test::call_service(&app, unknown).await.status(), StatusCode::NOT_FOUND);
    }
}
