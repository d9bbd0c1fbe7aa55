// web-server/src/api/mod.rs
pub mod auth;
pub mod forums;
pub mod history;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        actix_web::web::scope("/api")
            .service(auth::login)
            .service(auth::register)
            .service(forums::list_forums)
            .service(forums::create_forum)
            .service(forums::forum_messages)
            .service(forums::post_message)
            .service(forums::get_forum)
            .service(forums::delete_forum)
            .service(history::forum_history)
            .service(users::list_users)
            .service(users::get_user)
            .service(users::update_user)
            .service(users::delete_user),
    );
}
