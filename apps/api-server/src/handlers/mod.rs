//! HTTP handlers and route configuration.

pub(crate) mod auth;
pub(crate) mod health;
pub(crate) mod posts;
pub(crate) mod tags;
pub(crate) mod users;

use actix_web::web;

use quill_core::domain::{EntityGraph, PostKey, TagKey, UserKey};
use quill_shared::ResourceRef;
use quill_shared::iri::{self, TAGS, USERS};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Auth routes
            .service(
                web::scope("/auth")
                    .route("/login", web::post().to(auth::login))
                    .route("/me", web::get().to(auth::me)),
            )
            .service(
                web::scope("/users")
                    .route("", web::get().to(users::list))
                    .route("", web::post().to(users::create))
                    .route("/{id}", web::get().to(users::get))
                    .route("/{id}", web::patch().to(users::update))
                    .route("/{id}", web::delete().to(users::delete)),
            )
            .service(
                web::scope("/posts")
                    .route("", web::get().to(posts::list))
                    .route("", web::post().to(posts::create))
                    .route("/{id}", web::get().to(posts::get))
                    .route("/{id}", web::patch().to(posts::update))
                    .route("/{id}", web::delete().to(posts::delete)),
            )
            .service(
                web::scope("/tags")
                    .route("", web::get().to(tags::list))
                    .route("", web::post().to(tags::create))
                    .route("/{id}", web::get().to(tags::get))
                    .route("/{id}", web::patch().to(tags::update))
                    .route("/{id}", web::delete().to(tags::delete)),
            ),
    );
}

// --- loading stored entities into a request's graph ---

pub(crate) async fn load_user(
    state: &AppState,
    graph: &mut EntityGraph,
    id: i32,
) -> AppResult<Option<UserKey>> {
    if let Some(key) = graph.find_user(id) {
        return Ok(Some(key));
    }
    Ok(state
        .users
        .find_by_id(id)
        .await?
        .map(|record| graph.attach_user(record)))
}

pub(crate) async fn load_tag(
    state: &AppState,
    graph: &mut EntityGraph,
    id: i32,
) -> AppResult<Option<TagKey>> {
    if let Some(key) = graph.find_tag(id) {
        return Ok(Some(key));
    }
    Ok(state
        .tags
        .find_by_id(id)
        .await?
        .map(|record| graph.attach_tag(record)))
}

/// Load a post together with its author and tags.
pub(crate) async fn load_post(
    state: &AppState,
    graph: &mut EntityGraph,
    id: i32,
) -> AppResult<Option<PostKey>> {
    if let Some(key) = graph.find_post(id) {
        return Ok(Some(key));
    }
    let Some(record) = state.posts.find_by_id(id).await? else {
        return Ok(None);
    };

    if load_user(state, graph, record.author_id).await?.is_none() {
        return Err(AppError::Internal(format!(
            "author {} of post {id} is missing",
            record.author_id
        )));
    }
    for tag in state.tags.find_many(&record.tag_ids).await? {
        graph.attach_tag(tag);
    }
    Ok(Some(graph.attach_post(record)?))
}

// --- request body references ---

fn reference_id(path: &str, reference: &ResourceRef, collection: &str) -> AppResult<i32> {
    reference
        .id_in(collection)
        .map_err(|message| AppError::violation(path, message))
}

fn missing_item(path: &str, collection: &str, id: i32) -> AppError {
    AppError::violation(
        path,
        format!("Item not found for \"{}\".", iri::iri(collection, id)),
    )
}

pub(crate) async fn referenced_user(
    state: &AppState,
    graph: &mut EntityGraph,
    path: &str,
    reference: &ResourceRef,
) -> AppResult<UserKey> {
    let id = reference_id(path, reference, USERS)?;
    load_user(state, graph, id)
        .await?
        .ok_or_else(|| missing_item(path, USERS, id))
}

pub(crate) async fn referenced_tags(
    state: &AppState,
    graph: &mut EntityGraph,
    path: &str,
    references: &[ResourceRef],
) -> AppResult<Vec<TagKey>> {
    let mut keys = Vec::with_capacity(references.len());
    for reference in references {
        let id = reference_id(path, reference, TAGS)?;
        let key = load_tag(state, graph, id)
            .await?
            .ok_or_else(|| missing_item(path, TAGS, id))?;
        keys.push(key);
    }
    Ok(keys)
}

pub(crate) async fn referenced_posts(
    state: &AppState,
    graph: &mut EntityGraph,
    path: &str,
    references: &[ResourceRef],
) -> AppResult<Vec<PostKey>> {
    let mut keys = Vec::with_capacity(references.len());
    for reference in references {
        let id = reference_id(path, reference, iri::POSTS)?;
        let key = load_post(state, graph, id)
            .await?
            .ok_or_else(|| missing_item(path, iri::POSTS, id))?;
        keys.push(key);
    }
    Ok(keys)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use actix_web::http::header;
    use actix_web::test::TestRequest;
    use serde_json::Value;

    use quill_infra::{Argon2PasswordService, JwtConfig, JwtTokenService};

    use crate::state::AppState;

    /// In-memory state with cheap password hashing.
    pub fn state() -> AppState {
        let passwords = Argon2PasswordService::with_params(1024, 1, 1).unwrap();
        let tokens = JwtTokenService::new(JwtConfig::default());
        AppState::in_memory(Arc::new(passwords), Arc::new(tokens))
    }

    macro_rules! init_app {
        ($state:expr) => {
            actix_web::test::init_service(
                actix_web::App::new()
                    .app_data(actix_web::web::Data::new($state))
                    .app_data(
                        actix_web::web::JsonConfig::default()
                            .error_handler(crate::middleware::error::json_error_handler),
                    )
                    .configure(crate::handlers::configure_routes),
            )
            .await
        };
    }
    pub(crate) use init_app;

    pub fn post_json(uri: &str, body: Value) -> TestRequest {
        TestRequest::post().uri(uri).set_json(body)
    }

    pub fn patch_json(uri: &str, body: Value) -> TestRequest {
        TestRequest::patch().uri(uri).set_json(body)
    }

    pub fn bearer(token: &str) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {token}"))
    }
}
