//! User resource handlers.

use actix_web::{HttpResponse, web};

use quill_core::domain::{EntityGraph, PostRecord, User, UserRecord, ValidationContext, not_blank};
use quill_core::error::DomainError;
use quill_shared::dto::{CreateUserRequest, UpdateUserRequest, UserResponse};
use quill_shared::iri::{POSTS, iri};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Render a user. The password hash is never part of the body.
pub(crate) fn user_response(record: &UserRecord, posts: &[PostRecord]) -> UserResponse {
    let id = record.id.unwrap_or_default();
    UserResponse {
        id,
        email: record.email.clone(),
        roles: User::from(record.clone()).roles(),
        posts: posts
            .iter()
            .filter(|p| p.author_id == id)
            .filter_map(|p| p.id)
            .map(|post_id| iri(POSTS, post_id))
            .collect(),
    }
}

async fn render(state: &AppState, record: &UserRecord) -> AppResult<UserResponse> {
    let posts = match record.id {
        Some(id) => state.posts.find_by_author(id).await?,
        None => Vec::new(),
    };
    Ok(user_response(record, &posts))
}

/// Check the plain password, then hash it.
fn hash_password(state: &AppState, plain: &str) -> AppResult<String> {
    not_blank(plain, &()).map_err(|e| AppError::violation("password", e))?;
    Ok(state.passwords.hash(plain)?)
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "User",
    responses((status = 200, description = "User collection", body = [UserResponse]))
)]
pub async fn list(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let users = state.users.find_all().await?;
    let posts = state.posts.find_all().await?;
    let body: Vec<UserResponse> = users.iter().map(|u| user_response(u, &posts)).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "User",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 409, description = "Email already taken", body = quill_shared::ErrorResponse),
        (status = 422, description = "Constraint violations", body = quill_shared::ErrorResponse)
    )
)]
pub async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreateUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let hash = hash_password(&state, &req.password)?;

    let mut graph = EntityGraph::new();
    let key = graph.insert_user(User::new(req.email, hash).with_roles(req.roles));
    state
        .unit_of_work()
        .flush(&mut graph, &ValidationContext::now())
        .await?;

    let record = graph.user_record(key);
    tracing::info!(user_id = ?record.id, "User created");
    Ok(HttpResponse::Created().json(user_response(&record, &[])))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "User",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "Unknown user", body = quill_shared::ErrorResponse)
    )
)]
pub async fn get(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let record = state
        .users
        .find_by_id(id)
        .await?
        .ok_or(DomainError::NotFound { entity_type: "User", id })?;
    Ok(HttpResponse::Ok().json(render(&state, &record).await?))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    tag = "User",
    params(("id" = i32, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "Unknown user", body = quill_shared::ErrorResponse),
        (status = 409, description = "Email already taken", body = quill_shared::ErrorResponse),
        (status = 422, description = "Constraint violations", body = quill_shared::ErrorResponse)
    )
)]
pub async fn update(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<UpdateUserRequest>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let req = body.into_inner();

    let mut graph = EntityGraph::new();
    let key = super::load_user(&state, &mut graph, id)
        .await?
        .ok_or(DomainError::NotFound { entity_type: "User", id })?;

    if let Some(password) = req.password {
        let hash = hash_password(&state, &password)?;
        graph.user_mut(key).password = hash;
    }
    let user = graph.user_mut(key);
    if let Some(email) = req.email {
        user.email = email;
    }
    if let Some(roles) = req.roles {
        user.set_roles(roles);
    }

    state
        .unit_of_work()
        .flush(&mut graph, &ValidationContext::now())
        .await?;

    let record = graph.user_record(key);
    Ok(HttpResponse::Ok().json(render(&state, &record).await?))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "User",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "Unknown user", body = quill_shared::ErrorResponse),
        (status = 409, description = "User still owns posts", body = quill_shared::ErrorResponse)
    )
)]
pub async fn delete(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    state.users.delete(id).await?;
    tracing::info!(user_id = id, "User deleted");
    Ok(HttpResponse::NoContent().finish())
}
