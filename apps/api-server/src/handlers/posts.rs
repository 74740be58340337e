//! Post resource handlers.
//!
//! Author and tag changes go through the entity graph, so the inverse
//! collections are consistent before anything is written.

use actix_web::{HttpResponse, web};
use chrono::Utc;

use quill_core::UnitOfWork;
use quill_core::domain::{EntityGraph, Post, PostRecord, ValidationContext};
use quill_core::error::DomainError;
use quill_shared::dto::{CreatePostRequest, PostResponse, UpdatePostRequest};
use quill_shared::iri::{TAGS, USERS, iri};

use super::{load_post, referenced_tags, referenced_user};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

pub(crate) fn post_response(record: &PostRecord) -> PostResponse {
    PostResponse {
        id: record.id.unwrap_or_default(),
        title: record.title.clone(),
        text: record.text.clone(),
        created_at: record.created_at,
        scheduled_at: record.scheduled_at,
        author: Some(iri(USERS, record.author_id)),
        tags: record.tag_ids.iter().map(|&id| iri(TAGS, id)).collect(),
    }
}

#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "Post",
    responses((status = 200, description = "Post collection", body = [PostResponse]))
)]
pub async fn list(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let posts = state.posts.find_all().await?;
    let body: Vec<PostResponse> = posts.iter().map(post_response).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "Post",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 422, description = "Constraint violations or unknown references", body = quill_shared::ErrorResponse)
    )
)]
pub async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let mut graph = EntityGraph::new();
    // A missing date is reported below, together with the other violations.
    let mut post = Post::new(req.title, req.text, req.created_at.unwrap_or_else(Utc::now));
    post.scheduled_at = req.scheduled_at;
    let key = graph.insert_post(post);

    if let Some(author) = &req.author {
        let user = referenced_user(&state, &mut graph, "author", author).await?;
        graph.add_post(user, key);
    }
    let tags = referenced_tags(&state, &mut graph, "tags", &req.tags).await?;
    graph.set_tags(key, &tags);

    let ctx = ValidationContext::now();
    if req.created_at.is_none() {
        let mut violations = vec!["createdAt: This value should not be null.".to_string()];
        if let Err(DomainError::Validation(mut rest)) = UnitOfWork::validate(&graph, &ctx) {
            violations.append(&mut rest);
        }
        return Err(AppError::Validation(violations));
    }
    state.unit_of_work().flush(&mut graph, &ctx).await?;

    let record = graph.post_record(key)?;
    tracing::info!(post_id = ?record.id, author_id = record.author_id, "Post created");
    Ok(HttpResponse::Created().json(post_response(&record)))
}

#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    tag = "Post",
    params(("id" = i32, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post", body = PostResponse),
        (status = 404, description = "Unknown post", body = quill_shared::ErrorResponse)
    )
)]
pub async fn get(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let record = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or(DomainError::NotFound { entity_type: "Post", id })?;
    Ok(HttpResponse::Ok().json(post_response(&record)))
}

#[utoipa::path(
    patch,
    path = "/api/posts/{id}",
    tag = "Post",
    params(("id" = i32, Path, description = "Post id")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Post updated", body = PostResponse),
        (status = 404, description = "Unknown post", body = quill_shared::ErrorResponse),
        (status = 422, description = "Constraint violations or unknown references", body = quill_shared::ErrorResponse)
    )
)]
pub async fn update(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let req = body.into_inner();

    let mut graph = EntityGraph::new();
    let key = load_post(&state, &mut graph, id)
        .await?
        .ok_or(DomainError::NotFound { entity_type: "Post", id })?;

    if let Some(author) = &req.author {
        let user = referenced_user(&state, &mut graph, "author", author).await?;
        graph.set_author(key, Some(user));
    }
    if let Some(refs) = &req.tags {
        let tags = referenced_tags(&state, &mut graph, "tags", refs).await?;
        graph.set_tags(key, &tags);
    }

    let post = graph.post_mut(key);
    if let Some(title) = req.title {
        post.title = title;
    }
    if let Some(text) = req.text {
        post.text = text;
    }
    if let Some(created_at) = req.created_at {
        post.created_at = created_at;
    }
    if let Some(scheduled_at) = req.scheduled_at {
        post.scheduled_at = scheduled_at;
    }

    state
        .unit_of_work()
        .flush(&mut graph, &ValidationContext::now())
        .await?;

    Ok(HttpResponse::Ok().json(post_response(&graph.post_record(key)?)))
}

#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "Post",
    params(("id" = i32, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 404, description = "Unknown post", body = quill_shared::ErrorResponse)
    )
)]
pub async fn delete(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    state.posts.delete(id).await?;
    tracing::info!(post_id = id, "Post deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use chrono::{Duration, Utc};
    use serde_json::{Value, json};

    use super::super::test_support::{init_app, patch_json, post_json, state};

    macro_rules! create {
        ($app:expr, $uri:expr, $body:expr) => {{
            let resp = test::call_service(&$app, post_json($uri, $body).to_request()).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let body: Value = test::read_body_json(resp).await;
            body
        }};
    }

    #[actix_rt::test]
    async fn test_create_post_links_author_and_tags() {
        let app = init_app!(state());
        create!(app, "/api/users", json!({"email": "ann@mail.test", "password": "pw"}));
        create!(app, "/api/tags", json!({"label": "Rust"}));

        let post = create!(
            app,
            "/api/posts",
            json!({
                "title": "Hello",
                "text": "First post",
                "createdAt": Utc::now(),
                "author": "/api/users/1",
                "tags": ["/api/tags/1", 1, "1"]
            })
        );
        assert_eq!(post["author"], "/api/users/1");
        assert_eq!(post["tags"], json!(["/api/tags/1"]));
        assert!(post["scheduledAt"].is_null());

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/api/users/1").to_request()).await;
        let user: Value = test::read_body_json(resp).await;
        assert_eq!(user["posts"], json!(["/api/posts/1"]));

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/api/tags/1").to_request()).await;
        let tag: Value = test::read_body_json(resp).await;
        assert_eq!(tag["posts"], json!(["/api/posts/1"]));
    }

    #[actix_rt::test]
    async fn test_post_without_author_is_unprocessable() {
        let app = init_app!(state());

        let resp = test::call_service(
            &app,
            post_json(
                "/api/posts",
                json!({"title": "t", "text": "x", "createdAt": Utc::now()}),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["violations"], json!(["author: This value should not be null."]));
    }

    #[actix_rt::test]
    async fn test_post_without_created_at_is_unprocessable() {
        let app = init_app!(state());
        create!(app, "/api/users", json!({"email": "ann@mail.test", "password": "pw"}));

        let resp = test::call_service(
            &app,
            post_json("/api/posts", json!({"title": "t", "text": "x", "author": 1})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["violations"],
            json!(["createdAt: This value should not be null."])
        );

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/api/posts").to_request()).await;
        let posts: Value = test::read_body_json(resp).await;
        assert_eq!(posts, json!([]));
    }

    #[actix_rt::test]
    async fn test_missing_created_at_is_reported_with_other_violations() {
        let app = init_app!(state());

        let resp = test::call_service(
            &app,
            post_json("/api/posts", json!({"title": "", "text": "x"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        let violations = body["violations"].as_array().unwrap();
        assert_eq!(violations[0], "createdAt: This value should not be null.");
        assert!(violations.iter().any(|v| v.as_str().unwrap().starts_with("title")));
        assert!(violations.iter().any(|v| v.as_str().unwrap().starts_with("author")));
    }

    #[actix_rt::test]
    async fn test_unknown_author_is_unprocessable() {
        let app = init_app!(state());

        let resp = test::call_service(
            &app,
            post_json(
                "/api/posts",
                json!({"title": "t", "text": "x", "createdAt": Utc::now(), "author": "/api/users/9"}),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["violations"],
            json!(["author: Item not found for \"/api/users/9\"."])
        );
    }

    #[actix_rt::test]
    async fn test_scheduled_before_created_is_unprocessable() {
        let app = init_app!(state());
        create!(app, "/api/users", json!({"email": "ann@mail.test", "password": "pw"}));

        let created = Utc::now() + Duration::days(10);
        let scheduled = created - Duration::days(1);
        let resp = test::call_service(
            &app,
            post_json(
                "/api/posts",
                json!({
                    "title": "t",
                    "text": "x",
                    "author": 1,
                    "createdAt": created,
                    "scheduledAt": scheduled
                }),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_rt::test]
    async fn test_patch_moves_post_between_authors() {
        let app = init_app!(state());
        create!(app, "/api/users", json!({"email": "ann@mail.test", "password": "pw"}));
        create!(app, "/api/users", json!({"email": "bob@mail.test", "password": "pw"}));
        create!(app, "/api/tags", json!({"label": "Rust"}));
        create!(
            app,
            "/api/posts",
            json!({"title": "t", "text": "x", "createdAt": Utc::now(), "author": 1, "tags": [1]})
        );

        let resp = test::call_service(
            &app,
            patch_json(
                "/api/posts/1",
                json!({"author": "/api/users/2", "tags": [], "scheduledAt": null, "title": "renamed"}),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let post: Value = test::read_body_json(resp).await;
        assert_eq!(post["author"], "/api/users/2");
        assert_eq!(post["title"], "renamed");
        assert_eq!(post["tags"], json!([]));

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/api/users/1").to_request()).await;
        let ann: Value = test::read_body_json(resp).await;
        assert_eq!(ann["posts"], json!([]));

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/api/tags/1").to_request()).await;
        let tag: Value = test::read_body_json(resp).await;
        assert_eq!(tag["posts"], json!([]));
    }

    #[actix_rt::test]
    async fn test_user_with_posts_cannot_be_deleted() {
        let app = init_app!(state());
        create!(app, "/api/users", json!({"email": "ann@mail.test", "password": "pw"}));
        create!(
            app,
            "/api/posts",
            json!({"title": "t", "text": "x", "createdAt": Utc::now(), "author": 1})
        );

        let resp =
            test::call_service(&app, test::TestRequest::delete().uri("/api/users/1").to_request())
                .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp =
            test::call_service(&app, test::TestRequest::delete().uri("/api/posts/1").to_request())
                .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp =
            test::call_service(&app, test::TestRequest::delete().uri("/api/users/1").to_request())
                .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[actix_rt::test]
    async fn test_missing_post_is_not_found() {
        let app = init_app!(state());

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/api/posts/42").to_request())
                .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(&app, patch_json("/api/posts/42", json!({})).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
