//! Tag resource handlers.

use actix_web::{HttpResponse, web};

use quill_core::domain::{EntityGraph, Tag, TagRecord, ValidationContext};
use quill_core::error::DomainError;
use quill_shared::dto::{CreateTagRequest, TagResponse, UpdateTagRequest};
use quill_shared::iri::{POSTS, iri};

use super::{load_post, load_tag, referenced_posts};
use crate::middleware::error::AppResult;
use crate::state::AppState;

async fn render(state: &AppState, record: &TagRecord) -> AppResult<TagResponse> {
    let id = record.id.unwrap_or_default();
    let posts = state.posts.find_by_tag(id).await?;
    Ok(TagResponse {
        id,
        label: record.label.clone(),
        posts: posts.iter().filter_map(|p| p.id).map(|p| iri(POSTS, p)).collect(),
    })
}

#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "Tag",
    responses((status = 200, description = "Tag collection", body = [TagResponse]))
)]
pub async fn list(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let tags = state.tags.find_all().await?;
    let posts = state.posts.find_all().await?;
    let body: Vec<TagResponse> = tags
        .into_iter()
        .map(|tag| {
            let id = tag.id.unwrap_or_default();
            TagResponse {
                id,
                label: tag.label,
                posts: posts
                    .iter()
                    .filter(|p| p.tag_ids.contains(&id))
                    .filter_map(|p| p.id)
                    .map(|p| iri(POSTS, p))
                    .collect(),
            }
        })
        .collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    post,
    path = "/api/tags",
    tag = "Tag",
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "Tag created", body = TagResponse),
        (status = 422, description = "Constraint violations or unknown references", body = quill_shared::ErrorResponse)
    )
)]
pub async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreateTagRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let mut graph = EntityGraph::new();
    let key = graph.insert_tag(Tag::new(req.label));
    let posts = referenced_posts(&state, &mut graph, "posts", &req.posts).await?;
    graph.set_posts_of_tag(key, &posts);

    state
        .unit_of_work()
        .flush(&mut graph, &ValidationContext::now())
        .await?;

    let record = graph.tag_record(key);
    tracing::info!(tag_id = ?record.id, "Tag created");
    Ok(HttpResponse::Created().json(render(&state, &record).await?))
}

#[utoipa::path(
    get,
    path = "/api/tags/{id}",
    tag = "Tag",
    params(("id" = i32, Path, description = "Tag id")),
    responses(
        (status = 200, description = "Tag", body = TagResponse),
        (status = 404, description = "Unknown tag", body = quill_shared::ErrorResponse)
    )
)]
pub async fn get(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let record = state
        .tags
        .find_by_id(id)
        .await?
        .ok_or(DomainError::NotFound { entity_type: "Tag", id })?;
    Ok(HttpResponse::Ok().json(render(&state, &record).await?))
}

#[utoipa::path(
    patch,
    path = "/api/tags/{id}",
    tag = "Tag",
    params(("id" = i32, Path, description = "Tag id")),
    request_body = UpdateTagRequest,
    responses(
        (status = 200, description = "Tag updated", body = TagResponse),
        (status = 404, description = "Unknown tag", body = quill_shared::ErrorResponse),
        (status = 422, description = "Constraint violations or unknown references", body = quill_shared::ErrorResponse)
    )
)]
pub async fn update(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<UpdateTagRequest>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let req = body.into_inner();

    let mut graph = EntityGraph::new();
    let key = load_tag(&state, &mut graph, id)
        .await?
        .ok_or(DomainError::NotFound { entity_type: "Tag", id })?;

    if let Some(label) = req.label {
        graph.tag_mut(key).label = label;
    }
    if let Some(refs) = &req.posts {
        // Current posts must be in the graph for their links to be dropped.
        for post in state.posts.find_by_tag(id).await? {
            if let Some(post_id) = post.id {
                load_post(&state, &mut graph, post_id).await?;
            }
        }
        let posts = referenced_posts(&state, &mut graph, "posts", refs).await?;
        graph.set_posts_of_tag(key, &posts);
    }

    state
        .unit_of_work()
        .flush(&mut graph, &ValidationContext::now())
        .await?;

    let record = graph.tag_record(key);
    Ok(HttpResponse::Ok().json(render(&state, &record).await?))
}

#[utoipa::path(
    delete,
    path = "/api/tags/{id}",
    tag = "Tag",
    params(("id" = i32, Path, description = "Tag id")),
    responses(
        (status = 204, description = "Tag deleted"),
        (status = 404, description = "Unknown tag", body = quill_shared::ErrorResponse)
    )
)]
pub async fn delete(state: web::Data<AppState>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    state.tags.delete(id).await?;
    tracing::info!(tag_id = id, "Tag deleted");
    Ok(HttpResponse::NoContent().finish())
}
