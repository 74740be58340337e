//! OpenAPI document served next to the Swagger UI.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use quill_shared::ErrorResponse;
use quill_shared::ResourceRef;
use quill_shared::dto::{
    AuthResponse, CreatePostRequest, CreateTagRequest, CreateUserRequest, LoginRequest,
    PostResponse, TagResponse, UpdatePostRequest, UpdateTagRequest, UpdateUserRequest,
    UserResponse,
};

use crate::handlers::{auth, health, posts, tags, users};

#[derive(OpenApi)]
#[openapi(
    info(title = "Quill API", description = "Users, posts and tags of a blog."),
    paths(
        health::health_check,
        auth::login,
        auth::me,
        users::list,
        users::create,
        users::get,
        users::update,
        users::delete,
        posts::list,
        posts::create,
        posts::get,
        posts::update,
        posts::delete,
        tags::list,
        tags::create,
        tags::get,
        tags::update,
        tags::delete,
    ),
    components(schemas(
        health::HealthResponse,
        ErrorResponse,
        ResourceRef,
        UserResponse,
        CreateUserRequest,
        UpdateUserRequest,
        PostResponse,
        CreatePostRequest,
        UpdatePostRequest,
        TagResponse,
        CreateTagRequest,
        UpdateTagRequest,
        LoginRequest,
        AuthResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "User", description = "Accounts that author posts"),
        (name = "Post", description = "Blog posts"),
        (name = "Tag", description = "Labels attached to posts"),
        (name = "Auth", description = "Token login"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
