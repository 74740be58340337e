//! Authentication handlers.

use actix_web::{HttpResponse, web};

use quill_core::domain::User;
use quill_core::ports::{PasswordAuthenticated, UserIdentity};
use quill_shared::dto::{AuthResponse, LoginRequest, UserResponse};

use super::users::user_response;
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token issued", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = quill_shared::ErrorResponse)
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    // Find user by email
    let record = state
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let user_id = record
        .id
        .ok_or_else(|| AppError::Internal("stored user without id".to_string()))?;
    let mut user = User::from(record);

    if !user.verify_password(&req.password, state.passwords.as_ref())? {
        tracing::debug!(user_id, "Rejected login attempt");
        return Err(AppError::Unauthorized);
    }
    user.erase_credentials();

    let token = state.tokens.generate_token(
        user_id,
        &user.user_identifier(),
        UserIdentity::roles(&user),
        &user.credential_fingerprint(),
    )?;

    tracing::info!(user_id, "User logged in");
    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.expiration_seconds().max(0) as u64,
    }))
}

/// GET /api/auth/me - Protected route
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing, invalid or stale token", body = quill_shared::ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let record = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    // The password changed since the token was issued.
    if User::from(record.clone()).credential_fingerprint() != identity.credential_fingerprint {
        return Err(AppError::Unauthorized);
    }

    let posts = state.posts.find_by_author(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(user_response(&record, &posts)))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    use super::super::test_support::{bearer, init_app, patch_json, post_json, state};

    fn login(password: &str) -> test::TestRequest {
        post_json(
            "/api/auth/login",
            json!({"email": "ann@mail.test", "password": password}),
        )
    }

    #[actix_rt::test]
    async fn test_login_and_me() {
        let app = init_app!(state());
        test::call_service(
            &app,
            post_json("/api/users", json!({"email": "ann@mail.test", "password": "secret"}))
                .to_request(),
        )
        .await;

        let resp = test::call_service(&app, login("wrong").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = test::call_service(&app, login("secret").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["token_type"], "Bearer");
        let token = body["access_token"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let me: Value = test::read_body_json(resp).await;
        assert_eq!(me["email"], "ann@mail.test");
        assert_eq!(me["roles"], json!(["ROLE_USER"]));
    }

    #[actix_rt::test]
    async fn test_me_requires_token() {
        let app = init_app!(state());

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/api/auth/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(bearer("garbage"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_password_change_invalidates_token() {
        let app = init_app!(state());
        test::call_service(
            &app,
            post_json("/api/users", json!({"email": "ann@mail.test", "password": "secret"}))
                .to_request(),
        )
        .await;
        let body: Value = test::call_and_read_body_json(&app, login("secret").to_request()).await;
        let token = body["access_token"].as_str().unwrap().to_string();

        let resp = test::call_service(
            &app,
            patch_json("/api/users/1", json!({"password": "changed"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
