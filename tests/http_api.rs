//! Rotas HTTP exercitadas com `oneshot`, sem abrir socket.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{extract_code, spawn_app};
use ecoleta_backend::build_router;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, header::HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", token).parse().unwrap(),
    );
    request
}

fn register_body() -> Value {
    json!({
        "name": "Ana",
        "email": "ana@x.com",
        "password": "Secret1!",
        "phone": "11999999999",
        "taxId": "12345678901"
    })
}

async fn register_and_login(app: &Router) -> String {
    let (status, _, _) = send(app, post_json("/api/auth/register", register_body())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = send(
        app,
        post_json(
            "/api/auth/login",
            json!({ "email": "ana@x.com", "password": "Secret1!" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check_responds() {
    let app = build_router(spawn_app().state);
    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_returns_user_id_and_rejects_duplicates() {
    let app = build_router(spawn_app().state);

    let (status, _, body) = send(&app, post_json("/api/auth/register", register_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["userId"].is_string());

    let (status, _, body) = send(&app, post_json("/api/auth/register", register_body())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn invalid_registration_reports_fields() {
    let app = build_router(spawn_app().state);
    let mut body = register_body();
    body["taxId"] = json!("123");

    let (status, _, body) = send(&app, post_json("/api/auth/register", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["tax_id"].is_array(), "{}", body);
}

#[tokio::test]
async fn login_sets_http_only_session_cookie() {
    let app = build_router(spawn_app().state);
    send(&app, post_json("/api/auth/register", register_body())).await;

    let (status, headers, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            json!({ "email": "ana@x.com", "password": "Secret1!" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "ana@x.com");
    assert!(body["user"].get("passwordHash").is_none());

    let cookie = headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cookie.starts_with("ecoleta_session="), "{}", cookie);
    assert!(cookie.contains("HttpOnly"), "{}", cookie);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = build_router(spawn_app().state);
    send(&app, post_json("/api/auth/register", register_body())).await;

    let (status, _, _) = send(
        &app,
        post_json(
            "/api/auth/login",
            json!({ "email": "ana@x.com", "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = build_router(spawn_app().state);

    let (status, _, _) = send(&app, Request::get("/api/users/me").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(
        &app,
        Request::get("/api/collections").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_accepts_bearer_and_cookie() {
    let app = build_router(spawn_app().state);
    let token = register_and_login(&app).await;

    let request = with_bearer(Request::get("/api/users/me").body(Body::empty()).unwrap(), &token);
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ana");

    let request = Request::get("/api/users/me")
        .header(header::COOKIE, format!("ecoleta_session={}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = build_router(spawn_app().state);
    let token = register_and_login(&app).await;

    let (status, _, _) = send(&app, with_bearer(post_json("/api/auth/logout", json!({})), &token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let request = with_bearer(Request::get("/api/users/me").body(Body::empty()).unwrap(), &token);
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Sem token também responde 204
    let (status, _, _) = send(&app, post_json("/api/auth/logout", json!({}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn profile_update_with_mismatched_email_is_unauthorized() {
    let app = build_router(spawn_app().state);
    let token = register_and_login(&app).await;

    let request = Request::put("/api/users/me/profile")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(
            json!({ "phone": "21988887777", "taxId": "10987654321", "email": "bob@x.com" })
                .to_string(),
        ))
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = with_bearer(Request::get("/api/users/me").body(Body::empty()).unwrap(), &token);
    let (_, _, body) = send(&app, request).await;
    assert_eq!(body["phone"], "11999999999");
    assert_eq!(body["taxId"], "12345678901");
}

#[tokio::test]
async fn forgot_password_is_always_accepted() {
    let test_app = spawn_app();
    let app = build_router(test_app.state.clone());
    send(&app, post_json("/api/auth/register", register_body())).await;

    let (status, _, _) = send(
        &app,
        post_json("/api/auth/forgot-password", json!({ "email": "ninguem@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _, _) = send(
        &app,
        post_json("/api/auth/forgot-password", json!({ "email": "ana@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let code = extract_code(&test_app.inbox.next().await.html);
    let (status, _, _) = send(
        &app,
        post_json(
            "/api/auth/reset-password",
            json!({ "email": "ana@x.com", "code": code, "newPassword": "NovaSenha9" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(
        &app,
        post_json(
            "/api/auth/reset-password",
            json!({ "email": "ana@x.com", "code": code, "newPassword": "OutraSenha9" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn collection_flow_over_http() {
    let app = build_router(spawn_app().state);
    let token = register_and_login(&app).await;

    let (status, _, company) = send(
        &app,
        post_json(
            "/api/companies",
            json!({
                "name": "Recicla Tech",
                "email": "contato@reciclatech.com.br",
                "password": "Senha123!",
                "registrationNumber": "12.345.678/0001-90"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let company_id = company["id"].as_str().unwrap().to_string();

    let create = with_bearer(
        post_json(
            "/api/collections",
            json!({
                "scheduledDate": "2030-02-01",
                "finalDestination": "reciclagem",
                "address": {
                    "street": "Av. Paulista",
                    "number": "1000",
                    "neighborhood": "Bela Vista",
                    "city": "São Paulo",
                    "state": "SP",
                    "postalCode": "01310-100"
                },
                "items": [{ "description": "Notebook" }]
            }),
        ),
        &token,
    );
    let (status, _, detail) = send(&app, create).await;
    assert_eq!(status, StatusCode::CREATED, "{}", detail);
    assert_eq!(detail["status"], "requested");
    let id = detail["id"].as_str().unwrap().to_string();

    let assign = with_bearer(
        post_json(
            &format!("/api/collections/{}/assign", id),
            json!({ "companyId": company_id }),
        ),
        &token,
    );
    let (status, _, body) = send(&app, assign).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "scheduled");

    let skip = with_bearer(
        post_json(
            &format!("/api/collections/{}/status", id),
            json!({ "status": "completed" }),
        ),
        &token,
    );
    let (status, _, _) = send(&app, skip).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let missing_company = with_bearer(
        post_json(
            &format!("/api/collections/{}/assign", id),
            json!({ "companyId": uuid::Uuid::new_v4() }),
        ),
        &token,
    );
    let (status, _, _) = send(&app, missing_company).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let list = with_bearer(Request::get("/api/collections").body(Body::empty()).unwrap(), &token);
    let (status, _, body) = send(&app, list).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = build_router(spawn_app().state);
    let (status, _, body) = send(
        &app,
        Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/auth/login"].is_object());
}
