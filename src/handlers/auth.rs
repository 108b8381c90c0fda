// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::{AuthenticatedUser, SessionToken, SESSION_COOKIE},
    models::auth::{
        AuthResponse, ForgotPasswordPayload, LoginUserPayload, RegisterResponse,
        RegisterUserPayload, ResetPasswordPayload, User,
    },
};

// Handler de registro
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = RegisterResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "E-mail ou CPF já cadastrado")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = app_state.auth_service.register_user(payload).await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id })))
}

// Handler de login: devolve o token no corpo e também no cookie de sessão
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Sessão criada", body = AuthResponse),
        (status = 401, description = "E-mail ou senha inválidos")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let issued = app_state
        .auth_service
        .authenticate(&payload.email, &payload.password)
        .await?;

    let cookie = Cookie::build((SESSION_COOKIE, issued.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(app_state.config.secure_cookies);

    Ok((
        jar.add(cookie),
        Json(AuthResponse {
            token: issued.token,
            expires_at: issued.session.expires_at,
            user: issued.user,
        }),
    ))
}

// Logout: encerra a sessão (se houver) e limpa o cookie. Sempre 204.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses((status = 204, description = "Sessão encerrada")),
    security(("api_jwt" = []))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    jar: CookieJar,
    SessionToken(token): SessionToken,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = token {
        app_state.auth_service.sign_out(&token).await?;
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, StatusCode::NO_CONTENT))
}

// Sempre 202, exista a conta ou não.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordPayload,
    responses(
        (status = 202, description = "Se a conta existir, um código foi enviado"),
        (status = 400, description = "E-mail inválido")
    )
)]
pub async fn forgot_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    // Não espera a task: a resposta não pode depender de a conta existir
    app_state.auth_service.request_password_reset(&payload.email);
    Ok(StatusCode::ACCEPTED)
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordPayload,
    responses(
        (status = 204, description = "Senha redefinida"),
        (status = 400, description = "Código inválido ou expirado")
    )
)]
pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    app_state.auth_service.reset_password(payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Usuário da sessão", body = User),
        (status = 401, description = "Sessão inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(auth: AuthenticatedUser) -> Json<User> {
    Json(auth.user)
}
