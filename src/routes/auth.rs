use crate::{
    db::users as db_users,
    error::AppError,
    middleware::auth::{
        access_cookie, clear_session_cookies, cookie_value, create_access_token,
        create_refresh_token, hash_token, refresh_cookie, refresh_expires_at,
        verify_access_token, AuthError, AuthUser, REFRESH_COOKIE,
    },
    models::user::*,
    routes::AppState,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde_json::{json, Value};

const INVALID_CREDENTIALS: &str = "Невірний логін або пароль";

/// Issues a fresh access/refresh pair and stores the refresh token hash.
async fn issue_session(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let access_token = create_access_token(user.id, &state.jwt_secret)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;
    let refresh_token = create_refresh_token(user.id, &state.jwt_secret)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

    let token_id = uuid::Uuid::now_v7().to_string();
    db_users::store_refresh_token(
        &state.pool,
        &token_id,
        user.id,
        &hash_token(&refresh_token),
        &refresh_expires_at(),
    )
    .await?;

    Ok(AuthResponse {
        user: user.into(),
        access_token,
        refresh_token,
    })
}

fn with_session(jar: CookieJar, state: &AppState, session: &AuthResponse) -> CookieJar {
    jar.add(access_cookie(session.access_token.clone(), state.cookie_secure))
        .add(refresh_cookie(session.refresh_token.clone(), state.cookie_secure))
}

fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    if req.username.trim().len() < 3 {
        return Err(AppError::BadRequest("Логін має містити щонайменше 3 символи".to_string()));
    }
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Вкажіть ім'я користувача".to_string()));
    }
    if req.password.chars().count() < 8 {
        return Err(AppError::BadRequest("Пароль має містити щонайменше 8 символів".to_string()));
    }
    if let Some(email) = req.email.as_deref().filter(|e| !e.trim().is_empty()) {
        if !email.contains('@') {
            return Err(AppError::BadRequest("Некоректна адреса електронної пошти".to_string()));
        }
    }
    Ok(())
}

/// The first account can be created anonymously; after that only a signed-in
/// user can add accounts, and the new account does not take over their session.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    auth: Result<AuthUser, AuthError>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let bootstrap = db_users::count_users(&state.pool).await? == 0;
    if !bootstrap {
        if let Err(rejection) = auth {
            return Ok(rejection.into_response());
        }
    }

    validate_registration(&req)?;

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?
        .to_string();

    let email = req.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
    let user = db_users::create_user(
        &state.pool,
        req.username.trim(),
        req.name.trim(),
        email,
        &password_hash,
    )
    .await?;
    tracing::info!(user_id = user.id, bootstrap, "user registered");

    if bootstrap {
        let session = issue_session(&state, user).await?;
        let jar = with_session(jar, &state, &session);
        return Ok((StatusCode::CREATED, jar, Json(session)).into_response());
    }

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))).into_response())
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let user = db_users::find_by_username(&state.pool, req.username.trim())
        .await?
        .ok_or(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password hash parse error: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let session = issue_session(&state, user).await?;
    let jar = with_session(jar, &state, &session);
    Ok((jar, Json(session)).into_response())
}

/// Rotates the refresh token. The token comes from the body or the
/// `refresh_token` cookie.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<Response, AppError> {
    let token = body
        .and_then(|Json(req)| req.refresh_token)
        .filter(|t| !t.is_empty())
        .or_else(|| cookie_value(&jar, REFRESH_COOKIE))
        .ok_or(AppError::Unauthorized("Потрібен токен оновлення".to_string()))?;

    verify_access_token(&token, &state.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Недійсний токен оновлення".to_string()))?;

    let token_hash = hash_token(&token);
    let (_token_id, user_id, expires_at) = db_users::find_refresh_token(&state.pool, &token_hash)
        .await?
        .ok_or(AppError::Unauthorized("Токен оновлення не знайдено або відкликано".to_string()))?;

    let expires = chrono::NaiveDateTime::parse_from_str(&expires_at, "%Y-%m-%dT%H:%M:%S%.3fZ")
        .map_err(|e| AppError::Internal(format!("Date parse error: {}", e)))?;
    if expires.and_utc() < Utc::now() {
        db_users::delete_refresh_token(&state.pool, &token_hash).await?;
        return Err(AppError::Unauthorized("Термін дії токена оновлення минув".to_string()));
    }

    let user = db_users::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(AppError::Unauthorized("Користувача не знайдено".to_string()))?;

    db_users::delete_refresh_token(&state.pool, &token_hash).await?;

    let session = issue_session(&state, user).await?;
    let jar = with_session(jar, &state, &session);
    Ok((jar, Json(session)).into_response())
}

/// Works with an expired access token too, so the browser cookies are always cleared.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    auth: Result<AuthUser, AuthError>,
) -> Result<Response, AppError> {
    match auth {
        Ok(user) => db_users::delete_user_refresh_tokens(&state.pool, user.user_id).await?,
        Err(_) => {
            if let Some(token) = cookie_value(&jar, REFRESH_COOKIE) {
                db_users::delete_refresh_token(&state.pool, &hash_token(&token)).await?;
            }
        }
    }

    let cleared = clear_session_cookies(jar, state.cookie_secure);
    let body: Json<Value> = Json(json!({ "message": "Ви вийшли з системи" }));
    Ok((cleared, body).into_response())
}

pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = db_users::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(AppError::not_found("Користувача не знайдено"))?;

    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;
    use crate::routes::router;
    use axum::{
        body::Body,
        http::{header, header::SET_COOKIE, Request},
    };
    use tower::ServiceExt;

    async fn state() -> AppState {
        AppState {
            pool: testing::pool().await,
            jwt_secret: "test-secret".to_string(),
            lesson_weeks_ahead: 8,
            cookie_secure: false,
        }
    }

    fn json_post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn registration_rules() {
        let mut req = RegisterRequest {
            username: "admin".to_string(),
            name: "Оксана".to_string(),
            email: None,
            password: "короткий".to_string(),
        };
        assert!(validate_registration(&req).is_ok());

        req.password = "short".to_string();
        assert!(validate_registration(&req).is_err());

        req.password = "long-enough".to_string();
        req.email = Some("not-an-email".to_string());
        assert!(validate_registration(&req).is_err());
    }

    #[tokio::test]
    async fn login_sets_cookies_and_rejects_bad_password() {
        let app = router(state().await);
        let register = r#"{"username": "admin", "name": "Оксана", "password": "correct-horse"}"#;
        let response = app
            .clone()
            .oneshot(json_post("/api/v1/auth/register", register))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(json_post(
                "/api/v1/auth/login",
                r#"{"username": "admin", "password": "correct-horse"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookies: Vec<_> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().any(|c| c.starts_with("access_token=")));
        assert!(cookies.iter().any(|c| c.starts_with("refresh_token=")));
        assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

        let response = app
            .oneshot(json_post(
                "/api/v1/auth/login",
                r#"{"username": "admin", "password": "wrong-horse"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_rotates_the_token() {
        let state = state().await;
        let fx = testing::Fixture::new(&state.pool).await;
        let user = db_users::find_by_id(&state.pool, fx.actor.user_id)
            .await
            .unwrap()
            .unwrap();
        let session = issue_session(&state, user).await.unwrap();
        let app = router(state);

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/v1/auth/refresh")
                    .header(header::COOKIE, format!("refresh_token={}", session.refresh_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // 이미 사용된 refresh 토큰은 다시 쓸 수 없습니다.
        let body = format!(r#"{{"refresh_token": "{}"}}"#, session.refresh_token);
        let response = app
            .oneshot(json_post("/api/v1/auth/refresh", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_clears_cookies_without_session() {
        let app = router(state().await);

        let response = app
            .oneshot(Request::post("/api/v1/auth/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookies: Vec<_> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|v| v.contains("Max-Age=0")));
    }
}
