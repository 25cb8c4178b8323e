use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    extract::cookie::{Cookie, CookieJar, SameSite},
    extract::TypedHeader,
};
use chrono::{Duration, Utc};
use headers::{authorization::Bearer, Authorization};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::db::users as db_users;
use crate::models::Actor;
use crate::routes::AppState;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

const ACCESS_TTL_MINUTES: i64 = 15;
const REFRESH_TTL_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub exp: i64,
    pub iat: i64,
    /// Unique per token, so two tokens issued in the same second never share a hash.
    pub jti: String,
}

/// The signed-in user, with the display name as stored right now.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub name: String,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            user_name: self.name.clone(),
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string());
        let token = bearer
            .or_else(|| cookie_value(&CookieJar::from_headers(&parts.headers), ACCESS_COOKIE))
            .ok_or(AuthError::MissingToken)?;

        let claims = verify_access_token(&token, &state.jwt_secret)?;
        let user_id: i64 = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;

        let user = db_users::find_by_id(&state.pool, user_id)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load authenticated user: {}", e);
                AuthError::Unavailable
            })?
            .ok_or(AuthError::InvalidToken)?;

        Ok(AuthUser {
            user_id: user.id,
            username: user.username,
            name: user.name,
        })
    }
}

/// Value of a session cookie, ignoring empty ones left behind by a logout.
pub fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn access_cookie(token: String, secure: bool) -> Cookie<'static> {
    let mut cookie = session_cookie(ACCESS_COOKIE, token, secure);
    cookie.set_max_age(time::Duration::minutes(ACCESS_TTL_MINUTES));
    cookie
}

pub fn refresh_cookie(token: String, secure: bool) -> Cookie<'static> {
    let mut cookie = session_cookie(REFRESH_COOKIE, token, secure);
    cookie.set_max_age(time::Duration::days(REFRESH_TTL_DAYS));
    cookie
}

/// Adds removal cookies for both session cookies, whether or not the
/// request carried them.
pub fn clear_session_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    [ACCESS_COOKIE, REFRESH_COOKIE]
        .into_iter()
        .fold(jar, |jar, name| {
            let mut cookie = session_cookie(name, String::new(), secure);
            cookie.make_removal();
            jar.add(cookie)
        })
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    Unavailable,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "missing_token",
                "Потрібна авторизація",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Недійсний токен авторизації",
            ),
            AuthError::ExpiredToken => (
                StatusCode::UNAUTHORIZED,
                "expired_token",
                "Термін дії сесії минув, увійдіть знову",
            ),
            AuthError::Unavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Внутрішня помилка сервера",
            ),
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

fn create_token(user_id: i64, ttl: Duration, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
        jti: uuid::Uuid::now_v7().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn create_access_token(user_id: i64, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    create_token(user_id, Duration::minutes(ACCESS_TTL_MINUTES), secret)
}

pub fn create_refresh_token(user_id: i64, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    create_token(user_id, Duration::days(REFRESH_TTL_DAYS), secret)
}

pub fn refresh_expires_at() -> String {
    (Utc::now() + Duration::days(REFRESH_TTL_DAYS))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
