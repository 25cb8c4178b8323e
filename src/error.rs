//! # 에러 처리 모듈
//!
//! 애플리케이션에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//! Rust에서는 예외(exception) 대신 `Result<T, E>` 타입으로 에러를 처리합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError` 열거형(enum): 모든 에러 종류를 하나의 타입으로 통합
//! - `IntoResponse` 구현: 에러를 HTTP 응답으로 자동 변환
//!
//! 클라이언트(대시보드)는 우크라이나어 UI이므로, 사용자에게 보이는 메시지는
//! 모두 우크라이나어로 작성합니다. 내부 에러의 상세 내용은 로그에만 남깁니다.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
///
/// 각 에러 variant는 적절한 HTTP 상태 코드와 메시지로 변환됩니다.
/// 핸들러에서 `Result<T, AppError>`를 반환하면,
/// Axum이 자동으로 `IntoResponse`를 호출하여 HTTP 응답으로 변환합니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 요청한 리소스를 찾을 수 없음 (HTTP 404)
    /// 어떤 리소스인지 알려주는 메시지를 담습니다. 예: "Групу не знайдено"
    #[error("{0}")]
    NotFound(String),

    /// 잘못된 요청, 입력 검증 실패 (HTTP 400)
    #[error("{0}")]
    BadRequest(String),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// 데이터베이스 오류 (HTTP 500)
    /// #[from]: sqlx::Error → AppError::Database 자동 변환 (`?` 연산자에서 사용)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 마이그레이션 실행 오류 (서버 시작 시)
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// 파일 입출력 오류 (HTTP 500)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 인증 실패 (HTTP 401)
    #[error("{0}")]
    Unauthorized(String),

    /// 무결성 충돌 (HTTP 409)
    /// 예: 출석 기록이 있는 수업 삭제, 활성 학생이 있는 그룹 삭제
    #[error("{0}")]
    Conflict(String),
}

impl AppError {
    /// 리소스 이름으로 NotFound 에러를 만드는 축약 함수
    pub fn not_found(message: &str) -> Self {
        AppError::NotFound(message.to_string())
    }

    /// UNIQUE 제약 위반이면 Conflict로, 그 외의 DB 에러는 그대로 Database로 변환합니다.
    ///
    /// 중복 수업 날짜, 같은 날 재가입 등 스키마 수준의 유일성 위반을
    /// 500 대신 409로 보고하기 위해 사용합니다.
    pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => AppError::Conflict(message.to_string()),
            _ => AppError::Database(err),
        }
    }
}

impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 내부 에러(Database, Migrate, IO, Internal)는 실제 에러 내용을 로그에만 기록하고,
    /// 클라이언트에는 일반적인 메시지만 반환합니다.
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", msg.clone())
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Сталася внутрішня помилка".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Помилка бази даних".to_string(),
                )
            }
            AppError::Migrate(ref e) => {
                tracing::error!("Migration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Помилка бази даних".to_string(),
                )
            }
            AppError::Io(ref e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "Помилка введення-виведення".to_string(),
                )
            }
            AppError::Unauthorized(ref msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
        };

        // 결과: { "success": false, "error": { "code": "not_found", "message": "..." } }
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
