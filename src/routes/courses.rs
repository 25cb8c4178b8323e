//! # 과정(Course) API 라우트 핸들러
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | GET | /api/v1/courses | `list_courses` | 과정 목록 (`?active=true`) |
//! | POST | /api/v1/courses | `create_course` | 새 과정 생성 |
//! | GET | /api/v1/courses/{id} | `get_course` | 단일 과정 조회 |
//! | PATCH | /api/v1/courses/{id} | `update_course` | 과정 수정 (부분 업데이트) |
//! | DELETE | /api/v1/courses/{id} | `delete_course` | 과정 삭제 (사용 중이면 409) |
//!
//! 모든 핸들러는 로그인한 사용자(`AuthUser`)만 호출할 수 있습니다.
//! 핸들러 자체는 `_user`를 사용하지 않지만, 추출자가 실패하면 401이 반환됩니다.

use crate::{
    db::courses as db_courses,
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    routes::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

/// `GET /api/v1/courses` → `{ "courses": [...] }`
///
/// `Query(query)`: URL 쿼리 문자열(`?active=true`)을 구조체로 파싱합니다.
pub async fn list_courses(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<CourseListQuery>,
) -> Result<Json<Value>, AppError> {
    let courses = db_courses::list_courses(&state.pool, query.active).await?;
    Ok(Json(json!({ "courses": courses })))
}

/// `GET /api/v1/courses/{id}`
pub async fn get_course(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Course>, AppError> {
    let course = db_courses::get_course(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Курс не знайдено"))?;
    Ok(Json(course))
}

/// `POST /api/v1/courses` → 201 Created
pub async fn create_course(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let course = db_courses::create_course(&state.pool, &req).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// `PATCH /api/v1/courses/{id}`
///
/// 요청에 포함된 필드만 변경됩니다. `null`을 보내면 해당 값이 지워집니다.
pub async fn update_course(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<Json<Course>, AppError> {
    let course = db_courses::update_course(&state.pool, id, &req)
        .await?
        .ok_or(AppError::not_found("Курс не знайдено"))?;
    Ok(Json(course))
}

/// `DELETE /api/v1/courses/{id}` → 204 No Content
///
/// 이 과정을 사용하는 그룹이 있으면 409 Conflict를 반환합니다.
pub async fn delete_course(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted = db_courses::delete_course(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::not_found("Курс не знайдено"));
    }
    Ok(StatusCode::NO_CONTENT)
}
