//! # 학생(Student) API 라우트 핸들러
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | GET | /api/v1/students | `list_students` | 목록 (`?q=` 이름/전화 검색, `?active=`) |
//! | POST | /api/v1/students | `create_student` | 새 학생 등록 |
//! | GET | /api/v1/students/by-public-id/{public_id} | `get_student_by_public_id` | 공개 ID로 조회 |
//! | GET | /api/v1/students/{id} | `get_student` | 단일 학생 조회 |
//! | PATCH | /api/v1/students/{id} | `update_student` | 학생 정보 수정 |
//! | DELETE | /api/v1/students/{id} | `delete_student` | 삭제 (활성 소속이 있으면 409) |
//! | GET | /api/v1/students/{id}/groups | `list_student_groups` | 소속 그룹 이력 |
//!
//! 학생의 출석 통계와 결제 기록은 각각 `attendance`, `payments` 모듈에 있습니다.

use crate::{
    db::students as db_students,
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

/// `GET /api/v1/students?q=Петренко&active=true` → `{ "students": [...] }`
pub async fn list_students(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<StudentListQuery>,
) -> Result<Json<Value>, AppError> {
    let students = db_students::list_students(&state.pool, &query).await?;
    Ok(Json(json!({ "students": students })))
}

pub async fn get_student(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Student>, AppError> {
    let student = db_students::get_student(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Студента не знайдено"))?;
    Ok(Json(student))
}

/// 대시보드 URL에 노출되는 UUID(`public_id`)로 학생을 찾습니다.
pub async fn get_student_by_public_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(public_id): Path<String>,
) -> Result<Json<Student>, AppError> {
    let student = db_students::get_student_by_public_id(&state.pool, &public_id)
        .await?
        .ok_or(AppError::not_found("Студента не знайдено"))?;
    Ok(Json(student))
}

pub async fn create_student(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let student = db_students::create_student(&state.pool, &req).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn update_student(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStudentRequest>,
) -> Result<Json<Student>, AppError> {
    let student = db_students::update_student(&state.pool, id, &req)
        .await?
        .ok_or(AppError::not_found("Студента не знайдено"))?;
    Ok(Json(student))
}

/// 활성 그룹 소속이 남아 있으면 409를 반환합니다. 먼저 그룹에서 제외해야 합니다.
pub async fn delete_student(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !db_students::delete_student(&state.pool, id).await? {
        return Err(AppError::not_found("Студента не знайдено"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/students/{id}/groups` → `{ "groups": [...] }`
///
/// 종료된 소속(leave_date가 있는 행)도 함께 반환합니다.
pub async fn list_student_groups(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    db_students::get_student(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Студента не знайдено"))?;

    let groups = db_students::list_student_memberships(&state.pool, id).await?;
    Ok(Json(json!({ "groups": groups })))
}
