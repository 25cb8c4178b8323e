//! # 출석(Attendance) API 라우트 핸들러
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | GET | /api/v1/lessons/{id}/attendance | `lesson_sheet` | 수업 출석부 (기록 없는 학생은 status=null) |
//! | PUT | /api/v1/lessons/{id}/attendance | `set_attendance` | 학생 한 명 기록 (upsert) |
//! | DELETE | /api/v1/lessons/{id}/attendance | `clear_attendance` | 수업의 출석 기록 전체 삭제 |
//! | POST | /api/v1/lessons/{id}/attendance/all | `set_attendance_for_all` | 활성 학생 전원에게 같은 상태 |
//! | POST | /api/v1/lessons/{id}/attendance/copy-previous | `copy_previous` | 직전 수업 기록 복사 |
//! | GET | /api/v1/students/{id}/attendance-stats | `student_stats` | 학생 출석 통계 |
//! | GET | /api/v1/groups/{id}/attendance-stats | `group_stats` | 그룹 출석 통계 |
//!
//! 일괄 기록과 복사는 전부 성공하거나 전부 취소됩니다(하나의 트랜잭션).

use crate::{
    db::{attendance as db_attendance, groups as db_groups, lessons as db_lessons, students as db_students},
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    routes::AppState,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

/// `GET /api/v1/lessons/{id}/attendance` → `{ "lesson": {...}, "students": [...] }`
///
/// 그룹의 활성 학생과, 이미 기록이 있는 비활성 학생이 모두 포함됩니다.
pub async fn lesson_sheet(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(lesson_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let lesson = db_lessons::get_lesson(&state.pool, lesson_id)
        .await?
        .ok_or(AppError::not_found("Заняття не знайдено"))?;

    let students =
        db_attendance::get_attendance_for_lesson_with_students(&state.pool, lesson_id).await?;
    Ok(Json(json!({ "lesson": lesson, "students": students })))
}

/// `PUT /api/v1/lessons/{id}/attendance`
/// + `{ "student_id": 1, "status": "makeup_planned", "makeup_lesson_id": 42 }`
pub async fn set_attendance(
    State(state): State<AppState>,
    user: AuthUser,
    Path(lesson_id): Path<i64>,
    Json(req): Json<SetAttendanceRequest>,
) -> Result<Json<Attendance>, AppError> {
    let attendance =
        db_attendance::record_attendance(&state.pool, lesson_id, &req, user.user_id).await?;
    Ok(Json(attendance))
}

/// `POST /api/v1/lessons/{id}/attendance/all` + `{ "status": "present" }` → `{ "updated": 12 }`
pub async fn set_attendance_for_all(
    State(state): State<AppState>,
    user: AuthUser,
    Path(lesson_id): Path<i64>,
    Json(req): Json<SetAttendanceForAllRequest>,
) -> Result<Json<Value>, AppError> {
    let updated =
        db_attendance::set_attendance_for_all(&state.pool, lesson_id, req.status, user.user_id)
            .await?;
    Ok(Json(json!({ "updated": updated })))
}

/// `POST /api/v1/lessons/{id}/attendance/copy-previous` → `{ "copied": 10 }`
///
/// 같은 그룹에서 날짜가 가장 가까운 이전 수업(취소된 수업 제외)의 기록을 복사합니다.
/// 이전 수업이 없으면 `copied: 0`입니다.
pub async fn copy_previous(
    State(state): State<AppState>,
    user: AuthUser,
    Path(lesson_id): Path<i64>,
) -> Result<Json<CopyAttendanceResult>, AppError> {
    let result =
        db_attendance::copy_attendance_from_previous_lesson(&state.pool, lesson_id, user.user_id)
            .await?;
    Ok(Json(result))
}

/// `DELETE /api/v1/lessons/{id}/attendance` → `{ "removed": 12 }`
pub async fn clear_attendance(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(lesson_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    db_lessons::get_lesson(&state.pool, lesson_id)
        .await?
        .ok_or(AppError::not_found("Заняття не знайдено"))?;

    let removed = db_attendance::clear_attendance_for_lesson(&state.pool, lesson_id).await?;
    Ok(Json(json!({ "removed": removed })))
}

/// `GET /api/v1/students/{id}/attendance-stats?group_id=&from=&to=`
pub async fn student_stats(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(student_id): Path<i64>,
    Query(query): Query<StudentStatsQuery>,
) -> Result<Json<AttendanceStats>, AppError> {
    db_students::get_student(&state.pool, student_id)
        .await?
        .ok_or(AppError::not_found("Студента не знайдено"))?;

    let stats = db_attendance::get_student_attendance_stats(&state.pool, student_id, &query).await?;
    Ok(Json(stats))
}

/// `GET /api/v1/groups/{id}/attendance-stats?from=&to=`
///
/// 취소된 수업은 집계에서 빠집니다.
pub async fn group_stats(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(group_id): Path<i64>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<GroupAttendanceStats>, AppError> {
    db_groups::get_group(&state.pool, group_id)
        .await?
        .ok_or(AppError::not_found("Групу не знайдено"))?;

    let stats = db_attendance::get_group_attendance_stats(&state.pool, group_id, &range).await?;
    Ok(Json(stats))
}
