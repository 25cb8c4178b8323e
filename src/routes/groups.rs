//! # 그룹(Group) API 라우트 핸들러
//!
//! 그룹 CRUD, 학생 소속 관리, 그룹 이력 조회를 담당합니다.
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | GET | /api/v1/groups | `list_groups` | 목록 (`?status=&course_id=&teacher_id=`) |
//! | POST | /api/v1/groups | `create_group` | 새 그룹 (이력: created) |
//! | GET | /api/v1/groups/by-public-id/{public_id} | `get_group_by_public_id` | 공개 ID로 조회 |
//! | GET | /api/v1/groups/{id} | `get_group` | 단일 그룹 조회 |
//! | PATCH | /api/v1/groups/{id} | `update_group` | 그룹 수정 (변경마다 이력) |
//! | DELETE | /api/v1/groups/{id} | `delete_group` | 삭제 (활성 학생이 있으면 409) |
//! | GET | /api/v1/groups/{id}/students | `list_group_students` | 소속 학생 (`?include_inactive=true`) |
//! | POST | /api/v1/groups/{id}/students | `add_student` | 학생 추가 (이력: student_added) |
//! | DELETE | /api/v1/groups/{id}/students/{student_id} | `remove_student` | 학생 제외 (이력: student_removed) |
//! | GET | /api/v1/groups/{id}/history | `group_history` | 전체 이력 (`?limit=`) |
//! | GET | /api/v1/groups/{id}/history/recent | `recent_group_history` | 최근 이력 (기본 4건) |
//!
//! ## 이력 기록
//! 그룹을 바꾸는 핸들러는 `AuthUser::actor()`를 DB 계층에 넘깁니다.
//! 변경과 이력 기록은 DB 계층에서 하나의 트랜잭션으로 처리되므로,
//! 핸들러는 이력을 직접 다루지 않습니다.

use crate::{
    db::{groups as db_groups, history as db_history},
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    routes::{today, AppState},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

/// `GET /api/v1/groups` → `{ "groups": [...] }`
///
/// 각 항목에는 과정 이름, 강사 이름, 활성 학생 수가 함께 들어 있습니다.
pub async fn list_groups(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<GroupListQuery>,
) -> Result<Json<Value>, AppError> {
    let groups = db_groups::list_groups(&state.pool, &query).await?;
    Ok(Json(json!({ "groups": groups })))
}

pub async fn get_group(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<GroupView>, AppError> {
    let group = db_groups::get_group_view(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Групу не знайдено"))?;
    Ok(Json(group))
}

pub async fn get_group_by_public_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(public_id): Path<String>,
) -> Result<Json<GroupView>, AppError> {
    let group = db_groups::get_group_by_public_id(&state.pool, &public_id)
        .await?
        .ok_or(AppError::not_found("Групу не знайдено"))?;
    Ok(Json(group))
}

/// `POST /api/v1/groups` → 201 Created
///
/// 반복 규칙(요일·시작 시각·길이)과 유효 기간을 검증한 뒤 생성합니다.
pub async fn create_group(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupView>), AppError> {
    let group = db_groups::create_group(&state.pool, &req, &user.actor()).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// `PATCH /api/v1/groups/{id}`
///
/// 실제로 바뀐 필드마다 이력 항목이 하나씩 남습니다.
/// 아무것도 바뀌지 않았으면 이력 없이 현재 그룹을 그대로 반환합니다.
pub async fn update_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<Json<GroupView>, AppError> {
    let group = db_groups::update_group(&state.pool, id, &req, &user.actor())
        .await?
        .ok_or(AppError::not_found("Групу не знайдено"))?;
    Ok(Json(group))
}

/// `DELETE /api/v1/groups/{id}` → 204 No Content
///
/// 그룹 이력, 수업, 소속 기록은 함께 삭제(CASCADE)됩니다.
pub async fn delete_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !db_groups::delete_group(&state.pool, id, &user.actor()).await? {
        return Err(AppError::not_found("Групу не знайдено"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/groups/{id}/students` → `{ "students": [...] }`
pub async fn list_group_students(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Query(query): Query<GroupStudentsQuery>,
) -> Result<Json<Value>, AppError> {
    db_groups::get_group(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Групу не знайдено"))?;

    let students =
        db_groups::list_group_students(&state.pool, id, query.include_inactive.unwrap_or(false))
            .await?;
    Ok(Json(json!({ "students": students })))
}

/// `POST /api/v1/groups/{id}/students` + `{ "student_id": 1, "join_date": "2026-09-01" }`
///
/// `join_date`를 생략하면 오늘 날짜로 가입합니다.
pub async fn add_student(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<AddStudentToGroupRequest>,
) -> Result<(StatusCode, Json<StudentGroup>), AppError> {
    let membership =
        db_groups::add_student_to_group(&state.pool, id, &req, &user.actor(), today()).await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

/// `DELETE /api/v1/groups/{id}/students/{student_id}?leave_date=2026-10-31`
///
/// 소속 행을 지우지 않고 `leave_date`를 채워 비활성으로 바꿉니다.
pub async fn remove_student(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, student_id)): Path<(i64, i64)>,
    Query(query): Query<RemoveStudentQuery>,
) -> Result<Json<StudentGroup>, AppError> {
    let membership = db_groups::remove_student_from_group(
        &state.pool,
        id,
        student_id,
        query.leave_date.as_deref(),
        &user.actor(),
        today(),
    )
    .await?
    .ok_or(AppError::not_found("Студент не є активним учасником групи"))?;
    Ok(Json(membership))
}

/// `GET /api/v1/groups/{id}/history?limit=20` → `{ "history": [...] }` (최신순)
pub async fn group_history(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, AppError> {
    db_groups::get_group(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Групу не знайдено"))?;

    let history = db_history::get_group_history(&state.pool, id, query.limit).await?;
    Ok(Json(json!({ "history": history })))
}

/// `GET /api/v1/groups/{id}/history/recent` → 그룹 카드 요약용 최근 이력
pub async fn recent_group_history(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, AppError> {
    db_groups::get_group(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Групу не знайдено"))?;

    let history = db_history::get_recent_group_history(&state.pool, id, query.limit).await?;
    Ok(Json(json!({ "history": history })))
}

#[cfg(test)]
mod tests {
    use crate::db::testing;
    use crate::middleware::auth::create_access_token;
    use crate::routes::{router, AppState};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    #[tokio::test]
    async fn patch_then_history_lists_newest_first() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let state = AppState {
            pool,
            jwt_secret: "test-secret".to_string(),
            lesson_weeks_ahead: 8,
            cookie_secure: false,
        };
        let token = create_access_token(fx.actor.user_id, &state.jwt_secret).unwrap();
        let app = router(state);
        let bearer = format!("Bearer {}", token);

        let response = app
            .clone()
            .oneshot(
                Request::patch(format!("/api/v1/groups/{}", fx.group_id))
                    .header(header::AUTHORIZATION, &bearer)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"room": "Каб. 12", "status": "inactive"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::get(format!("/api/v1/groups/{}/history/recent", fx.group_id))
                    .header(header::AUTHORIZATION, &bearer)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        let history = json["history"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert!(history
            .iter()
            .all(|entry| entry["user_name"] == fx.actor.user_name.as_str()));
    }
}
