//! # 수업(Lesson) API 라우트 핸들러
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | GET | /api/v1/lessons | `calendar` | 전체 그룹 달력 (`?from=&to=`) |
//! | POST | /api/v1/lessons/generate | `generate_for_active_groups` | 모든 활성 그룹 일정 생성 |
//! | GET | /api/v1/lessons/{id} | `get_lesson` | 단일 수업 조회 |
//! | PATCH | /api/v1/lessons/{id} | `update_lesson` | 주제/메모/상태/날짜 변경 |
//! | DELETE | /api/v1/lessons/{id} | `delete_lesson` | 삭제 (출석 기록이 있으면 409) |
//! | GET | /api/v1/groups/{id}/lessons | `list_group_lessons` | 그룹 수업 목록 (`?from=&to=`) |
//! | POST | /api/v1/groups/{id}/lessons | `create_lesson` | 수업 한 회차 수동 추가 |
//! | POST | /api/v1/groups/{id}/lessons/generate | `generate_for_group` | 한 그룹 일정 생성 |
//!
//! ## 일정 생성
//! 요청 본문 `{ "weeks_ahead": 4 }`는 생략할 수 있고, 생략하면 설정값
//! (`LESSON_WEEKS_AHEAD`)을 사용합니다. 생성 기준일은 서버의 오늘 날짜입니다.
//! 이미 있는 날짜는 건너뛰므로 같은 요청을 반복해도 결과가 같습니다.

use crate::{
    db::lessons as db_lessons,
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

/// 본문이 없거나 `weeks_ahead`가 빠졌으면 설정의 기본값을 사용합니다.
fn weeks_ahead(state: &AppState, body: Option<Json<GenerateLessonsRequest>>) -> u32 {
    body.and_then(|Json(req)| req.weeks_ahead)
        .unwrap_or(state.lesson_weeks_ahead)
}

/// `GET /api/v1/lessons?from=2026-10-01&to=2026-10-31` → `{ "lessons": [...] }`
///
/// 날짜·시작 시각 순으로 정렬되며, 각 수업에 그룹 이름이 붙어 있습니다.
pub async fn calendar(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let lessons = db_lessons::list_calendar(&state.pool, &range).await?;
    Ok(Json(json!({ "lessons": lessons })))
}

pub async fn list_group_lessons(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(group_id): Path<i64>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let lessons = db_lessons::list_group_lessons(&state.pool, group_id, &range).await?;
    Ok(Json(json!({ "lessons": lessons })))
}

pub async fn get_lesson(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Lesson>, AppError> {
    let lesson = db_lessons::get_lesson(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Заняття не знайдено"))?;
    Ok(Json(lesson))
}

/// `POST /api/v1/groups/{id}/lessons` + `{ "lesson_date": "2026-10-20" }`
///
/// 시작·종료 시각은 그룹의 반복 규칙에서 계산됩니다.
/// 같은 날짜의 수업이 이미 있으면 409, 그룹 유효 기간 밖이면 400.
pub async fn create_lesson(
    State(state): State<AppState>,
    user: AuthUser,
    Path(group_id): Path<i64>,
    Json(req): Json<CreateLessonRequest>,
) -> Result<(StatusCode, Json<Lesson>), AppError> {
    let lesson = db_lessons::create_lesson(&state.pool, group_id, &req, user.user_id).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

/// `PATCH /api/v1/lessons/{id}`
///
/// 상태가 처음 `done`이 될 때 그룹 이력에 `lesson_conducted`가 남습니다.
pub async fn update_lesson(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateLessonRequest>,
) -> Result<Json<Lesson>, AppError> {
    let lesson = db_lessons::update_lesson(&state.pool, id, &req, &user.actor())
        .await?
        .ok_or(AppError::not_found("Заняття не знайдено"))?;
    Ok(Json(lesson))
}

pub async fn delete_lesson(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !db_lessons::delete_lesson(&state.pool, id).await? {
        return Err(AppError::not_found("Заняття не знайдено"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/v1/groups/{id}/lessons/generate` → `{ "generated": 3, "skipped": 1 }`
pub async fn generate_for_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(group_id): Path<i64>,
    body: Option<Json<GenerateLessonsRequest>>,
) -> Result<Json<GenerationResult>, AppError> {
    let weeks = weeks_ahead(&state, body);
    let result =
        db_lessons::generate_lessons_for_group(&state.pool, group_id, weeks, user.user_id, today())
            .await?;
    Ok(Json(result))
}

/// `POST /api/v1/lessons/generate`
///
/// 한 그룹의 실패가 다른 그룹의 생성을 막지 않습니다.
/// 실패한 그룹은 보고서의 `error` 필드로 확인할 수 있습니다.
pub async fn generate_for_active_groups(
    State(state): State<AppState>,
    user: AuthUser,
    body: Option<Json<GenerateLessonsRequest>>,
) -> Result<Json<BatchGenerationReport>, AppError> {
    let weeks = weeks_ahead(&state, body);
    let report =
        db_lessons::generate_lessons_for_active_groups(&state.pool, weeks, user.user_id, today())
            .await?;
    Ok(Json(report))
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
    async fn generation_without_body_uses_configured_weeks() {
        let pool = testing::pool().await;
        let fx = testing::Fixture::new(&pool).await;
        let state = AppState {
            pool,
            jwt_secret: "test-secret".to_string(),
            lesson_weeks_ahead: 2,
            cookie_secure: false,
        };
        let token = create_access_token(fx.actor.user_id, &state.jwt_secret).unwrap();
        let app = router(state);
        let bearer = format!("Bearer {}", token);

        let request = || {
            Request::post(format!("/api/v1/groups/{}/lessons/generate", fx.group_id))
                .header(header::AUTHORIZATION, &bearer)
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let first: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(first["generated"], 2);

        let response = app.oneshot(request()).await.unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let second: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(second["generated"], 0);
        assert_eq!(second["skipped"], 2);
    }

    #[tokio::test]
    async fn out_of_range_weeks_is_a_bad_request() {
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

        let response = app
            .oneshot(
                Request::post("/api/v1/lessons/generate")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"weeks_ahead": 53}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
