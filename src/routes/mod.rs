//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 모아둔 모듈입니다.
//! Axum에서 핸들러는 HTTP 요청을 받아 응답을 반환하는 async 함수입니다.
//!
//! 각 하위 모듈:
//! - `attendance`: 수업 출석부, 출석 기록/일괄 기록/복사/삭제, 출석 통계
//! - `auth`: 인증 (최초 관리자 등록, 로그인, 토큰 갱신, 로그아웃, 내 정보)
//! - `courses`, `teachers`, `students`: 기본 정보 CRUD
//! - `groups`: 그룹 CRUD, 학생 소속 관리, 그룹 이력
//! - `health`: 서버 상태 확인 (헬스체크)
//! - `lessons`: 수업 CRUD, 달력, 일정 자동 생성
//! - `payments`: 결제 기록
//!
//! 헬스체크와 로그인/등록/갱신을 제외한 모든 핸들러는 `AuthUser`를 요구합니다.

pub mod attendance;
pub mod auth;
pub mod courses;
pub mod groups;
pub mod health;
pub mod lessons;
pub mod payments;
pub mod students;
pub mod teachers;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use sqlx::SqlitePool;

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// SqlitePool은 내부적으로 Arc를 사용하므로 clone해도 같은 풀을 가리킵니다.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    /// JWT 토큰 서명용 비밀키
    pub jwt_secret: String,
    /// 일정 생성 요청에 weeks_ahead가 없을 때의 기본값
    pub lesson_weeks_ahead: u32,
    /// 세션 쿠키에 Secure 속성을 붙일지 여부
    pub cookie_secure: bool,
}

/// 서버 현지 시각 기준의 오늘 날짜 (일정 생성, 가입일/결제일 기본값)
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// `/api/v1` 아래의 모든 API 라우트
///
/// 경로 파라미터는 axum 0.8 문법(`{id}`)을 사용합니다.
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me));

    let api_routes = Router::new()
        .merge(auth_routes)
        // 과정
        .route("/courses", get(courses::list_courses).post(courses::create_course))
        .route(
            "/courses/{id}",
            get(courses::get_course)
                .patch(courses::update_course)
                .delete(courses::delete_course),
        )
        // 강사
        .route("/teachers", get(teachers::list_teachers).post(teachers::create_teacher))
        .route(
            "/teachers/{id}",
            get(teachers::get_teacher)
                .patch(teachers::update_teacher)
                .delete(teachers::delete_teacher),
        )
        // 학생
        .route("/students", get(students::list_students).post(students::create_student))
        .route(
            "/students/by-public-id/{public_id}",
            get(students::get_student_by_public_id),
        )
        .route(
            "/students/{id}",
            get(students::get_student)
                .patch(students::update_student)
                .delete(students::delete_student),
        )
        .route("/students/{id}/groups", get(students::list_student_groups))
        .route("/students/{id}/attendance-stats", get(attendance::student_stats))
        .route(
            "/students/{id}/payments",
            get(payments::list_student_payments).post(payments::create_payment),
        )
        // 그룹
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/groups/by-public-id/{public_id}",
            get(groups::get_group_by_public_id),
        )
        .route(
            "/groups/{id}",
            get(groups::get_group)
                .patch(groups::update_group)
                .delete(groups::delete_group),
        )
        .route(
            "/groups/{id}/students",
            get(groups::list_group_students).post(groups::add_student),
        )
        .route(
            "/groups/{id}/students/{student_id}",
            axum::routing::delete(groups::remove_student),
        )
        .route("/groups/{id}/history", get(groups::group_history))
        .route("/groups/{id}/history/recent", get(groups::recent_group_history))
        .route("/groups/{id}/attendance-stats", get(attendance::group_stats))
        .route(
            "/groups/{id}/lessons",
            get(lessons::list_group_lessons).post(lessons::create_lesson),
        )
        .route("/groups/{id}/lessons/generate", post(lessons::generate_for_group))
        // 수업
        .route("/lessons", get(lessons::calendar))
        .route("/lessons/generate", post(lessons::generate_for_active_groups))
        .route(
            "/lessons/{id}",
            get(lessons::get_lesson)
                .patch(lessons::update_lesson)
                .delete(lessons::delete_lesson),
        )
        // 출석
        .route(
            "/lessons/{id}/attendance",
            get(attendance::lesson_sheet)
                .put(attendance::set_attendance)
                .delete(attendance::clear_attendance),
        )
        .route("/lessons/{id}/attendance/all", post(attendance::set_attendance_for_all))
        .route("/lessons/{id}/attendance/copy-previous", post(attendance::copy_previous))
        // 결제
        .route("/payments", get(payments::list_payments))
        .route("/payments/{id}", axum::routing::delete(payments::delete_payment))
        // 헬스체크
        .route("/health", get(health::health_check))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
