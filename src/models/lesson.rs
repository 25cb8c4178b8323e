//! # 수업(Lesson) 모델
//!
//! 수업은 그룹의 주간 반복 규칙에서 만들어진 **구체적인 날짜의 한 회차**입니다.
//!
//! ## 수업 상태 흐름
//! ```text
//! scheduled ──(수업 진행)──→ done        (그룹 이력에 lesson_conducted 기록)
//!     └─────(취소)─────────→ canceled
//! ```

use serde::{Deserialize, Serialize};

use super::double_option;

/// 수업 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LessonStatus {
    Scheduled,
    Done,
    Canceled,
}

/// 수업 엔티티: DB의 `lessons` 테이블 한 행에 대응합니다.
///
/// `start_datetime`/`end_datetime`은 `lesson_date` + 그룹의 시작 시각(+ 수업 길이)으로
/// 계산된 값이며 "YYYY-MM-DDTHH:MM:SS" 형식의 현지 시각입니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lesson {
    pub id: i64,
    pub public_id: String,
    pub group_id: i64,
    pub lesson_date: String,
    pub start_datetime: String,
    pub end_datetime: String,
    pub status: LessonStatus,
    pub topic: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// 달력 화면용 수업 정보: 그룹 이름을 함께 가져옵니다.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LessonWithGroup {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub lesson: Lesson,
    pub group_title: String,
}

/// 수업 수동 생성 요청: `POST /api/v1/groups/{id}/lessons`
///
/// 시각은 그룹의 반복 규칙에서 계산하므로 날짜만 받습니다.
#[derive(Debug, Deserialize)]
pub struct CreateLessonRequest {
    pub lesson_date: String,
    pub topic: Option<String>,
    pub notes: Option<String>,
}

/// 수업 수정 요청: `PATCH /api/v1/lessons/{id}`
#[derive(Debug, Default, Deserialize)]
pub struct UpdateLessonRequest {
    /// 날짜를 옮기면 시작/종료 시각도 다시 계산됩니다.
    pub lesson_date: Option<String>,
    pub status: Option<LessonStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub topic: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

/// 일정 생성 요청: `POST /api/v1/groups/{id}/lessons/generate`, `POST /api/v1/lessons/generate`
#[derive(Debug, Default, Deserialize)]
pub struct GenerateLessonsRequest {
    /// 몇 주 앞까지 생성할지 (없으면 설정값 `LESSON_WEEKS_AHEAD`)
    pub weeks_ahead: Option<u32>,
}

/// 한 그룹의 일정 생성 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    /// 새로 만든 수업 수
    pub generated: u32,
    /// 이미 존재해서 건너뛴 날짜 수
    pub skipped: u32,
}

/// 일괄 생성에서 그룹 하나의 결과
///
/// 그룹의 반복 규칙이 잘못된 경우 `error`에 메시지가 담기고,
/// 다른 그룹의 생성은 계속 진행됩니다.
#[derive(Debug, Clone, Serialize)]
pub struct GroupGenerationOutcome {
    pub group_id: i64,
    pub group_title: String,
    pub generated: u32,
    pub skipped: u32,
    pub error: Option<String>,
}

/// 모든 활성 그룹에 대한 일괄 생성 보고서
#[derive(Debug, Clone, Serialize)]
pub struct BatchGenerationReport {
    pub groups: Vec<GroupGenerationOutcome>,
    pub total_generated: u32,
    pub total_skipped: u32,
    pub failed: u32,
}
