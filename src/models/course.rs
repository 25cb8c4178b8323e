//! # 과정(Course) 모델
//!
//! 과정은 그룹이 속하는 커리큘럼 단위입니다. (예: "Robotics 8-10", "Scratch")
//! 하나의 과정에 여러 그룹이 있을 수 있습니다.

use serde::{Deserialize, Serialize};

use super::double_option;

/// 과정 엔티티: DB의 `courses` 테이블 한 행에 대응합니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    /// 외부에 노출되는 불투명 식별자 (UUIDv7)
    pub public_id: String,
    pub name: String,
    pub description: Option<String>,
    /// 권장 최소/최대 나이
    pub age_min: Option<i64>,
    pub age_max: Option<i64>,
    /// 과정 기간(개월)
    pub duration_months: Option<i64>,
    /// 월 수강료 (흐리우냐 단위 정수)
    pub price: Option<i64>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// 과정 생성 요청: `POST /api/v1/courses`
#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub name: String,
    pub description: Option<String>,
    pub age_min: Option<i64>,
    pub age_max: Option<i64>,
    pub duration_months: Option<i64>,
    pub price: Option<i64>,
    pub is_active: Option<bool>,
}

/// 과정 수정 요청: `PATCH /api/v1/courses/{id}`
///
/// 선택 필드는 `double_option`으로 "누락(변경 안 함)"과 "null(값 지움)"을 구분합니다.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCourseRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub age_min: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub age_max: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub duration_months: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub price: Option<Option<i64>>,
    pub is_active: Option<bool>,
}

/// 과정 목록 필터: `?active=true`
#[derive(Debug, Default, Deserialize)]
pub struct CourseListQuery {
    pub active: Option<bool>,
}
