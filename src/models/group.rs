//! # 학습 그룹(Group) 모델
//!
//! 그룹은 하나의 과정(Course)에 속하고, 한 명의 강사(Teacher)가 담당하며,
//! **매주 같은 요일·같은 시각**에 수업이 열리는 반입니다.
//!
//! ## 반복 규칙 (Recurrence rule)
//! 그룹마다 정확히 하나의 주간 반복 규칙을 가집니다:
//! - `weekly_day`: 1(월요일) ~ 7(일요일), ISO 요일 번호
//! - `start_time`: "HH:MM"
//! - `duration_minutes`: 수업 길이(분)
//!
//! `start_date`/`end_date`가 설정되어 있으면 그 기간 밖의 수업은 생성되지 않습니다.

use serde::{Deserialize, Serialize};

use super::double_option;

/// 그룹 상태
///
/// `#[derive(sqlx::Type)]`: DB의 TEXT 컬럼과 enum을 자동으로 변환합니다.
/// `rename_all = "lowercase"`로 `GroupStatus::Graduate` ↔ `'graduate'`가 됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum GroupStatus {
    /// 수업 진행 중: 일괄 일정 생성 대상
    Active,
    /// 과정 수료
    Graduate,
    /// 중단/보류
    Inactive,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Active => "active",
            GroupStatus::Graduate => "graduate",
            GroupStatus::Inactive => "inactive",
        }
    }
}

/// 그룹 엔티티: DB의 `study_groups` 테이블 한 행에 대응합니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub public_id: String,
    pub course_id: i64,
    pub teacher_id: Option<i64>,
    pub title: String,
    pub weekly_day: i64,
    pub start_time: String,
    pub duration_minutes: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub room: Option<String>,
    pub capacity: Option<i64>,
    pub monthly_price: Option<i64>,
    pub status: GroupStatus,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// 목록/상세 화면용 그룹 정보: 과정 이름, 강사 이름, 현재 학생 수를 JOIN으로 함께 가져옵니다.
///
/// `#[sqlx(flatten)]`: Group의 모든 컬럼을 같은 행에서 읽어 중첩 구조체로 채웁니다.
/// `#[serde(flatten)]`: JSON에서는 다시 평평한 객체로 직렬화합니다.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GroupView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub group: Group,
    pub course_name: String,
    pub teacher_name: Option<String>,
    pub active_students: i64,
}

/// 그룹 생성 요청: `POST /api/v1/groups`
#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub course_id: i64,
    pub teacher_id: Option<i64>,
    pub title: String,
    pub weekly_day: i64,
    pub start_time: String,
    pub duration_minutes: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub room: Option<String>,
    pub capacity: Option<i64>,
    pub monthly_price: Option<i64>,
    pub status: Option<GroupStatus>,
    pub notes: Option<String>,
}

/// 그룹 수정 요청: `PATCH /api/v1/groups/{id}`
///
/// 바뀐 필드마다 그룹 이력(group_history)에 한 건씩 기록됩니다.
/// - `status` → `status_changed`
/// - `teacher_id` → `teacher_changed` (null이면 강사 배정 해제)
/// - 그 외 필드 → `edited`
#[derive(Debug, Default, Deserialize)]
pub struct UpdateGroupRequest {
    pub course_id: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub teacher_id: Option<Option<i64>>,
    pub title: Option<String>,
    pub weekly_day: Option<i64>,
    pub start_time: Option<String>,
    pub duration_minutes: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub room: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub capacity: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub monthly_price: Option<Option<i64>>,
    pub status: Option<GroupStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

/// 그룹 목록 필터: `?status=active&course_id=1&teacher_id=2`
#[derive(Debug, Default, Deserialize)]
pub struct GroupListQuery {
    pub status: Option<GroupStatus>,
    pub course_id: Option<i64>,
    pub teacher_id: Option<i64>,
}

/// 학생-그룹 소속: `student_groups` 테이블
///
/// 같은 학생이 탈퇴 후 다시 가입하면 `join_date`가 다른 새 행이 생깁니다.
/// 활성(`is_active = 1`) 소속은 학생·그룹 쌍마다 최대 하나입니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StudentGroup {
    pub id: i64,
    pub student_id: i64,
    pub group_id: i64,
    pub join_date: String,
    pub leave_date: Option<String>,
    pub is_active: bool,
}

/// 그룹 학생 목록 항목: 학생 기본 정보 + 소속 정보
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GroupStudent {
    pub student_id: i64,
    pub public_id: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub parent_phone: Option<String>,
    pub join_date: String,
    pub leave_date: Option<String>,
    pub is_active: bool,
}

/// 그룹 학생 목록 필터: `?include_inactive=true`이면 탈퇴한 학생도 포함
#[derive(Debug, Default, Deserialize)]
pub struct GroupStudentsQuery {
    pub include_inactive: Option<bool>,
}

/// 그룹에 학생 추가 요청: `POST /api/v1/groups/{id}/students`
#[derive(Debug, Deserialize)]
pub struct AddStudentToGroupRequest {
    pub student_id: i64,
    /// 가입일 ("YYYY-MM-DD"), 없으면 오늘
    pub join_date: Option<String>,
}

/// 그룹에서 학생 제외 요청 본문 (선택): `DELETE /api/v1/groups/{id}/students/{student_id}`
#[derive(Debug, Default, Deserialize)]
pub struct RemoveStudentQuery {
    /// 탈퇴일 ("YYYY-MM-DD"), 없으면 오늘
    pub leave_date: Option<String>,
}
