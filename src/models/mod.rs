//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! 각 하위 모듈은 특정 도메인의 데이터 타입을 담당합니다:
//! - `attendance`: 출석(Attendance)과 출석 통계
//! - `course`: 과정(Course)
//! - `group`: 학습 그룹(Group)과 학생-그룹 소속(StudentGroup)
//! - `history`: 그룹 변경 이력(GroupHistoryEntry)
//! - `lesson`: 수업(Lesson)과 일정 생성 결과
//! - `payment`: 결제(Payment)
//! - `student`: 학생(Student)
//! - `teacher`: 강사(Teacher)
//! - `user`: 관리자 계정(User)
//!
//! `pub use X::*;`로 하위 모듈의 항목을 재공개하여
//! `crate::models::Group`처럼 짧게 접근할 수 있게 합니다.

pub mod attendance;
pub mod course;
pub mod group;
pub mod history;
pub mod lesson;
pub mod payment;
pub mod student;
pub mod teacher;
pub mod user;

pub use attendance::*;
pub use course::*;
pub use group::*;
pub use history::*;
pub use lesson::*;
pub use payment::*;
pub use student::*;
pub use teacher::*;
pub use user::*;

use serde::{Deserialize, Deserializer};

/// PATCH 요청에서 "필드 누락"과 "null"을 구분하기 위한 역직렬화 함수
///
/// `#[serde(default, deserialize_with = "double_option")]`과 함께 사용합니다.
/// - 필드 누락 → `None` (변경 안 함)
/// - `null` → `Some(None)` (값을 지움)
/// - 값 → `Some(Some(v))`
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// 목록 조회용 공통 쿼리 파라미터: `?from=2026-09-01&to=2026-09-30`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}
